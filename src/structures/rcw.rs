//! Reset Configuration Word layouts.
//!
//! The RCW is a single 32-bit word stored little-endian in the EEPROM. The
//! same bits are interpreted through one of four layouts, chosen by the
//! `boot` field at bits 5-7 which every layout shares. Each layout is a deku
//! structure declared from bit 31 down to bit 0 and decoded from the
//! big-endian bytes of the word, so field order reads MSB first.
//!
//! Reserved ranges are named `resN` and carried through decode/encode, so a
//! view never drops bits it does not interpret.

use deku::prelude::*;

use crate::error::{Error, Result};

/// Size of the RCW in the EEPROM.
pub const RCW_SIZE: usize = 4;

/// `src` value selecting the I2C EEPROM as boot configuration source.
pub const SRC_I2C: u8 = 1;

/// SD `speed` value for high speed mode.
pub const SPEED_HIGH: u8 = 1;

/// `wait` code for the 50ms wait period.
pub const WAIT_PERIOD_50MS: u8 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct Rcw {
    pub boot_cfg: u32,
}

impl Rcw {
    pub fn new(boot_cfg: u32) -> Self {
        Self { boot_cfg }
    }

    /// Decodes the on-wire little-endian representation.
    pub fn from_raw(bytes: [u8; RCW_SIZE]) -> Result<Self> {
        Ok(Self::from_bytes((bytes.as_slice(), 0))?.1)
    }

    pub fn to_raw(&self) -> Result<[u8; RCW_SIZE]> {
        to_word(self.to_bytes()?)
    }

    pub fn view<V: RcwLayout>(&self) -> Result<V> {
        let bytes = self.boot_cfg.to_be_bytes();
        Ok(V::from_bytes((bytes.as_slice(), 0))?.1)
    }

    pub fn set_view<V: RcwLayout>(&mut self, view: &V) -> Result<()> {
        let bytes = to_word(view.to_bytes()?)?;
        self.boot_cfg = u32::from_be_bytes(bytes);
        Ok(())
    }

    pub fn rcon(&self) -> Result<Rcon> {
        self.view()
    }

    pub fn boot(&self) -> Result<u8> {
        Ok(self.rcon()?.boot)
    }
}

fn to_word(bytes: Vec<u8>) -> Result<[u8; RCW_SIZE]> {
    let len = bytes.len();
    bytes.try_into().map_err(|_| Error::Layout { len })
}

/// A structured interpretation of the RCW bits.
pub trait RcwLayout: for<'a> DekuContainerRead<'a> + DekuContainerWrite {
    fn into_view(self) -> RcwView;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Rcon,
    Sd,
    Mmc,
    Qspi,
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Rcon => write!(f, "RCON"),
            Self::Sd => write!(f, "SD"),
            Self::Mmc => write!(f, "MMC"),
            Self::Qspi => write!(f, "QSPI"),
        }
    }
}

/// Generic layout, valid for every boot medium.
#[derive(Debug, Clone, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct Rcon {
    #[deku(bits = "1")]
    pub pll: u8,
    #[deku(bits = "12")]
    pub res3: u16,
    #[deku(bits = "3")]
    pub res2: u8,
    #[deku(bits = "1")]
    pub xosc: u8,
    #[deku(bits = "6")]
    pub res1: u8,
    #[deku(bits = "1")]
    pub src: u8,
    #[deku(bits = "3")]
    pub boot: u8,
    #[deku(bits = "3")]
    pub res0: u8,
    #[deku(bits = "2")]
    pub phy: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct Sd {
    #[deku(bits = "1")]
    pub pll: u8,
    #[deku(bits = "11")]
    pub res2: u16,
    #[deku(bits = "1")]
    pub speed: u8,
    #[deku(bits = "3")]
    pub wait: u8,
    #[deku(bits = "1")]
    pub xosc: u8,
    #[deku(bits = "6")]
    pub res1: u8,
    #[deku(bits = "1")]
    pub src: u8,
    #[deku(bits = "3")]
    pub boot: u8,
    #[deku(bits = "3")]
    pub res0: u8,
    #[deku(bits = "2")]
    pub phy: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct Mmc {
    #[deku(bits = "1")]
    pub pll: u8,
    #[deku(bits = "8")]
    pub res2: u8,
    #[deku(bits = "4")]
    pub mode: u8,
    #[deku(bits = "3")]
    pub wait: u8,
    #[deku(bits = "1")]
    pub xosc: u8,
    #[deku(bits = "6")]
    pub res1: u8,
    #[deku(bits = "1")]
    pub src: u8,
    #[deku(bits = "3")]
    pub boot: u8,
    #[deku(bits = "3")]
    pub res0: u8,
    #[deku(bits = "2")]
    pub phy: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct Qspi {
    #[deku(bits = "1")]
    pub pll: u8,
    #[deku(bits = "2")]
    pub dqs_sel: u8,
    /// Selects the n'th DLL tap.
    #[deku(bits = "3")]
    pub dllfsmpf: u8,
    /// Full speed delay selection, SMPR[FSDLY].
    #[deku(bits = "1")]
    pub fsdly: u8,
    /// Full speed phase selection, SMPR[FSPHS].
    #[deku(bits = "1")]
    pub fsphs: u8,
    /// Time hold delay.
    #[deku(bits = "2")]
    pub tdh: u8,
    #[deku(bits = "2")]
    pub res3: u8,
    /// Differential clock.
    #[deku(bits = "1")]
    pub ckn: u8,
    #[deku(bits = "3")]
    pub por_delay: u8,
    #[deku(bits = "1")]
    pub xosc: u8,
    /// QuadSPI_SFACR[CAS].
    #[deku(bits = "4")]
    pub cas: u8,
    /// CK2 clock.
    #[deku(bits = "1")]
    pub ck2: u8,
    #[deku(bits = "1")]
    pub port: u8,
    #[deku(bits = "1")]
    pub src: u8,
    #[deku(bits = "3")]
    pub boot: u8,
    #[deku(bits = "3")]
    pub mode: u8,
    #[deku(bits = "2")]
    pub phy: u8,
}

impl RcwLayout for Rcon {
    fn into_view(self) -> RcwView {
        RcwView::Rcon(self)
    }
}

impl RcwLayout for Sd {
    fn into_view(self) -> RcwView {
        RcwView::Sd(self)
    }
}

impl RcwLayout for Mmc {
    fn into_view(self) -> RcwView {
        RcwView::Mmc(self)
    }
}

impl RcwLayout for Qspi {
    fn into_view(self) -> RcwView {
        RcwView::Qspi(self)
    }
}

/// The RCW decoded under one explicitly chosen layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcwView {
    Rcon(Rcon),
    Sd(Sd),
    Mmc(Mmc),
    Qspi(Qspi),
}

impl RcwView {
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Rcon(_) => ViewKind::Rcon,
            Self::Sd(_) => ViewKind::Sd,
            Self::Mmc(_) => ViewKind::Mmc,
            Self::Qspi(_) => ViewKind::Qspi,
        }
    }

    pub fn boot(&self) -> u8 {
        match self {
            Self::Rcon(v) => v.boot,
            Self::Sd(v) => v.boot,
            Self::Mmc(v) => v.boot,
            Self::Qspi(v) => v.boot,
        }
    }
}

pub fn decode(bytes: [u8; RCW_SIZE], kind: ViewKind) -> Result<RcwView> {
    let rcw = Rcw::from_raw(bytes)?;
    Ok(match kind {
        ViewKind::Rcon => rcw.view::<Rcon>()?.into_view(),
        ViewKind::Sd => rcw.view::<Sd>()?.into_view(),
        ViewKind::Mmc => rcw.view::<Mmc>()?.into_view(),
        ViewKind::Qspi => rcw.view::<Qspi>()?.into_view(),
    })
}

pub fn encode(view: &RcwView) -> Result<[u8; RCW_SIZE]> {
    let mut rcw = Rcw::default();
    match view {
        RcwView::Rcon(v) => rcw.set_view(v)?,
        RcwView::Sd(v) => rcw.set_view(v)?,
        RcwView::Mmc(v) => rcw.set_view(v)?,
        RcwView::Qspi(v) => rcw.set_view(v)?,
    }
    rcw.to_raw()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BootMedia {
    Qspi = 0,
    Sd = 2,
    Mmc = 3,
}

impl BootMedia {
    pub fn from_raw(boot: u8) -> Option<Self> {
        match boot {
            0 => Some(Self::Qspi),
            2 => Some(Self::Sd),
            3 => Some(Self::Mmc),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Layout to use for a word booting from this medium.
    pub fn view_kind(self) -> ViewKind {
        match self {
            Self::Qspi => ViewKind::Qspi,
            Self::Sd => ViewKind::Sd,
            Self::Mmc => ViewKind::Mmc,
        }
    }
}

impl std::fmt::Display for BootMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Qspi => write!(f, "QSPI"),
            Self::Sd => write!(f, "SD"),
            Self::Mmc => write!(f, "MMC"),
        }
    }
}

/// Maps an SD/MMC `wait` code to milliseconds. Codes 5 and 6 are reserved.
pub fn wait_period_ms(code: u8) -> Option<u32> {
    match code {
        0 => Some(0),
        1 => Some(5),
        2 => Some(10),
        3 => Some(20),
        4 => Some(35),
        WAIT_PERIOD_50MS => Some(50),
        _ => None,
    }
}
