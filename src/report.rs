//! Human-readable rendering of the RCW.

use std::fmt;

use crate::structures::rcw::{decode, wait_period_ms, BootMedia, Rcw, RcwView};

pub fn phy_label(phy: u8) -> &'static str {
    match phy {
        0 => "RMII",
        1 => "SGMII",
        2 => "RGMII",
        3 => "No PHY",
        _ => "?",
    }
}

pub fn boot_label(boot: u8) -> &'static str {
    match BootMedia::from_raw(boot) {
        Some(BootMedia::Qspi) => "QSPI",
        Some(BootMedia::Sd) => "SD",
        Some(BootMedia::Mmc) => "MMC",
        None => "?",
    }
}

pub fn src_label(src: u8) -> &'static str {
    match src {
        0 => "parallel",
        1 => "I2C",
        _ => "?",
    }
}

pub fn xosc_label(xosc: u8) -> &'static str {
    match xosc {
        0 => "differential/crystal",
        1 => "bypass",
        _ => "?",
    }
}

pub fn pll_label(pll: u8) -> &'static str {
    match pll {
        0 => "PLL@IRC",
        1 => "IRC@48MHz",
        _ => "?",
    }
}

pub fn speed_label(speed: u8) -> &'static str {
    if speed != 0 {
        "high"
    } else {
        "default"
    }
}

pub fn wait_label(wait: u8) -> String {
    match wait_period_ms(wait) {
        Some(ms) => format!("{ms}ms"),
        None => "unknown".to_string(),
    }
}

/// Summary of the generic fields plus those of the layout `boot` selects.
pub struct RcwReport<'a>(pub &'a Rcw);

impl fmt::Display for RcwReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rcw = self.0;
        writeln!(f, "RCW: {:#010x}", rcw.boot_cfg)?;
        writeln!(f, "=================================")?;

        let rcon = rcw.rcon().map_err(|_| fmt::Error)?;
        writeln!(f, "    PHY:   {}", phy_label(rcon.phy))?;
        writeln!(f, "    BOOT:  {}", boot_label(rcon.boot))?;
        writeln!(f, "    SRC:   {}", src_label(rcon.src))?;
        writeln!(f, "    XOSC:  {}", xosc_label(rcon.xosc))?;
        writeln!(f, "    PLL:   {}", pll_label(rcon.pll))?;

        let Some(media) = BootMedia::from_raw(rcon.boot) else {
            return Ok(());
        };
        let raw = rcw.to_raw().map_err(|_| fmt::Error)?;
        match decode(raw, media.view_kind()).map_err(|_| fmt::Error)? {
            RcwView::Sd(sd) => {
                writeln!(f, "    WAIT:  {}", wait_label(sd.wait))?;
                writeln!(f, "    SPEED: {}", speed_label(sd.speed))?;
            }
            RcwView::Mmc(mmc) => {
                writeln!(f, "    WAIT:  {}", wait_label(mmc.wait))?;
                writeln!(f, "    MODE:  {:#x}", mmc.mode)?;
            }
            RcwView::Qspi(qspi) => {
                writeln!(f, "    PORT:  {}", if qspi.port != 0 { "B" } else { "A" })?;
                writeln!(f, "    CAS:   {}", qspi.cas)?;
                writeln!(f, "    POR:   {:#x}", qspi.por_delay)?;
            }
            RcwView::Rcon(_) => {}
        }
        Ok(())
    }
}
