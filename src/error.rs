use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure reported by the USB-to-I2C bridge, kept verbatim.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("USB transfer failed: {0}")]
    Usb(#[from] rusb::Error),
    #[error("command {command:#04x} failed with status {status:#04x}")]
    Status { command: u8, status: u8 },
    #[error("unexpected response {response:#04x} to command {command:#04x}")]
    Response { command: u8, response: u8 },
    #[error("I2C transfer of {len} bytes exceeds the {max} byte limit")]
    Length { len: usize, max: usize },
    #[error("I2C engine still busy (state {state:#04x})")]
    Busy { state: u8 },
    #[error("no HID interface on the bridge")]
    NoInterface,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("no devices found")]
    NoDevice,
    #[error("illegal device number {index} out of range, {count} device(s) found")]
    InvalidDeviceIndex { index: usize, count: usize },
    #[error("illegal device number {0:?}")]
    InvalidDeviceNumber(String),
    #[error("cannot open MCP2221 device")]
    Open(#[source] TransportError),
    #[error("cannot get I2C state")]
    I2cState(#[source] TransportError),
    #[error("cannot set I2C divider")]
    Divider(#[source] TransportError),
    #[error("cannot read EEPROM")]
    Read(#[source] TransportError),
    #[error("cannot write EEPROM")]
    Write(#[source] TransportError),
    #[error("cannot re-read EEPROM after write")]
    VerifyRead(#[source] TransportError),
    #[error("verification failed at offset {offset:#04x}: wrote {expected:02x?}, read back {actual:02x?}")]
    Verify {
        offset: u8,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },
    #[error("{len} byte write exceeds the EEPROM page size of {max} bytes")]
    PageOverflow { len: usize, max: usize },
    #[error("encoded structure is {len} bytes")]
    Layout { len: usize },
    #[error(transparent)]
    Codec(#[from] deku::DekuError),
}

impl Error {
    /// Process exit status for this failure. 2 is left to clap for argument errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoDevice => 3,
            Self::InvalidDeviceIndex { .. } | Self::InvalidDeviceNumber(_) => 4,
            Self::Open(_) => 5,
            Self::I2cState(_) => 6,
            Self::Divider(_) => 7,
            Self::Read(_) => 8,
            Self::Write(_) => 9,
            Self::VerifyRead(_) => 10,
            Self::Verify { .. } => 11,
            Self::PageOverflow { .. } => 12,
            Self::Layout { .. } | Self::Codec(_) => 13,
        }
    }
}
