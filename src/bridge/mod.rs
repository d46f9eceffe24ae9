//! USB-to-I2C bridge access.

use crate::error::TransportError;

pub mod mcp2221;
#[cfg(test)]
pub mod mock;

pub use mcp2221::Mcp2221;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cState {
    Idle,
    /// Raw state machine value of a transfer left pending.
    Busy(u8),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BusSpeed {
    #[default]
    #[value(name = "400k")]
    Fast,
    #[value(name = "100k")]
    Standard,
}

impl BusSpeed {
    /// Bridge clock divider, `12MHz / f - 3`.
    pub fn divider(self) -> u8 {
        match self {
            Self::Fast => 27,
            Self::Standard => 117,
        }
    }
}

impl std::fmt::Display for BusSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Fast => write!(f, "400kHz"),
            Self::Standard => write!(f, "100kHz"),
        }
    }
}

/// Blocking I2C master. `address` is always the 7-bit target address.
pub trait I2cBridge {
    fn i2c_state(&mut self) -> Result<I2cState, TransportError>;

    fn i2c_cancel(&mut self) -> Result<(), TransportError>;

    fn i2c_divider(&mut self, divider: u8) -> Result<(), TransportError>;

    /// Writes `write` without a stop condition, then reads `read.len()` bytes
    /// after a repeated start.
    fn i2c_write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), TransportError>;

    fn i2c_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TransportError>;
}

impl<B: I2cBridge + ?Sized> I2cBridge for &mut B {
    fn i2c_state(&mut self) -> Result<I2cState, TransportError> {
        (**self).i2c_state()
    }

    fn i2c_cancel(&mut self) -> Result<(), TransportError> {
        (**self).i2c_cancel()
    }

    fn i2c_divider(&mut self, divider: u8) -> Result<(), TransportError> {
        (**self).i2c_divider(divider)
    }

    fn i2c_write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), TransportError> {
        (**self).i2c_write_read(address, write, read)
    }

    fn i2c_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).i2c_write(address, bytes)
    }
}
