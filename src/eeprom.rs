use std::time::Duration;

use deku::prelude::*;

use crate::bridge::I2cBridge;
use crate::error::{Error, Result};
use crate::structures::rcw::{Rcw, RCW_SIZE};

/// Default 7-bit address of the configuration EEPROM.
pub const DEFAULT_ADDRESS: u8 = 0x50;

/// AT24C01 page size, the largest write the device accepts in one transfer.
pub const PAGE_SIZE: usize = 8;

/// Self-timed write cycle of the EEPROM, during which it does not acknowledge.
pub const WRITE_CYCLE: Duration = Duration::from_millis(5);

/// Byte-addressed I2C EEPROM behind a bridge.
#[derive(Debug)]
pub struct Eeprom<B> {
    bridge: B,
    address: u8,
}

impl<B: I2cBridge> Eeprom<B> {
    pub fn new(bridge: B, address: u8) -> Self {
        Self { bridge, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn into_inner(self) -> B {
        self.bridge
    }

    /// Sets the device's address pointer to `offset` and reads `len` bytes.
    pub fn read(&mut self, offset: u8, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.bridge
            .i2c_write_read(self.address, &[offset], &mut buf)
            .map_err(Error::Read)?;
        log::debug!("read {:#04x}+{len}: {buf:02x?}", offset);
        Ok(buf)
    }

    pub fn write(&mut self, offset: u8, bytes: &[u8]) -> Result<()> {
        if bytes.len() > PAGE_SIZE {
            return Err(Error::PageOverflow {
                len: bytes.len(),
                max: PAGE_SIZE,
            });
        }

        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(offset);
        frame.extend_from_slice(bytes);

        log::debug!("write {:#04x}: {bytes:02x?}", offset);
        self.bridge
            .i2c_write(self.address, &frame)
            .map_err(Error::Write)?;
        std::thread::sleep(WRITE_CYCLE);
        Ok(())
    }
}

/// A deku structure with a fixed size in the EEPROM.
pub trait Stored: for<'a> DekuContainerRead<'a> + DekuContainerWrite {
    const SIZE: usize;
}

impl Stored for Rcw {
    const SIZE: usize = RCW_SIZE;
}

/// A structure together with the EEPROM offset it lives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromStructure<T>(pub u8, pub T);

impl<T> std::ops::Deref for EepromStructure<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.1
    }
}

impl<T> std::ops::DerefMut for EepromStructure<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.1
    }
}

impl<T: Stored> EepromStructure<T> {
    pub fn read<B: I2cBridge>(eeprom: &mut Eeprom<B>, offset: u8) -> Result<Self> {
        let bytes = eeprom.read(offset, T::SIZE)?;
        Ok(Self(offset, T::from_bytes((bytes.as_slice(), 0))?.1))
    }

    /// Writes the encoded structure and returns the bytes sent.
    pub fn write<B: I2cBridge>(&self, eeprom: &mut Eeprom<B>) -> Result<Vec<u8>> {
        let bytes = self.1.to_bytes()?;
        eeprom.write(self.0, &bytes)?;
        Ok(bytes)
    }

    /// Writes the structure, reads it back and fails unless both match.
    pub fn write_verified<B: I2cBridge>(&self, eeprom: &mut Eeprom<B>) -> Result<Self> {
        let expected = self.write(eeprom)?;
        let actual = eeprom
            .read(self.0, expected.len())
            .map_err(|e| match e {
                Error::Read(e) => Error::VerifyRead(e),
                e => e,
            })?;

        if actual != expected {
            return Err(Error::Verify {
                offset: self.0,
                expected,
                actual,
            });
        }

        Ok(Self(self.0, T::from_bytes((actual.as_slice(), 0))?.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::mock::{MockEeprom, Op};
    use crate::error::TransportError;

    #[test]
    fn read_sends_offset_then_reads() {
        let mut eeprom = Eeprom::new(
            MockEeprom::with_contents(0x50, 0x10, &[1, 2, 3, 4, 5]),
            0x50,
        );
        assert_eq!(eeprom.read(0x11, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(
            eeprom.into_inner().ops,
            vec![Op::WriteRead {
                address: 0x50,
                write: vec![0x11],
                len: 3
            }]
        );
    }

    #[test]
    fn write_prefixes_offset() {
        let mut eeprom = Eeprom::new(MockEeprom::new(0x51), 0x51);
        eeprom.write(0x04, &[0xaa, 0xbb]).unwrap();
        let mock = eeprom.into_inner();
        assert_eq!(mock.writes(), vec![&[0x04, 0xaa, 0xbb][..]]);
        assert_eq!(mock.memory[4..6], [0xaa, 0xbb]);
    }

    #[test]
    fn page_overflow_is_rejected_before_transmission() {
        let mut eeprom = Eeprom::new(MockEeprom::new(0x50), 0x50);
        let err = eeprom.write(0, &[0; PAGE_SIZE + 1]).unwrap_err();
        assert!(matches!(err, Error::PageOverflow { len: 9, max: 8 }));
        assert!(eeprom.into_inner().ops.is_empty());
    }

    #[test]
    fn transport_status_is_surfaced() {
        let mut mock = MockEeprom::new(0x50);
        mock.fail_read = Some(0x41);
        let mut eeprom = Eeprom::new(mock, 0x50);
        let err = eeprom.read(0, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::Read(TransportError::Status { status: 0x41, .. })
        ));

        let mut eeprom = Eeprom::new(MockEeprom::new(0x50), 0x57);
        assert!(matches!(eeprom.write(0, &[0]), Err(Error::Write(_))));
    }

    #[test]
    fn structure_read_decodes_little_endian() {
        let mut eeprom = Eeprom::new(
            MockEeprom::with_contents(0x50, 0, &[0x04, 0x03, 0x02, 0x01]),
            0x50,
        );
        let rcw = EepromStructure::<Rcw>::read(&mut eeprom, 0).unwrap();
        assert_eq!(rcw.0, 0);
        assert_eq!(rcw.boot_cfg, 0x0102_0304);
    }

    #[test]
    fn verified_write_round_trips() {
        let mut eeprom = Eeprom::new(MockEeprom::new(0x50), 0x50);
        let rcw = EepromStructure(0, Rcw::new(0x000f_0140));
        let stored = rcw.write_verified(&mut eeprom).unwrap();
        assert_eq!(stored, rcw);
        assert_eq!(eeprom.into_inner().memory[..4], [0x40, 0x01, 0x0f, 0x00]);
    }

    #[test]
    fn lost_write_is_an_integrity_error() {
        let mut mock = MockEeprom::with_contents(0x50, 0, &[0x40, 0, 0, 0]);
        mock.drop_writes = true;
        let mut eeprom = Eeprom::new(mock, 0x50);
        let err = EepromStructure(0, Rcw::new(0x000f_0140))
            .write_verified(&mut eeprom)
            .unwrap_err();
        match err {
            Error::Verify {
                offset,
                expected,
                actual,
            } => {
                assert_eq!(offset, 0);
                assert_eq!(expected, vec![0x40, 0x01, 0x0f, 0x00]);
                assert_eq!(actual, vec![0x40, 0x00, 0x00, 0x00]);
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn failed_reread_is_not_a_read_error() {
        let mut mock = MockEeprom::new(0x50);
        mock.fail_reread = Some(0x01);
        let mut eeprom = Eeprom::new(mock, 0x50);
        // The first read succeeds, only the one after the write fails.
        EepromStructure::<Rcw>::read(&mut eeprom, 0).unwrap();
        let err = EepromStructure(0, Rcw::new(1))
            .write_verified(&mut eeprom)
            .unwrap_err();
        assert!(matches!(err, Error::VerifyRead(_)));
    }
}
