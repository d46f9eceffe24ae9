//! In-memory AT24C01 behind a fake bridge.

use super::{I2cBridge, I2cState};
use crate::error::TransportError;

pub const MEMORY_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    State,
    Cancel,
    Divider(u8),
    WriteRead { address: u8, write: Vec<u8>, len: usize },
    Write { address: u8, bytes: Vec<u8> },
}

#[derive(Debug)]
pub struct MockEeprom {
    pub address: u8,
    pub memory: [u8; MEMORY_SIZE],
    pub state: I2cState,
    pub ops: Vec<Op>,
    /// Status returned by the next failing command of each kind.
    pub fail_state: Option<u8>,
    pub fail_divider: Option<u8>,
    pub fail_read: Option<u8>,
    pub fail_write: Option<u8>,
    /// Reads after the first one fail with this status.
    pub fail_reread: Option<u8>,
    /// Acknowledge writes without storing them.
    pub drop_writes: bool,
    reads: usize,
}

impl MockEeprom {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0xff; MEMORY_SIZE],
            state: I2cState::Idle,
            ops: vec![],
            fail_state: None,
            fail_divider: None,
            fail_read: None,
            fail_write: None,
            fail_reread: None,
            drop_writes: false,
            reads: 0,
        }
    }

    pub fn with_contents(address: u8, offset: usize, bytes: &[u8]) -> Self {
        let mut eeprom = Self::new(address);
        eeprom.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
        eeprom
    }

    pub fn writes(&self) -> Vec<&[u8]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Write { bytes, .. } => Some(bytes.as_slice()),
                _ => None,
            })
            .collect()
    }

    fn nack(&self, address: u8, command: u8) -> Result<(), TransportError> {
        if address != self.address {
            return Err(TransportError::Status {
                command,
                status: 0x01,
            });
        }
        Ok(())
    }
}

impl I2cBridge for MockEeprom {
    fn i2c_state(&mut self) -> Result<I2cState, TransportError> {
        self.ops.push(Op::State);
        if let Some(status) = self.fail_state {
            return Err(TransportError::Status {
                command: 0x10,
                status,
            });
        }
        Ok(self.state)
    }

    fn i2c_cancel(&mut self) -> Result<(), TransportError> {
        self.ops.push(Op::Cancel);
        self.state = I2cState::Idle;
        Ok(())
    }

    fn i2c_divider(&mut self, divider: u8) -> Result<(), TransportError> {
        self.ops.push(Op::Divider(divider));
        if let Some(status) = self.fail_divider {
            return Err(TransportError::Status {
                command: 0x10,
                status,
            });
        }
        Ok(())
    }

    fn i2c_write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), TransportError> {
        self.ops.push(Op::WriteRead {
            address,
            write: write.to_vec(),
            len: read.len(),
        });
        self.reads += 1;
        let failure = if self.reads > 1 {
            self.fail_reread.or(self.fail_read)
        } else {
            self.fail_read
        };
        if let Some(status) = failure {
            return Err(TransportError::Status {
                command: 0x93,
                status,
            });
        }
        self.nack(address, 0x94)?;

        let mut pointer = usize::from(write[0]);
        for byte in read.iter_mut() {
            *byte = self.memory[pointer % MEMORY_SIZE];
            pointer += 1;
        }
        Ok(())
    }

    fn i2c_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TransportError> {
        self.ops.push(Op::Write {
            address,
            bytes: bytes.to_vec(),
        });
        if let Some(status) = self.fail_write {
            return Err(TransportError::Status {
                command: 0x90,
                status,
            });
        }
        self.nack(address, 0x90)?;

        if !self.drop_writes {
            let offset = usize::from(bytes[0]);
            for (i, byte) in bytes[1..].iter().enumerate() {
                self.memory[(offset + i) % MEMORY_SIZE] = *byte;
            }
        }
        Ok(())
    }
}
