//! Microchip MCP2221 USB-to-I2C bridge, driven through its HID interface.
//!
//! Every command is a 64-byte report written to the interrupt OUT endpoint
//! and answered by a 64-byte report on the interrupt IN endpoint, echoing the
//! command code in byte 0 and a completion status in byte 1.

use std::time::Duration;

use rusb::{Device, DeviceHandle, Direction, GlobalContext, TransferType};

use super::{I2cBridge, I2cState};
use crate::error::TransportError;

pub const VID: u16 = 0x04d8;
pub const PID: u16 = 0x00dd;

const REPORT_SIZE: usize = 64;
const MAX_TRANSFER: usize = 60;
const TIMEOUT: Duration = Duration::from_millis(1000);
const POLL_INTERVAL: Duration = Duration::from_millis(1);
const POLL_ATTEMPTS: usize = 50;

const HID_CLASS: u8 = 0x03;

mod cmd {
    pub const STATUS: u8 = 0x10;
    pub const I2C_WRITE: u8 = 0x90;
    pub const I2C_READ_REPEATED_START: u8 = 0x93;
    pub const I2C_WRITE_NO_STOP: u8 = 0x94;
    pub const I2C_GET_DATA: u8 = 0x40;
}

mod status {
    pub const CANCEL: u8 = 0x10;
    pub const SET_SPEED: u8 = 0x20;
    pub const SPEED_REJECTED: u8 = 0x21;
    pub const ADDR_NACK: u8 = 0x40;
    pub const PARTIAL_DATA: u8 = 0x41;
    pub const WRITING_NO_STOP: u8 = 0x45;
    pub const READ_NACK: u8 = 0x25;
    pub const READ_PARTIAL: u8 = 0x54;
    pub const READ_COMPLETE: u8 = 0x55;
    pub const READ_ERROR: u8 = 0x7f;
}

pub struct Mcp2221 {
    handle: DeviceHandle<GlobalContext>,
    interface: u8,
    ep_in: u8,
    ep_out: u8,
}

impl Mcp2221 {
    /// Lists the attached bridges with the default VID/PID.
    pub fn enumerate() -> Result<Vec<Device<GlobalContext>>, TransportError> {
        let mut found = vec![];
        for device in rusb::devices()?.iter() {
            let desc = device.device_descriptor()?;
            if desc.vendor_id() == VID && desc.product_id() == PID {
                found.push(device);
            }
        }
        Ok(found)
    }

    /// Opens `device` and claims its HID interface until dropped.
    pub fn open(device: &Device<GlobalContext>) -> Result<Self, TransportError> {
        let (interface, ep_in, ep_out) = hid_endpoints(device)?;
        log::debug!(
            "opening MCP2221 on bus {} address {}, interface {interface}",
            device.bus_number(),
            device.address()
        );

        let mut handle = device.open()?;
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(e) => return Err(e.into()),
        }
        handle.claim_interface(interface)?;

        Ok(Self {
            handle,
            interface,
            ep_in,
            ep_out,
        })
    }

    fn command(&mut self, request: &[u8]) -> Result<[u8; REPORT_SIZE], TransportError> {
        let mut report = [0u8; REPORT_SIZE];
        report[..request.len()].copy_from_slice(request);
        self.handle.write_interrupt(self.ep_out, &report, TIMEOUT)?;

        let mut response = [0u8; REPORT_SIZE];
        self.handle
            .read_interrupt(self.ep_in, &mut response, TIMEOUT)?;
        if response[0] != request[0] {
            return Err(TransportError::Response {
                command: request[0],
                response: response[0],
            });
        }
        Ok(response)
    }

    fn checked(&mut self, request: &[u8]) -> Result<[u8; REPORT_SIZE], TransportError> {
        let response = self.command(request)?;
        if response[1] != 0 {
            return Err(TransportError::Status {
                command: request[0],
                status: response[1],
            });
        }
        Ok(response)
    }

    fn status(&mut self) -> Result<[u8; REPORT_SIZE], TransportError> {
        self.checked(&[cmd::STATUS])
    }

    /// Sends one I2C write and waits for the engine to finish it.
    fn write_data(&mut self, command: u8, address: u8, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > MAX_TRANSFER {
            return Err(TransportError::Length {
                len: bytes.len(),
                max: MAX_TRANSFER,
            });
        }

        let len = bytes.len() as u16;
        let mut request = vec![command, len as u8, (len >> 8) as u8, address << 1];
        request.extend_from_slice(bytes);
        self.checked(&request)?;

        for _ in 0..POLL_ATTEMPTS {
            let report = self.status()?;
            if report[20] & status::ADDR_NACK != 0 {
                return Err(TransportError::Status {
                    command,
                    status: report[20],
                });
            }
            match report[8] {
                0 => return Ok(()),
                status::WRITING_NO_STOP if command == cmd::I2C_WRITE_NO_STOP => return Ok(()),
                _ => std::thread::sleep(POLL_INTERVAL),
            }
        }

        let state = self.status()?[8];
        Err(TransportError::Busy { state })
    }

    fn read_data(&mut self, address: u8, buf: &mut [u8]) -> Result<(), TransportError> {
        if buf.len() > MAX_TRANSFER {
            return Err(TransportError::Length {
                len: buf.len(),
                max: MAX_TRANSFER,
            });
        }

        let len = buf.len() as u16;
        self.checked(&[
            cmd::I2C_READ_REPEATED_START,
            len as u8,
            (len >> 8) as u8,
            (address << 1) | 1,
        ])?;

        for _ in 0..POLL_ATTEMPTS {
            let response = self.command(&[cmd::I2C_GET_DATA])?;
            match (response[1], response[2], response[3]) {
                (status::PARTIAL_DATA, _, _) | (0, _, status::READ_ERROR) => {
                    std::thread::sleep(POLL_INTERVAL);
                }
                (0, status::READ_NACK, _) => {
                    return Err(TransportError::Status {
                        command: cmd::I2C_GET_DATA,
                        status: status::READ_NACK,
                    });
                }
                (0, 0 | status::READ_COMPLETE | status::READ_PARTIAL, count)
                    if usize::from(count) >= buf.len() =>
                {
                    buf.copy_from_slice(&response[4..4 + buf.len()]);
                    return Ok(());
                }
                (0, _, _) => std::thread::sleep(POLL_INTERVAL),
                (code, _, _) => {
                    return Err(TransportError::Status {
                        command: cmd::I2C_GET_DATA,
                        status: code,
                    });
                }
            }
        }

        let state = self.status()?[8];
        Err(TransportError::Busy { state })
    }
}

impl Drop for Mcp2221 {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            log::debug!("releasing MCP2221 interface failed: {e}");
        }
    }
}

impl I2cBridge for Mcp2221 {
    fn i2c_state(&mut self) -> Result<I2cState, TransportError> {
        Ok(match self.status()?[8] {
            0 => I2cState::Idle,
            state => I2cState::Busy(state),
        })
    }

    fn i2c_cancel(&mut self) -> Result<(), TransportError> {
        let response = self.checked(&[cmd::STATUS, 0, status::CANCEL])?;
        if response[2] == status::CANCEL {
            // The bus release takes a few hundred microseconds.
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    fn i2c_divider(&mut self, divider: u8) -> Result<(), TransportError> {
        let response = self.checked(&[cmd::STATUS, 0, 0, status::SET_SPEED, divider])?;
        if response[3] == status::SPEED_REJECTED {
            return Err(TransportError::Status {
                command: cmd::STATUS,
                status: response[3],
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
        self.write_data(cmd::I2C_WRITE_NO_STOP, address, write)?;
        self.read_data(address, read)
    }

    fn i2c_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TransportError> {
        self.write_data(cmd::I2C_WRITE, address, bytes)
    }
}

/// Finds the HID interface and its interrupt IN/OUT endpoints.
fn hid_endpoints(device: &Device<GlobalContext>) -> Result<(u8, u8, u8), TransportError> {
    let config = device.active_config_descriptor()?;
    for interface in config.interfaces() {
        for desc in interface.descriptors() {
            if desc.class_code() != HID_CLASS {
                continue;
            }
            let mut ep_in = None;
            let mut ep_out = None;
            for ep in desc.endpoint_descriptors() {
                if ep.transfer_type() != TransferType::Interrupt {
                    continue;
                }
                match ep.direction() {
                    Direction::In => ep_in = Some(ep.address()),
                    Direction::Out => ep_out = Some(ep.address()),
                }
            }
            if let (Some(ep_in), Some(ep_out)) = (ep_in, ep_out) {
                return Ok((desc.interface_number(), ep_in, ep_out));
            }
        }
    }
    Err(TransportError::NoInterface)
}
