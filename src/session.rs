use crate::bridge::{BusSpeed, I2cBridge, I2cState};
use crate::eeprom::{Eeprom, EepromStructure};
use crate::error::{Error, Result};
use crate::policy::plan;
use crate::structures::rcw::{BootMedia, Rcw};

/// EEPROM offset of the RCW.
pub const RCW_OFFSET: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The planned word, or the word read back once written.
    pub after: Option<Rcw>,
    pub changed: bool,
}

/// Exclusive use of one bridge for the lifetime of the run.
pub struct Session<B: I2cBridge> {
    eeprom: Eeprom<B>,
}

impl<B: I2cBridge> Session<B> {
    /// Clears a transfer left pending by an earlier run, then sets the bus speed.
    pub fn open(mut bridge: B, address: u8, speed: BusSpeed) -> Result<Self> {
        match bridge.i2c_state().map_err(Error::I2cState)? {
            I2cState::Idle => {}
            I2cState::Busy(state) => {
                log::warn!("I2C engine busy (state {state:#04x}), cancelling transfer");
                bridge.i2c_cancel().map_err(Error::I2cState)?;
            }
        }

        log::debug!("setting I2C bus speed to {speed}");
        bridge
            .i2c_divider(speed.divider())
            .map_err(Error::Divider)?;

        Ok(Self {
            eeprom: Eeprom::new(bridge, address),
        })
    }

    pub fn read_rcw(&mut self) -> Result<Rcw> {
        Ok(EepromStructure::<Rcw>::read(&mut self.eeprom, RCW_OFFSET)?.1)
    }

    /// Applies the boot policy for `target` to `current` and writes the result
    /// back if it changed. With `dry_run` the planned word is returned unwritten.
    pub fn apply(&mut self, current: Rcw, target: BootMedia, dry_run: bool) -> Result<Outcome> {
        let planned = plan(&current, target)?;

        if !planned.changed {
            log::info!("RCW already boots from {target}");
            return Ok(Outcome {
                after: None,
                changed: false,
            });
        }

        if dry_run {
            log::info!("dry run, not writing {:#010x}", planned.rcw.boot_cfg);
            return Ok(Outcome {
                after: Some(planned.rcw),
                changed: true,
            });
        }

        log::info!(
            "writing RCW {:#010x} to EEPROM {:#04x}",
            planned.rcw.boot_cfg,
            self.eeprom.address()
        );
        let stored = EepromStructure(RCW_OFFSET, planned.rcw).write_verified(&mut self.eeprom)?;

        Ok(Outcome {
            after: Some(stored.1),
            changed: true,
        })
    }
}
