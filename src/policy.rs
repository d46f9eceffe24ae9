use crate::error::Result;
use crate::report::boot_label;
use crate::structures::rcw::{
    BootMedia, Rcon, Rcw, Sd, SPEED_HIGH, SRC_I2C, WAIT_PERIOD_50MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub rcw: Rcw,
    /// False when `rcw` equals the input and nothing must be written.
    pub changed: bool,
}

/// Computes the RCW that boots from `target` with the configuration taken from I2C.
pub fn plan(current: &Rcw, target: BootMedia) -> Result<Plan> {
    let mut rcw = *current;
    let mut changed = false;

    let mut rcon = rcw.rcon()?;
    if rcon.src != SRC_I2C {
        log::info!("setting boot configuration source to I2C");
        rcon.src = SRC_I2C;
        changed = true;
    }

    if rcon.boot != target.raw() {
        log::info!(
            "switching boot media from {} to {target}",
            boot_label(rcon.boot)
        );
        // The media layouts overlap, so every field of the old one is cleared.
        rcon = Rcon {
            boot: target.raw(),
            src: SRC_I2C,
            ..Default::default()
        };
        changed = true;
    }
    rcw.set_view(&rcon)?;

    if rcon.boot == BootMedia::Sd.raw() {
        let mut sd: Sd = rcw.view()?;
        if sd.speed == 0 {
            log::info!("enabling SD high speed mode");
            sd.speed = SPEED_HIGH;
            changed = true;
        }
        if sd.wait != WAIT_PERIOD_50MS {
            log::info!("setting SD wait period to 50ms");
            sd.wait = WAIT_PERIOD_50MS;
            changed = true;
        }
        rcw.set_view(&sd)?;
    }

    Ok(Plan { rcw, changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::rcw::{Mmc, Qspi};

    #[test]
    fn compliant_word_is_left_alone() {
        let first = plan(&Rcw::new(0x40), BootMedia::Sd).unwrap();
        assert!(first.changed);

        let second = plan(&first.rcw, BootMedia::Sd).unwrap();
        assert!(!second.changed);
        assert_eq!(second.rcw, first.rcw);

        for target in [BootMedia::Qspi, BootMedia::Mmc] {
            let first = plan(&Rcw::new(0xffff_ffff), target).unwrap();
            let second = plan(&first.rcw, target).unwrap();
            assert!(first.changed);
            assert!(!second.changed);
        }
    }

    #[test]
    fn media_switch_clears_previous_layout() {
        let mut rcw = Rcw::default();
        rcw.set_view(&Qspi {
            pll: 1,
            dqs_sel: 3,
            dllfsmpf: 7,
            fsdly: 1,
            fsphs: 1,
            tdh: 3,
            res3: 3,
            ckn: 1,
            por_delay: 7,
            xosc: 1,
            cas: 0xf,
            ck2: 1,
            port: 1,
            src: 0,
            boot: 0,
            mode: 7,
            phy: 3,
        })
        .unwrap();
        assert_eq!(rcw.boot_cfg, 0xffff_fe1f);

        let result = plan(&rcw, BootMedia::Sd).unwrap();
        assert!(result.changed);

        let sd: Sd = result.rcw.view().unwrap();
        assert_eq!(sd.boot, 2);
        assert_eq!(sd.src, 1);
        assert_eq!(sd.speed, 1);
        assert_eq!(sd.wait, 7);
        assert_eq!(sd.phy, 0);
        assert_eq!(sd.xosc, 0);
        assert_eq!(sd.pll, 0);
        assert_eq!(sd.res0, 0);
        assert_eq!(sd.res1, 0);
        assert_eq!(sd.res2, 0);
        assert_eq!(result.rcw.boot_cfg, 0x000f_0140);
    }

    #[test]
    fn switch_to_mmc_keeps_only_boot_and_source() {
        let result = plan(&Rcw::new(0x800f_8143), BootMedia::Mmc).unwrap();
        assert!(result.changed);
        assert_eq!(result.rcw.boot_cfg, 0x0000_0160);

        let mmc: Mmc = result.rcw.view().unwrap();
        assert_eq!(mmc.boot, 3);
        assert_eq!(mmc.wait, 0);
        assert_eq!(mmc.mode, 0);
    }

    #[test]
    fn sd_defaults_are_applied() {
        let result = plan(&Rcw::new(0x140), BootMedia::Sd).unwrap();
        assert!(result.changed);
        let sd: Sd = result.rcw.view().unwrap();
        assert_eq!(sd.speed, 1);
        assert_eq!(sd.wait, 7);
    }

    #[test]
    fn reserved_wait_code_is_replaced() {
        // boot = SD, src = I2C, speed = high, wait = 5
        let result = plan(&Rcw::new(0x000d_0140), BootMedia::Sd).unwrap();
        assert!(result.changed);
        assert_eq!(result.rcw.boot_cfg, 0x000f_0140);
    }

    #[test]
    fn source_alone_is_fixed_without_clearing() {
        // SD, RGMII, bypass oscillator, IRC@48MHz, parallel source
        let result = plan(&Rcw::new(0x800f_8042), BootMedia::Sd).unwrap();
        assert!(result.changed);
        assert_eq!(result.rcw.boot_cfg, 0x800f_8142);

        let result = plan(&Rcw::new(0x0000_0100), BootMedia::Qspi).unwrap();
        assert!(!result.changed);
    }
}
