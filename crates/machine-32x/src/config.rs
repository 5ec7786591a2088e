//! 32X configuration.
//!
//! Every field has a sensible default. ROM images are owned by the
//! configuration and copied into the machine at construction; they are
//! never part of a save state.

use emu_core::MasterClock;
use sega_32x_vdp::VdpTiming;

use crate::error::ConfigError;
use crate::sh2::CoreId;

/// Boot ROM window per core ($00000000-$00003FFF).
pub const BOOT_ROM_MAX: usize = 0x4000;
/// 68K-side vector override window ($000000-$0000FF).
pub const VECTOR_ROM_MAX: usize = 0x100;
/// Cartridge window ($02000000-$023FFFFF internal, four 1 MiB banks external).
pub const CARTRIDGE_MAX: usize = 0x40_0000;

/// Video region (affects the master crystal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// NTSC: 53.693175 MHz crystal.
    #[default]
    Ntsc,
    /// PAL: 53.203424 MHz crystal.
    Pal,
}

impl Region {
    /// Mega Drive master crystal.
    #[must_use]
    pub const fn master_clock(self) -> MasterClock {
        match self {
            Self::Ntsc => MasterClock::new(53_693_175),
            Self::Pal => MasterClock::new(53_203_424),
        }
    }
}

/// Catch-up thresholds, in SH-2 clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// A running core lets the other core catch up at least this often.
    pub sh2_interval: u32,
    /// A running core lets the host catch up at least this often.
    pub host_interval: u32,
    /// Clocks a core idles per poll while the adapter holds it in reset.
    pub reset_idle_clocks: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sh2_interval: 10,
            host_interval: 50,
            reset_idle_clocks: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct M32xConfig {
    pub region: Region,
    /// Cartridge ROM, big-endian as dumped.
    pub cartridge: Vec<u8>,
    pub master_boot_rom: Vec<u8>,
    pub slave_boot_rom: Vec<u8>,
    /// 68K vector table shown at $000000 while the adapter is enabled.
    pub vector_rom: Vec<u8>,
    pub sync: SyncConfig,
    pub vdp_timing: VdpTiming,
    /// Drop a core's boot ROM window once its PC leaves it.
    pub unmap_boot_rom_after_jump: bool,
}

impl Default for M32xConfig {
    fn default() -> Self {
        Self {
            region: Region::Ntsc,
            cartridge: Vec::new(),
            master_boot_rom: Vec::new(),
            slave_boot_rom: Vec::new(),
            vector_rom: Vec::new(),
            sync: SyncConfig::default(),
            vdp_timing: VdpTiming::default(),
            unmap_boot_rom_after_jump: true,
        }
    }
}

impl M32xConfig {
    /// SH-2 clock: the master crystal times 3/7 (about 23 MHz).
    #[must_use]
    pub fn sh2_clock(&self) -> MasterClock {
        self.region.master_clock().scaled(3, 7)
    }

    #[must_use]
    pub fn boot_rom(&self, core: CoreId) -> &[u8] {
        match core {
            CoreId::Master => &self.master_boot_rom,
            CoreId::Slave => &self.slave_boot_rom,
        }
    }

    /// Check every ROM image fits its window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for core in CoreId::ALL {
            let len = self.boot_rom(core).len();
            if len > BOOT_ROM_MAX {
                return Err(ConfigError::BootRomTooLarge {
                    core,
                    len,
                    max: BOOT_ROM_MAX,
                });
            }
            if len != 0 && !len.is_power_of_two() {
                log::warn!("{core} boot ROM is {len} bytes, not a power of two");
            }
        }
        if self.vector_rom.len() > VECTOR_ROM_MAX {
            return Err(ConfigError::VectorRomTooLarge {
                len: self.vector_rom.len(),
                max: VECTOR_ROM_MAX,
            });
        }
        if self.cartridge.len() > CARTRIDGE_MAX {
            return Err(ConfigError::CartridgeTooLarge {
                len: self.cartridge.len(),
                max: CARTRIDGE_MAX,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh2_clock_is_three_sevenths() {
        let config = M32xConfig::default();
        assert_eq!(config.sh2_clock().frequency_hz, 23_011_360);
        let pal = M32xConfig {
            region: Region::Pal,
            ..M32xConfig::default()
        };
        assert_eq!(pal.sh2_clock().frequency_hz, 22_801_467);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(M32xConfig::default().validate().is_ok());
    }

    #[test]
    fn oversized_boot_rom_rejected() {
        let config = M32xConfig {
            slave_boot_rom: vec![0; BOOT_ROM_MAX + 2],
            ..M32xConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BootRomTooLarge {
                core: CoreId::Slave,
                ..
            })
        ));
    }

    #[test]
    fn oversized_cartridge_rejected() {
        let config = M32xConfig {
            cartridge: vec![0; CARTRIDGE_MAX + 1],
            ..M32xConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CartridgeTooLarge { .. })
        ));
    }
}
