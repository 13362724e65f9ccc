//! Configuration record in the last flash sector.

use controller_proto::{Config, CONFIG_SIZE};
use defmt::{info, warn};
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;

/// Size of the on-board flash.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the configuration sector.
pub const CONFIG_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

pub type ConfigFlash<'d> = Flash<'d, FLASH, Blocking, FLASH_SIZE>;

/// Read the persisted configuration, falling back to defaults.
pub fn load_config(flash: &mut ConfigFlash<'_>) -> Config {
    let mut buf = [0u8; CONFIG_SIZE];
    if let Err(e) = flash.blocking_read(CONFIG_OFFSET, &mut buf) {
        warn!("Config read failed: {:?}, using defaults", e);
        return Config::default();
    }

    match Config::deserialize(&buf) {
        Ok(config) => {
            info!("Loaded config {=str}", config.label_str());
            config
        }
        Err(e) => {
            warn!("Stored config rejected: {:?}, using defaults", e);
            Config::default()
        }
    }
}
