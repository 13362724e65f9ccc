//! Shared data types for the turntable controller.
//!
//! - **Buttons**: [`Pins`] (physical switches) and [`Buttons`] (logical host buttons)
//! - **Configuration**: [`Config`] and its parts, with a versioned, checksummed
//!   binary form ([`Config::serialize`], [`Config::deserialize`])
//! - **Reports**: [`GamepadReport`], [`KeyboardReport`] and host output
//!   reports decoded by [`parse_output_report`]
//!
//! # Example
//!
//! ```
//! use controller_proto::{Config, ConfigError};
//!
//! // Erased flash falls back to factory defaults.
//! let config = match Config::deserialize(&[0xFF; 64]) {
//!     Ok(config) => config,
//!     Err(ConfigError::BadVersion(_)) => Config::default(),
//!     Err(e) => panic!("{e}"),
//! };
//! assert!(config.flags.mode_switch_enable);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`heapless`**: Enable [`Config::serialize_to_vec`]

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod crc;
pub mod report;
pub mod serialize;
pub mod types;

pub use config::{
    AnimationMode, Config, ConfigFlags, EffectorMode, HsvColor, InputMode, PaletteId, RgbColor,
    RgbConfig, TurntableMode, DEBOUNCE_TICKS_MAX, DEBOUNCE_TICKS_MIN, KEYCODE_COUNT, LABEL_LEN,
    MAX_CIRCLES, MAX_LEDS,
};
pub use crc::{calculate_crc8, Crc8Digest};
pub use report::{
    parse_output_report, GamepadReport, HostCommand, KeyboardReport, ReportError,
    GAMEPAD_REPORT_ID, LIGHTS_REPORT_ID, RESISTANCE_REPORT_ID, RGB_REPORT_ID,
};
pub use serialize::{ConfigError, SerializeError, CONFIG_SIZE, CONFIG_VERSION};
pub use types::{Buttons, Pins};
