//! Platform-agnostic input pipeline and lighting engine for a turntable
//! controller.
//!
//! Every component is an explicit state struct polled with the current
//! [`Instant`]; nothing here reads a clock, touches hardware or allocates.
//! The firmware supplies raw pins, the quadrature counter and an
//! [`LedStrip`], and forwards the reports from each [`Frame`].
//!
//! # Overview
//!
//! - [`debounce`]: windowed per-bit debounce ([`Debouncer`])
//! - [`analog_button`]: digital turntable direction from the counter ([`AnalogButton`])
//! - [`ttsens`]: turntable sensitivity and host resistance feedback ([`TurntableSensitivity`])
//! - [`remap`]: physical pins to logical buttons ([`remap()`])
//! - [`multitap`]: effector combinations from repeated taps ([`MultiTap`])
//! - [`modeswitch`]: long-press chords that change runtime modes ([`ModeSwitch`])
//! - [`lights`]: button and turntable light arbitration ([`ButtonLights`])
//! - [`rgb`]: LED strip animation ([`RgbEngine`]) and transmission ([`ShiftOut`])
//! - [`pipeline`]: all of the above, once per poll ([`Controller`])
//!
//! # Example
//!
//! ```
//! use controller_core::{Controller, CounterRange, Instant, ShiftOut};
//! use controller_proto::{Config, Pins, MAX_LEDS};
//!
//! struct Reload;
//! impl CounterRange for Reload {
//!     fn set_auto_reload(&mut self, _reload: u32) {}
//! }
//!
//! let mut strip = ShiftOut::<{ MAX_LEDS as usize }>::new();
//! let mut controller = Controller::new(Config::default(), Reload, Instant::from_millis(0));
//! let frame = controller.tick(Instant::from_millis(0), Pins::B1, 0, &mut strip);
//! assert_eq!(frame.gamepad.buttons, 1);
//! assert_eq!(frame.gamepad.axis_x, 0);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and logging (for embedded targets)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

mod log;

pub mod analog_button;
pub mod debounce;
pub mod lights;
pub mod modeswitch;
pub mod multitap;
pub mod output;
pub mod pipeline;
pub mod remap;
pub mod rgb;
pub mod time;
pub mod ttsens;

pub use analog_button::AnalogButton;
pub use debounce::Debouncer;
pub use lights::{ButtonLights, LedScheduler, LightsFrame};
pub use modeswitch::{Chord, ModeSwitch};
pub use multitap::{tap_combination, MultiTap};
pub use output::{OutputError, OutputSink};
pub use pipeline::{Controller, Frame};
pub use remap::remap;
pub use rgb::{LedStrip, RgbEngine, ShiftOut, StripError};
pub use time::{Instant, Timer};
pub use ttsens::{CounterRange, TurntableSensitivity};
