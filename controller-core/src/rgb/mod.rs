//! LED strip animation and transmission.

pub mod color;
pub mod engine;
pub mod palette;
pub mod strip;

pub use engine::{RgbEngine, ACTIVITY_MAX, FRAME_PERIOD_MS, HOST_COLOR_TIMEOUT_MS};
pub use palette::palette_color;
pub use strip::{encode_pwm, grb_word, LedStrip, ShiftOut, StripError, PWM_SLOTS};
pub use smart_leds::RGB8;
