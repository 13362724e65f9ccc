//! Turntable controller firmware for RP2040.
//!
//! Hardware glue around [`controller_core`]: GPIO buttons, the quadrature
//! turntable counter, the LED strip on PIO, USB HID and the flash-stored
//! configuration.

#![no_std]

// Re-export core types for convenience
pub use controller_core::{
    Controller, CounterRange, Frame, Instant, LedStrip, OutputError, OutputSink,
};
pub use controller_proto::{Config, HostCommand, Pins};

pub mod buttons;
pub mod encoder;
pub mod storage;
pub mod usb_output;
pub mod ws2812;

pub use buttons::ButtonPins;
pub use encoder::{QuadratureCounter, ReloadHandle};
pub use storage::{load_config, ConfigFlash};
pub use usb_output::{
    configure_usb_hid, HostCommandSender, HostRequestHandler, UsbHidOutput, HOST_COMMAND_DEPTH,
};
pub use ws2812::{FrameReady, SharedStrip, StripBuffer, Ws2812};
