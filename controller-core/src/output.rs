//! Output sink trait and error types.

use crate::pipeline::Frame;
use core::future::Future;

/// Error type for output operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    /// USB/communication I/O error.
    Io,
    /// Device not ready (e.g., USB not enumerated).
    NotReady,
}

/// Destination for the reports produced each tick.
///
/// The firmware implements this over USB HID; tests record frames.
pub trait OutputSink {
    /// Send the reports of one tick.
    ///
    /// May wait until the previous report has been taken by the host.
    fn send(&mut self, frame: &Frame) -> impl Future<Output = Result<(), OutputError>>;

    /// Check if the output is ready to accept data.
    fn is_ready(&self) -> bool;
}
