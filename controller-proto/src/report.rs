//! HID report payloads exchanged with the host.

use crate::config::{RgbColor, KEYCODE_COUNT};

/// Report id of the gamepad input report.
pub const GAMEPAD_REPORT_ID: u8 = 0x01;
/// Report id of the host button-light output report.
pub const LIGHTS_REPORT_ID: u8 = 0x02;
/// Report id of the host RGB output report.
pub const RGB_REPORT_ID: u8 = 0x03;
/// Report id of the host turntable resistance output report.
pub const RESISTANCE_REPORT_ID: u8 = 0x04;

/// Gamepad input report: 16 buttons and two 8-bit axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    pub buttons: u16,
    pub axis_x: u8,
    pub axis_y: u8,
}

impl GamepadReport {
    /// Size of the report in bytes, report id included.
    pub const SIZE: usize = 5;

    /// Centred axes, nothing pressed.
    pub const NEUTRAL: Self = Self {
        buttons: 0,
        axis_x: 127,
        axis_y: 127,
    };

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let [lo, hi] = self.buttons.to_le_bytes();
        [GAMEPAD_REPORT_ID, lo, hi, self.axis_x, self.axis_y]
    }
}

impl Default for GamepadReport {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Keyboard input report: an array of HID usage codes, 0 = unused slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub scancodes: [u8; KEYCODE_COUNT],
}

impl KeyboardReport {
    pub const SIZE: usize = KEYCODE_COUNT;

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        self.scancodes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scancodes.iter().all(|&code| code == 0)
    }
}

/// A decoded host output report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// Button light bits: physical pin layout in bits 0..=10, turntable LEDs
    /// in bits 11 and 12.
    Lights(u16),
    /// Colour for the whole LED strip.
    Rgb(RgbColor),
    /// Turntable resistance level.
    Resistance(u8),
}

/// Error type for host report parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    Empty,
    UnknownId(u8),
    /// Payload length does not match the report id.
    BadLength,
}

impl core::fmt::Display for ReportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty report"),
            Self::UnknownId(id) => write!(f, "unknown report id {id:#04x}"),
            Self::BadLength => write!(f, "bad report length"),
        }
    }
}

/// Decode a host output report, leading report id included.
///
/// # Errors
///
/// Returns [`ReportError`] for empty input, unknown ids or short payloads.
///
/// ```
/// use controller_proto::{parse_output_report, HostCommand, RgbColor};
///
/// let cmd = parse_output_report(&[0x03, 10, 20, 30, 0]).unwrap();
/// assert_eq!(cmd, HostCommand::Rgb(RgbColor::new(10, 20, 30)));
/// ```
pub fn parse_output_report(bytes: &[u8]) -> Result<HostCommand, ReportError> {
    let (&id, payload) = bytes.split_first().ok_or(ReportError::Empty)?;
    match id {
        LIGHTS_REPORT_ID => match payload {
            [lo, hi, ..] => Ok(HostCommand::Lights(u16::from_le_bytes([*lo, *hi]))),
            _ => Err(ReportError::BadLength),
        },
        RGB_REPORT_ID => match payload {
            [red, green, blue, ..] => Ok(HostCommand::Rgb(RgbColor::new(*red, *green, *blue))),
            _ => Err(ReportError::BadLength),
        },
        RESISTANCE_REPORT_ID => match payload {
            [level, ..] => Ok(HostCommand::Resistance(*level)),
            _ => Err(ReportError::BadLength),
        },
        other => Err(ReportError::UnknownId(other)),
    }
}
