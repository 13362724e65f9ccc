//! LED strip transmission with a busy flag.
//!
//! The producer offers whole frames with [`LedStrip::write`]; a frame
//! offered while the previous one is still shifting out is refused and the
//! producer simply tries again with its next frame. The consumer (a
//! transmit-complete interrupt or a task feeding a shift register) pulls
//! one LED at a time with [`ShiftOut::next_word`] and is the only code that
//! clears the busy flag.

use smart_leds::RGB8;

/// Duty-cycle slots per LED in a timer-compare transmit buffer: a leading
/// and trailing idle slot around 24 data bits.
pub const PWM_SLOTS: usize = 26;

/// Compare value for a one bit.
pub const PWM_ONE: u8 = 58;

/// Compare value for a zero bit.
pub const PWM_ZERO: u8 = 29;

/// Error type for strip writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripError {
    /// Previous frame still shifting out; this frame was dropped.
    Busy,
}

/// Destination for rendered frames.
pub trait LedStrip {
    /// Check if a frame is still being transmitted.
    fn is_busy(&self) -> bool;

    /// Begin transmitting `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`StripError::Busy`] without touching the transmit buffer if
    /// the previous frame has not finished.
    fn write(&mut self, frame: &[RGB8]) -> Result<(), StripError>;
}

/// Pack a colour as WS2812 wire order (green, red, blue) in the upper 24
/// bits, ready for an MSB-first shift register.
#[inline]
#[must_use]
pub fn grb_word(color: RGB8) -> u32 {
    (u32::from(color.g) << 24) | (u32::from(color.r) << 16) | (u32::from(color.b) << 8)
}

/// Encode one LED as timer compare values, G-R-B, most significant bit first.
#[must_use]
pub fn encode_pwm(color: RGB8) -> [u8; PWM_SLOTS] {
    let mut slots = [0u8; PWM_SLOTS];
    let word = grb_word(color);
    for (bit, slot) in slots[1..PWM_SLOTS - 1].iter_mut().enumerate() {
        *slot = if word & (1 << (31 - bit)) != 0 {
            PWM_ONE
        } else {
            PWM_ZERO
        };
    }
    slots
}

/// Frame buffer shared between the renderer and the transmit side.
#[derive(Clone, Debug)]
pub struct ShiftOut<const N: usize> {
    buffer: [RGB8; N],
    len: usize,
    cursor: usize,
    busy: bool,
}

impl<const N: usize> ShiftOut<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [RGB8 { r: 0, g: 0, b: 0 }; N],
            len: 0,
            cursor: 0,
            busy: false,
        }
    }

    /// LEDs of the current frame not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }

    /// Next LED of the frame in flight.
    ///
    /// Returns `None` and clears the busy flag once every LED has been
    /// handed out.
    pub fn next_word(&mut self) -> Option<u32> {
        if !self.busy {
            return None;
        }
        if self.cursor < self.len {
            let word = grb_word(self.buffer[self.cursor]);
            self.cursor += 1;
            Some(word)
        } else {
            self.busy = false;
            None
        }
    }
}

impl<const N: usize> Default for ShiftOut<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LedStrip for ShiftOut<N> {
    fn is_busy(&self) -> bool {
        self.busy
    }

    fn write(&mut self, frame: &[RGB8]) -> Result<(), StripError> {
        if self.busy {
            return Err(StripError::Busy);
        }
        let len = frame.len().min(N);
        self.buffer[..len].copy_from_slice(&frame[..len]);
        self.len = len;
        self.cursor = 0;
        self.busy = len > 0;
        Ok(())
    }
}
