//! Digital turntable: turns a wrapping quadrature counter into a direction.

use crate::time::{Instant, Timer};

/// Tri-state direction derived from counter movement, with deadzone and
/// sustain hysteresis.
///
/// The counter delta is taken as an 8-bit signed wrapping difference, so the
/// counter's own wraparound is invisible as long as it moves less than 128
/// counts between polls.
#[derive(Clone, Debug)]
pub struct AnalogButton {
    deadzone: u8,
    sustain_ms: u32,
    clear_on_reverse: bool,
    center: Option<u8>,
    sustain: Timer,
    state: i8,
}

impl AnalogButton {
    /// `deadzone` is clamped to at least one count.
    #[must_use]
    pub fn new(deadzone: u8, sustain_ms: u32, clear_on_reverse: bool) -> Self {
        Self {
            deadzone: deadzone.clamp(1, i8::MAX as u8),
            sustain_ms,
            clear_on_reverse,
            center: None,
            sustain: Timer::new(),
            state: 0,
        }
    }

    /// Current direction held internally, which may differ from the last
    /// reported value for one poll after a reversal.
    #[must_use]
    pub fn state(&self) -> i8 {
        self.state
    }

    /// Sample the counter and return -1, 0 or 1.
    pub fn poll(&mut self, now: Instant, counter: u32) -> i8 {
        let current = counter as u8;
        let center = *self.center.get_or_insert(current);

        let delta = current.wrapping_sub(center) as i8;
        let deadzone = self.deadzone as i8;
        let direction: i8 = if delta >= deadzone {
            1
        } else if delta <= -deadzone {
            -1
        } else {
            0
        };

        if direction != 0 {
            self.center = Some(current);
            self.sustain.arm(now, self.sustain_ms);
        } else if self.sustain.check_expired_and_disarm(now) {
            self.state = 0;
            self.center = Some(current);
        }

        if direction != 0 && direction == -self.state && self.clear_on_reverse {
            self.state = direction;
            return 0;
        }
        if direction != 0 {
            self.state = direction;
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(t: u32) -> Instant {
        Instant::from_millis(t)
    }

    #[test]
    fn test_first_poll_centers() {
        let mut button = AnalogButton::new(4, 200, true);
        assert_eq!(button.poll(ms(0), 1000), 0);
        assert_eq!(button.poll(ms(1), 1000), 0);
    }

    #[test]
    fn test_deadzone_boundary() {
        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), 100);
        assert_eq!(button.poll(ms(1), 103), 0);
        assert_eq!(button.poll(ms(2), 104), 1);

        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), 100);
        assert_eq!(button.poll(ms(1), 97), 0);
        assert_eq!(button.poll(ms(2), 96), -1);
    }

    #[test]
    fn test_counter_wraparound() {
        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), u32::MAX - 1);
        assert_eq!(button.poll(ms(1), 3), 1);
    }

    #[test]
    fn test_clear_on_reverse_reports_neutral_once() {
        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), 100);
        assert_eq!(button.poll(ms(1), 110), 1);
        assert_eq!(button.poll(ms(2), 100), 0);
        assert_eq!(button.state(), -1);
        assert_eq!(button.poll(ms(3), 90), -1);
    }

    #[test]
    fn test_reverse_without_clear() {
        let mut button = AnalogButton::new(4, 200, false);
        button.poll(ms(0), 100);
        assert_eq!(button.poll(ms(1), 110), 1);
        assert_eq!(button.poll(ms(2), 100), -1);
    }

    #[test]
    fn test_sustain_holds_then_releases() {
        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), 0);
        assert_eq!(button.poll(ms(10), 8), 1);
        for t in 11..=210 {
            assert_eq!(button.poll(ms(t), 8), 1, "released early at {t}");
        }
        assert_eq!(button.poll(ms(211), 8), 0);
    }

    #[test]
    fn test_movement_extends_sustain() {
        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), 0);
        button.poll(ms(10), 5);
        button.poll(ms(150), 10);
        assert_eq!(button.poll(ms(300), 10), 1);
        assert_eq!(button.poll(ms(351), 10), 0);
    }

    #[test]
    fn test_slow_drift_recentered_after_release() {
        let mut button = AnalogButton::new(4, 200, true);
        button.poll(ms(0), 0);
        button.poll(ms(1), 10);
        button.poll(ms(300), 12);
        assert_eq!(button.state(), 0);
        assert_eq!(button.poll(ms(301), 15), 0);
        assert_eq!(button.poll(ms(302), 16), 1);
    }
}
