//! Turntable sensitivity: counter ratio adjusted by host resistance feedback.
//!
//! A ratio of `0` is 1:1, `-N` divides the counter by N (1:N) and `+N`
//! multiplies it by N (N:1). The hardware counter wraps at a reload value
//! derived from the live ratio, see [`auto_reload`].

use crate::log;
use crate::time::{Instant, Timer};

/// Resistance levels at which one more step of resistance is added.
pub const RESISTANCE_THRESHOLDS: [u8; 9] = [210, 214, 222, 230, 234, 238, 242, 246, 250];

/// Feedback older than this reverts to the configured ratio.
pub const FEEDBACK_TIMEOUT_MS: u32 = 10_000;

/// Hook into the quadrature counter peripheral.
pub trait CounterRange {
    /// Set the value after which the counter wraps back to zero.
    fn set_auto_reload(&mut self, reload: u32);
}

/// Number of thresholds at or below `level`.
#[must_use]
pub fn resistance_steps(level: u8) -> u8 {
    RESISTANCE_THRESHOLDS
        .iter()
        .filter(|&&threshold| threshold <= level)
        .count() as u8
}

/// Ratio to use for `configured` with `steps` of added resistance.
///
/// Resistance always moves the ratio towards coarser division. A baseline of
/// 1:1 starts at 1:2, and a positive baseline that would cross 1:1 skips
/// straight past it into division.
#[must_use]
pub fn translate_resistance(configured: i8, steps: u8) -> i8 {
    if steps == 0 {
        return configured;
    }
    let steps = steps as i8;
    let ratio = match configured {
        0 => -steps.saturating_add(1),
        c if c < 0 => c.saturating_sub(steps),
        c => {
            let reduced = c.saturating_sub(steps);
            if reduced <= 0 {
                reduced.saturating_sub(2)
            } else {
                reduced
            }
        }
    };
    ratio.max(-i8::MAX)
}

/// Counter reload value for `ratio`.
#[must_use]
pub fn auto_reload(ratio: i8) -> u32 {
    if ratio < 0 {
        256 * u32::from(ratio.unsigned_abs()) - 1
    } else {
        255
    }
}

/// Live turntable sensitivity.
#[derive(Clone, Debug)]
pub struct TurntableSensitivity {
    configured: i8,
    active: i8,
    last_resistance: Option<u8>,
    feedback: Timer,
}

impl TurntableSensitivity {
    /// Start at the configured ratio and program the counter range.
    pub fn new(configured: i8, range: &mut impl CounterRange) -> Self {
        let configured = configured.max(-i8::MAX);
        range.set_auto_reload(auto_reload(configured));
        Self {
            configured,
            active: configured,
            last_resistance: None,
            feedback: Timer::new(),
        }
    }

    #[must_use]
    pub fn configured_ratio(&self) -> i8 {
        self.configured
    }

    #[must_use]
    pub fn current_ratio(&self) -> i8 {
        self.active
    }

    /// Handle a resistance report from the host.
    pub fn resistance_report(&mut self, now: Instant, level: u8, range: &mut impl CounterRange) {
        self.feedback.arm(now, FEEDBACK_TIMEOUT_MS);
        if self.last_resistance == Some(level) {
            return;
        }
        self.last_resistance = Some(level);

        let ratio = translate_resistance(self.configured, resistance_steps(level));
        if ratio != self.active {
            log::debug!("Turntable ratio={:?} for resistance={:?}", ratio, level);
            self.apply(ratio, range);
        }
    }

    /// Revert to the configured ratio once feedback has gone stale.
    ///
    /// Returns true on the poll that reverts.
    pub fn refresh(&mut self, now: Instant, range: &mut impl CounterRange) -> bool {
        if !self.feedback.check_expired_and_disarm(now) {
            return false;
        }
        log::info!("Resistance feedback stale, reverting turntable ratio");
        self.last_resistance = None;
        let configured = self.configured;
        self.apply(configured, range);
        true
    }

    /// Apply the live ratio to a raw counter value for the analog axis.
    #[must_use]
    pub fn scale_counter(&self, raw: u32) -> u32 {
        match self.active {
            r if r < 0 => raw / u32::from(r.unsigned_abs()),
            r if r > 0 => raw.wrapping_mul(r as u32),
            _ => raw,
        }
    }

    fn apply(&mut self, ratio: i8, range: &mut impl CounterRange) {
        self.active = ratio;
        range.set_auto_reload(auto_reload(ratio));
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockRange {
        reloads: Vec<u32>,
    }

    impl CounterRange for MockRange {
        fn set_auto_reload(&mut self, reload: u32) {
            self.reloads.push(reload);
        }
    }

    fn ms(t: u32) -> Instant {
        Instant::from_millis(t)
    }

    #[test]
    fn test_resistance_steps() {
        assert_eq!(resistance_steps(0), 0);
        assert_eq!(resistance_steps(209), 0);
        assert_eq!(resistance_steps(210), 1);
        assert_eq!(resistance_steps(229), 3);
        assert_eq!(resistance_steps(255), 9);
    }

    #[test]
    fn test_translate_from_unity() {
        assert_eq!(translate_resistance(0, 0), 0);
        assert_eq!(translate_resistance(0, 1), -2);
        assert_eq!(translate_resistance(0, 9), -10);
    }

    #[test]
    fn test_translate_from_division() {
        assert_eq!(translate_resistance(-3, 2), -5);
        assert_eq!(translate_resistance(-125, 9), -127);
    }

    #[test]
    fn test_translate_from_multiplication_skips_unity() {
        assert_eq!(translate_resistance(5, 2), 3);
        assert_eq!(translate_resistance(2, 1), 1);
        assert_eq!(translate_resistance(2, 2), -2);
        assert_eq!(translate_resistance(2, 4), -4);
    }

    #[test]
    fn test_auto_reload() {
        assert_eq!(auto_reload(0), 255);
        assert_eq!(auto_reload(4), 255);
        assert_eq!(auto_reload(-1), 255);
        assert_eq!(auto_reload(-2), 511);
        assert_eq!(auto_reload(-127), 256 * 127 - 1);
    }

    #[test]
    fn test_new_programs_range() {
        let mut range = MockRange::default();
        let sens = TurntableSensitivity::new(-2, &mut range);
        assert_eq!(sens.current_ratio(), -2);
        assert_eq!(range.reloads, [511]);
    }

    #[test]
    fn test_report_applies_ratio_once() {
        let mut range = MockRange::default();
        let mut sens = TurntableSensitivity::new(0, &mut range);
        sens.resistance_report(ms(0), 222, &mut range);
        sens.resistance_report(ms(10), 222, &mut range);
        assert_eq!(sens.current_ratio(), -4);
        assert_eq!(range.reloads, [255, 1023]);
    }

    #[test]
    fn test_low_resistance_keeps_configured() {
        let mut range = MockRange::default();
        let mut sens = TurntableSensitivity::new(3, &mut range);
        sens.resistance_report(ms(0), 100, &mut range);
        assert_eq!(sens.current_ratio(), 3);
        assert_eq!(range.reloads, [255]);
    }

    #[test]
    fn test_stale_feedback_reverts_exactly_once() {
        let mut range = MockRange::default();
        let mut sens = TurntableSensitivity::new(0, &mut range);
        sens.resistance_report(ms(1000), 250, &mut range);
        assert_eq!(sens.current_ratio(), -10);

        assert!(!sens.refresh(ms(11_000), &mut range));
        assert!(sens.refresh(ms(11_001), &mut range));
        assert_eq!(sens.current_ratio(), 0);
        assert!(!sens.refresh(ms(20_000), &mut range));
        assert_eq!(range.reloads, [255, 256 * 10 - 1, 255]);
    }

    #[test]
    fn test_same_level_reapplies_after_revert() {
        let mut range = MockRange::default();
        let mut sens = TurntableSensitivity::new(0, &mut range);
        sens.resistance_report(ms(0), 214, &mut range);
        sens.refresh(ms(10_001), &mut range);
        sens.resistance_report(ms(10_002), 214, &mut range);
        assert_eq!(sens.current_ratio(), -3);
    }

    #[test]
    fn test_scale_counter() {
        let mut range = MockRange::default();
        let mut sens = TurntableSensitivity::new(0, &mut range);
        assert_eq!(sens.scale_counter(100), 100);
        sens.resistance_report(ms(0), 210, &mut range);
        assert_eq!(sens.scale_counter(100), 50);

        let sens = TurntableSensitivity::new(3, &mut range);
        assert_eq!(sens.scale_counter(50), 150);
    }
}
