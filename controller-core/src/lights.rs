//! Button and turntable light arbitration.
//!
//! Each tick the button lights show, in order of precedence: a scheduled
//! acknowledgment pattern, recent host light bits, or the pressed buttons.

use crate::time::{Instant, Timer};
use controller_proto::{ConfigFlags, Pins};

/// Host light bits stay valid this long after the last report.
pub const HOST_LIGHTS_TIMEOUT_MS: u32 = 5000;

/// Scheduled patterns alternate at this period.
pub const BLINK_PERIOD_MS: u32 = 200;

/// Length of the white-key flash shown at boot.
pub const BOOT_FLASH_MS: u32 = 1000;

/// Host light bits driving the two turntable LEDs.
pub const HOST_TT_LED_1: u16 = 1 << 11;
pub const HOST_TT_LED_2: u16 = 1 << 12;

/// Accepts timed light patterns for human-visible acknowledgment.
pub trait LedScheduler {
    /// Show `pattern_a` and `pattern_b` alternately for `duration_ms`.
    fn schedule(&mut self, now: Instant, duration_ms: u32, pattern_a: Pins, pattern_b: Pins);
}

/// Light state to drive this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightsFrame {
    pub buttons: Pins,
    pub turntable: [bool; 2],
}

#[derive(Clone, Copy, Debug)]
struct Scheduled {
    end: Instant,
    pattern_a: Pins,
    pattern_b: Pins,
}

/// Static LED arbiter.
#[derive(Clone, Debug, Default)]
pub struct ButtonLights {
    scheduled: Option<Scheduled>,
    host_bits: u16,
    host_expiry: Timer,
    host_tt: Timer,
    current: LightsFrame,
}

impl ButtonLights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an acknowledgment pattern is currently showing.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }

    /// Accept light bits from the host.
    ///
    /// Ignored while lights are disabled or an acknowledgment is showing.
    pub fn set_from_host(&mut self, now: Instant, bits: u16, flags: &ConfigFlags) {
        if flags.led_off || self.scheduled.is_some() {
            return;
        }
        self.host_bits = bits;
        self.host_expiry.arm(now, HOST_LIGHTS_TIMEOUT_MS);
        if flags.tt_led_hid {
            self.host_tt.arm(now, HOST_LIGHTS_TIMEOUT_MS);
        }
    }

    /// Compute the lights for this tick.
    pub fn update(
        &mut self,
        now: Instant,
        pressed: Pins,
        tt_direction: i8,
        flags: &ConfigFlags,
    ) -> LightsFrame {
        let enabled = !flags.led_off;

        let buttons = match self.scheduled_pattern(now) {
            Some(pattern) => pattern,
            None if self.host_active(now) => Pins(self.host_bits),
            None if enabled => pressed,
            None => Pins::NONE,
        };

        let turntable = if flags.tt_led_reactive {
            let on = enabled && tt_direction != 0;
            [on, on]
        } else if flags.tt_led_hid && self.host_tt.is_armed() && !self.host_tt.is_expired(now) {
            [
                self.host_bits & HOST_TT_LED_1 != 0,
                self.host_bits & HOST_TT_LED_2 != 0,
            ]
        } else {
            [enabled, enabled]
        };

        self.current = LightsFrame {
            buttons: buttons & Pins::ALL,
            turntable,
        };
        self.current
    }

    /// The frame computed by the last [`ButtonLights::update`].
    #[must_use]
    pub fn current(&self) -> LightsFrame {
        self.current
    }

    fn scheduled_pattern(&mut self, now: Instant) -> Option<Pins> {
        let scheduled = self.scheduled?;
        let remaining = scheduled.end.elapsed_since(now) as i32;
        if remaining <= 0 {
            self.scheduled = None;
            return None;
        }
        if (remaining as u32 / BLINK_PERIOD_MS) % 2 == 0 {
            Some(scheduled.pattern_a)
        } else {
            Some(scheduled.pattern_b)
        }
    }

    fn host_active(&mut self, now: Instant) -> bool {
        self.host_expiry.is_armed() && !self.host_expiry.check_expired_and_disarm(now)
    }
}

impl LedScheduler for ButtonLights {
    fn schedule(&mut self, now: Instant, duration_ms: u32, pattern_a: Pins, pattern_b: Pins) {
        self.scheduled = Some(Scheduled {
            end: now.wrapping_add_ms(duration_ms),
            pattern_a,
            pattern_b,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(t: u32) -> Instant {
        Instant::from_millis(t)
    }

    fn flags() -> ConfigFlags {
        ConfigFlags::default()
    }

    #[test]
    fn test_mirrors_pressed_buttons() {
        let mut lights = ButtonLights::new();
        let frame = lights.update(ms(0), Pins::B1 | Pins::START, 0, &flags());
        assert_eq!(frame.buttons, Pins::B1 | Pins::START);
        assert_eq!(frame.turntable, [true, true]);
    }

    #[test]
    fn test_disabled_lights_stay_dark() {
        let mut lights = ButtonLights::new();
        let flags = ConfigFlags {
            led_off: true,
            ..flags()
        };
        let frame = lights.update(ms(0), Pins::B1, 0, &flags);
        assert_eq!(frame, LightsFrame::default());
    }

    #[test]
    fn test_scheduled_pattern_alternates_then_ends() {
        let mut lights = ButtonLights::new();
        lights.schedule(ms(0), 1000, Pins::B2, Pins::B4);
        // 1000 ms remaining: 1000 / 200 = 5, odd.
        assert_eq!(lights.update(ms(0), Pins::B1, 0, &flags()).buttons, Pins::B4);
        // 750 ms remaining: 3, odd.
        assert_eq!(lights.update(ms(250), Pins::B1, 0, &flags()).buttons, Pins::B4);
        // 550 ms remaining: 2, even.
        assert_eq!(lights.update(ms(450), Pins::B1, 0, &flags()).buttons, Pins::B2);
        assert_eq!(lights.update(ms(1000), Pins::B1, 0, &flags()).buttons, Pins::B1);
        assert!(!lights.is_scheduled());
    }

    #[test]
    fn test_scheduled_pattern_shows_while_disabled() {
        let mut lights = ButtonLights::new();
        let flags = ConfigFlags {
            led_off: true,
            ..flags()
        };
        lights.schedule(ms(0), 500, Pins::B4, Pins::B4);
        assert_eq!(lights.update(ms(10), Pins::NONE, 0, &flags).buttons, Pins::B4);
    }

    #[test]
    fn test_host_lights_expire() {
        let mut lights = ButtonLights::new();
        lights.set_from_host(ms(0), Pins::B7.raw(), &flags());
        assert_eq!(lights.update(ms(1), Pins::B1, 0, &flags()).buttons, Pins::B7);
        assert_eq!(lights.update(ms(5000), Pins::B1, 0, &flags()).buttons, Pins::B7);
        assert_eq!(lights.update(ms(5001), Pins::B1, 0, &flags()).buttons, Pins::B1);
    }

    #[test]
    fn test_host_lights_ignored_during_schedule() {
        let mut lights = ButtonLights::new();
        lights.schedule(ms(0), 100, Pins::B2, Pins::B2);
        lights.set_from_host(ms(1), Pins::B7.raw(), &flags());
        assert_eq!(lights.update(ms(200), Pins::B1, 0, &flags()).buttons, Pins::B1);
    }

    #[test]
    fn test_reactive_turntable_leds() {
        let mut lights = ButtonLights::new();
        let flags = ConfigFlags {
            tt_led_reactive: true,
            ..flags()
        };
        assert_eq!(lights.update(ms(0), Pins::NONE, 0, &flags).turntable, [false, false]);
        assert_eq!(lights.update(ms(1), Pins::NONE, -1, &flags).turntable, [true, true]);
    }

    #[test]
    fn test_host_turntable_leds() {
        let mut lights = ButtonLights::new();
        let flags = ConfigFlags {
            tt_led_hid: true,
            ..flags()
        };
        lights.set_from_host(ms(0), HOST_TT_LED_2, &flags);
        assert_eq!(lights.update(ms(1), Pins::NONE, 0, &flags).turntable, [false, true]);
        assert_eq!(lights.update(ms(5001), Pins::NONE, 0, &flags).turntable, [true, true]);
    }
}
