//! Long-press chords that change runtime modes for the current session.
//!
//! Holding Start + Select + a third button for [`CHORD_THRESHOLD_MS`] cycles
//! one mode and flashes an acknowledgment on the button lights. Changes
//! only affect the runtime copy of the flags; the persisted record is never
//! touched.

use crate::lights::LedScheduler;
use crate::log;
use crate::time::Instant;
use controller_proto::{ConfigFlags, InputMode, Pins, TurntableMode};

/// How long a chord must be held before it fires.
pub const CHORD_THRESHOLD_MS: u32 = 3000;

/// How long the acknowledgment pattern is shown.
pub const ACK_DURATION_MS: u32 = 2500;

/// A togglable feature and the third button of its chord.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Chord {
    /// Start + Select + B1.
    InputMode,
    /// Start + Select + B3.
    TurntableMode,
    /// Start + Select + B7.
    Lights,
}

impl Chord {
    /// Chords in priority order when several third buttons are held.
    pub const ALL: [Chord; 3] = [Chord::InputMode, Chord::TurntableMode, Chord::Lights];

    #[must_use]
    pub const fn button(self) -> Pins {
        match self {
            Chord::InputMode => Pins::B1,
            Chord::TurntableMode => Pins::B3,
            Chord::Lights => Pins::B7,
        }
    }

    /// The chord being held in `pins`, if any.
    #[must_use]
    pub fn held(pins: Pins) -> Option<Chord> {
        if !pins.contains(Pins::START | Pins::SELECT) {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|chord| pins.contains(chord.button()))
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Chord detector owning the runtime flags.
#[derive(Clone, Debug)]
pub struct ModeSwitch {
    boot: ConfigFlags,
    current: ConfigFlags,
    /// Milliseconds each chord has been held.
    held_ms: [u32; 3],
    /// Set after a chord fires until it is released.
    latched: bool,
    last_update: Option<Instant>,
}

impl ModeSwitch {
    /// Seed the runtime flags from the persisted ones.
    #[must_use]
    pub fn new(persisted: ConfigFlags) -> Self {
        Self {
            boot: persisted,
            current: persisted,
            held_ms: [0; 3],
            latched: false,
            last_update: None,
        }
    }

    #[must_use]
    pub fn flags(&self) -> ConfigFlags {
        self.current
    }

    /// The flags as seeded at boot.
    #[must_use]
    pub fn persisted(&self) -> ConfigFlags {
        self.boot
    }

    /// Milliseconds `chord` has been held so far.
    #[must_use]
    pub fn progress(&self, chord: Chord) -> u32 {
        self.held_ms[chord.index()]
    }

    /// Feed the debounced physical buttons; returns the current runtime flags.
    ///
    /// Runs at most once per millisecond.
    pub fn process(
        &mut self,
        now: Instant,
        pins: Pins,
        lights: &mut impl LedScheduler,
    ) -> ConfigFlags {
        let elapsed = match self.last_update {
            Some(last) if last == now => return self.current,
            Some(last) => now.elapsed_since(last),
            None => 1,
        };
        self.last_update = Some(now);

        let held = Chord::held(pins);
        if held.is_none() {
            self.latched = false;
        }

        for chord in Chord::ALL {
            let counter = &mut self.held_ms[chord.index()];
            if held != Some(chord) || self.latched {
                *counter = 0;
                continue;
            }
            *counter = counter.saturating_add(elapsed);
            if *counter >= CHORD_THRESHOLD_MS {
                *counter = 0;
                self.latched = true;
                self.fire(now, chord, lights);
            }
        }

        self.current
    }

    fn fire(&mut self, now: Instant, chord: Chord, lights: &mut impl LedScheduler) {
        let flags = &mut self.current;
        // true acknowledges with B2, false with B4.
        let first_choice = match chord {
            Chord::InputMode => {
                let next = match flags.input_mode() {
                    InputMode::ControllerOnly => InputMode::KeyboardOnly,
                    InputMode::Both | InputMode::KeyboardOnly | InputMode::Neither => {
                        InputMode::ControllerOnly
                    }
                };
                flags.set_input_mode(next);
                log::info!("Input mode={:?}", next);
                next == InputMode::ControllerOnly
            }
            Chord::TurntableMode => {
                let next = match flags.turntable_mode() {
                    TurntableMode::AnalogOnly => TurntableMode::DigitalOnly,
                    TurntableMode::Both | TurntableMode::DigitalOnly => TurntableMode::AnalogOnly,
                };
                flags.set_turntable_mode(next);
                log::info!("Turntable mode={:?}", next);
                next == TurntableMode::AnalogOnly
            }
            Chord::Lights => {
                flags.led_off = !flags.led_off;
                log::info!("Lights off={:?}", flags.led_off);
                !flags.led_off
            }
        };

        let base = Pins::START | Pins::SELECT | chord.button();
        let mark = if first_choice { Pins::B2 } else { Pins::B4 };
        lights.schedule(now, ACK_DURATION_MS, base | mark, base);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingLights {
        scheduled: Vec<(u32, u32, Pins, Pins)>,
    }

    impl LedScheduler for RecordingLights {
        fn schedule(&mut self, now: Instant, duration_ms: u32, a: Pins, b: Pins) {
            self.scheduled
                .push((now.as_millis(), duration_ms, a, b));
        }
    }

    const CHORD_B1: Pins = Pins(Pins::START.0 | Pins::SELECT.0 | Pins::B1.0);
    const CHORD_B3: Pins = Pins(Pins::START.0 | Pins::SELECT.0 | Pins::B3.0);
    const CHORD_B7: Pins = Pins(Pins::START.0 | Pins::SELECT.0 | Pins::B7.0);

    fn hold(
        switch: &mut ModeSwitch,
        lights: &mut RecordingLights,
        pins: Pins,
        from: u32,
        to: u32,
    ) -> ConfigFlags {
        let mut flags = switch.flags();
        for t in from..to {
            flags = switch.process(Instant::from_millis(t), pins, lights);
        }
        flags
    }

    #[test]
    fn test_chord_detection_priority() {
        assert_eq!(Chord::held(Pins::B1 | Pins::START), None);
        assert_eq!(Chord::held(CHORD_B1), Some(Chord::InputMode));
        assert_eq!(Chord::held(CHORD_B1 | Pins::B3), Some(Chord::InputMode));
        assert_eq!(Chord::held(CHORD_B3 | Pins::B7), Some(Chord::TurntableMode));
        assert_eq!(Chord::held(Pins::START | Pins::SELECT), None);
    }

    #[test]
    fn test_short_hold_does_nothing() {
        let mut switch = ModeSwitch::new(ConfigFlags::default());
        let mut lights = RecordingLights::default();
        let flags = hold(&mut switch, &mut lights, CHORD_B1, 0, 2999);
        assert_eq!(flags, ConfigFlags::default());
        assert!(lights.scheduled.is_empty());
    }

    #[test]
    fn test_release_resets_progress() {
        let mut switch = ModeSwitch::new(ConfigFlags::default());
        let mut lights = RecordingLights::default();
        hold(&mut switch, &mut lights, CHORD_B1, 0, 2000);
        assert_eq!(switch.progress(Chord::InputMode), 2000);
        hold(&mut switch, &mut lights, Pins::START, 2000, 2001);
        assert_eq!(switch.progress(Chord::InputMode), 0);
        hold(&mut switch, &mut lights, CHORD_B1, 2001, 4001);
        assert_eq!(switch.flags(), ConfigFlags::default());
    }

    #[test]
    fn test_input_mode_cycle_fires_once() {
        let mut switch = ModeSwitch::new(ConfigFlags::default());
        let mut lights = RecordingLights::default();
        let flags = hold(&mut switch, &mut lights, CHORD_B1, 0, 9000);
        assert_eq!(flags.input_mode(), InputMode::KeyboardOnly);
        assert_eq!(lights.scheduled.len(), 1);
        let (at, duration, a, b) = lights.scheduled[0];
        assert_eq!((at, duration), (2999, ACK_DURATION_MS));
        assert_eq!(a, CHORD_B1 | Pins::B4);
        assert_eq!(b, CHORD_B1);

        hold(&mut switch, &mut lights, Pins::NONE, 9000, 9001);
        let flags = hold(&mut switch, &mut lights, CHORD_B1, 9001, 12001);
        assert_eq!(flags.input_mode(), InputMode::ControllerOnly);
        assert_eq!(lights.scheduled[1].2, CHORD_B1 | Pins::B2);
    }

    #[test]
    fn test_both_input_modes_go_to_controller() {
        let mut persisted = ConfigFlags::default();
        persisted.set_input_mode(InputMode::Both);
        let mut switch = ModeSwitch::new(persisted);
        let mut lights = RecordingLights::default();
        let flags = hold(&mut switch, &mut lights, CHORD_B1, 0, 3000);
        assert_eq!(flags.input_mode(), InputMode::ControllerOnly);
        assert_eq!(switch.persisted(), persisted);
    }

    #[test]
    fn test_turntable_mode_cycle() {
        let mut persisted = ConfigFlags::default();
        persisted.set_turntable_mode(TurntableMode::Both);
        let mut switch = ModeSwitch::new(persisted);
        let mut lights = RecordingLights::default();

        let mut t = 0;
        let mut seen = Vec::new();
        for _ in 0..3 {
            hold(&mut switch, &mut lights, CHORD_B3, t, t + 3000);
            hold(&mut switch, &mut lights, Pins::NONE, t + 3000, t + 3001);
            t += 3001;
            seen.push(switch.flags().turntable_mode());
        }
        assert_eq!(
            seen,
            [
                TurntableMode::AnalogOnly,
                TurntableMode::DigitalOnly,
                TurntableMode::AnalogOnly
            ]
        );
    }

    #[test]
    fn test_lights_toggle() {
        let mut switch = ModeSwitch::new(ConfigFlags::default());
        let mut lights = RecordingLights::default();
        let flags = hold(&mut switch, &mut lights, CHORD_B7, 0, 3000);
        assert!(flags.led_off);
        assert_eq!(lights.scheduled[0].2, CHORD_B7 | Pins::B4);
    }

    #[test]
    fn test_switching_chords_restarts_count() {
        let mut switch = ModeSwitch::new(ConfigFlags::default());
        let mut lights = RecordingLights::default();
        hold(&mut switch, &mut lights, CHORD_B1, 0, 2000);
        hold(&mut switch, &mut lights, CHORD_B3, 2000, 4000);
        assert_eq!(switch.progress(Chord::InputMode), 0);
        assert_eq!(switch.progress(Chord::TurntableMode), 2000);
        assert!(lights.scheduled.is_empty());
    }

    #[test]
    fn test_same_millisecond_counts_once() {
        let mut switch = ModeSwitch::new(ConfigFlags::default());
        let mut lights = RecordingLights::default();
        for _ in 0..5 {
            switch.process(Instant::from_millis(7), CHORD_B1, &mut lights);
        }
        assert_eq!(switch.progress(Chord::InputMode), 1);
    }
}
