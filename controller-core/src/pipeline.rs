//! Per-tick controller pipeline.
//!
//! [`Controller`] owns every stateful component and runs them in a fixed
//! order once per poll:
//!
//! 1. button and turntable lights
//! 2. chord debounce and mode switch
//! 3. remap physical pins to logical buttons
//! 4. key and effector debounce
//! 5. digital turntable
//! 6. LED strip animation
//! 7. multi-tap synthesis on E2
//! 8. gamepad and keyboard reports

use crate::analog_button::AnalogButton;
use crate::debounce::Debouncer;
use crate::lights::{ButtonLights, LedScheduler, LightsFrame, BOOT_FLASH_MS};
use crate::log;
use crate::modeswitch::ModeSwitch;
use crate::multitap::MultiTap;
use crate::output::{OutputError, OutputSink};
use crate::remap::remap;
use crate::rgb::{LedStrip, RgbEngine};
use crate::time::Instant;
use crate::ttsens::{CounterRange, TurntableSensitivity};
use controller_proto::{
    Buttons, Config, ConfigFlags, GamepadReport, HostCommand, KeyboardReport, Pins,
    KEYCODE_COUNT,
};

/// Window used to debounce raw pins before chord detection.
pub const CHORD_DEBOUNCE_WINDOW: u8 = 4;

/// Minimum debounce window for effectors, applied even when key debounce
/// is off.
pub const EFFECTOR_DEBOUNCE_WINDOW: u8 = 4;

/// Digital turntable bits in the gamepad report.
pub const GAMEPAD_TT_DOWN: u16 = Buttons::TT_DOWN.0;
pub const GAMEPAD_TT_UP: u16 = Buttons::TT_UP.0;

/// Keycode slots used for the digital turntable.
const KEYCODE_TT_DOWN: usize = 11;
const KEYCODE_TT_UP: usize = 12;

/// Everything produced by one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub gamepad: GamepadReport,
    /// Present only while keyboard input is enabled.
    pub keyboard: Option<KeyboardReport>,
    pub lights: LightsFrame,
    /// Logical buttons after remapping, debounce and multi-tap.
    pub buttons: Buttons,
    /// Digital turntable direction: -1, 0 or 1.
    pub direction: i8,
}

/// The controller core, generic over the quadrature counter's reload hook.
pub struct Controller<R> {
    config: Config,
    range: R,
    mode_switch: ModeSwitch,
    lights: ButtonLights,
    chord_debounce: Debouncer,
    key_debounce: Debouncer,
    effector_debounce: Debouncer,
    turntable: AnalogButton,
    sensitivity: TurntableSensitivity,
    rgb: RgbEngine,
    multitap: MultiTap,
    last: Frame,
}

impl<R: CounterRange> Controller<R> {
    /// Build the pipeline from a persisted configuration.
    ///
    /// Programs the counter reload and starts the boot light flash.
    pub fn new(config: Config, mut range: R, now: Instant) -> Self {
        let config = config.sanitized();
        let flags = config.flags;

        let sensitivity = TurntableSensitivity::new(config.tt_sensitivity, &mut range);
        let effector_window = if flags.debounce_enable {
            config.debounce_ticks.max(EFFECTOR_DEBOUNCE_WINDOW)
        } else {
            EFFECTOR_DEBOUNCE_WINDOW
        };

        let mut lights = ButtonLights::new();
        lights.schedule(now, BOOT_FLASH_MS, Pins::WHITE_KEYS, Pins::WHITE_KEYS);

        log::info!(
            "Controller config={=str} effectors={:?} debounce={=u8}",
            config.label_str(),
            config.effector_mode,
            config.debounce_ticks
        );

        Self {
            range,
            mode_switch: ModeSwitch::new(flags),
            lights,
            chord_debounce: Debouncer::new(CHORD_DEBOUNCE_WINDOW),
            key_debounce: Debouncer::new(config.debounce_ticks),
            effector_debounce: Debouncer::new(effector_window),
            turntable: AnalogButton::new(config.tt_deadzone, u32::from(config.tt_sustain_ms), true),
            sensitivity,
            rgb: RgbEngine::new(config.rgb, u64::from(now.as_millis()) ^ 0x5EED),
            multitap: MultiTap::new(Buttons::E2),
            last: Frame::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runtime flags, including any mode-switch changes.
    #[must_use]
    pub fn flags(&self) -> ConfigFlags {
        self.mode_switch.flags()
    }

    #[must_use]
    pub fn range(&self) -> &R {
        &self.range
    }

    #[must_use]
    pub fn sensitivity(&self) -> &TurntableSensitivity {
        &self.sensitivity
    }

    #[must_use]
    pub fn rgb(&self) -> &RgbEngine {
        &self.rgb
    }

    /// The frame produced by the last tick.
    #[must_use]
    pub fn last_frame(&self) -> &Frame {
        &self.last
    }

    /// Run one poll with the raw pin state and quadrature counter.
    pub fn tick(
        &mut self,
        now: Instant,
        pins: Pins,
        counter: u32,
        strip: &mut impl LedStrip,
    ) -> Frame {
        let mut pins = pins & Pins::ALL;
        if self.config.flags.ws2812b {
            // B9 drives the strip's data line.
            pins = pins & !Pins::B9;
        }

        let flags = self.mode_switch.flags();
        let lights = self.lights.update(now, pins, self.last.direction, &flags);

        let chord = Pins(self.chord_debounce.update(now, pins.0));
        let flags = if self.config.flags.mode_switch_enable {
            self.mode_switch.process(now, chord, &mut self.lights)
        } else {
            flags
        };

        let mut buttons = remap(pins, self.config.effector_mode, flags.swap_8_9);
        if flags.debounce_enable {
            buttons = Buttons(
                self.key_debounce
                    .update_masked(now, buttons.0, Buttons::KEYS.0),
            );
        }
        buttons = Buttons(
            self.effector_debounce
                .update_masked(now, buttons.0, Buttons::EFFECTORS.0),
        );

        let direction = self.turntable.poll(now, counter);
        self.refresh(now);

        if flags.ws2812b {
            self.rgb.update_colors(now, direction, !flags.led_off, strip);
        }

        if flags.select_multi_function {
            buttons = self.multitap.apply(now, buttons);
        }

        let frame = Frame {
            gamepad: self.gamepad_report(&flags, buttons, direction, counter),
            keyboard: flags
                .keyboard_enable
                .then(|| self.keyboard_report(buttons, direction)),
            lights,
            buttons,
            direction,
        };
        self.last = frame;
        frame
    }

    /// Tick, then hand the frame to `sink` if it is ready.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::NotReady`] without sending if the sink is not
    /// ready, or the sink's own error.
    pub async fn tick_and_send(
        &mut self,
        now: Instant,
        pins: Pins,
        counter: u32,
        strip: &mut impl LedStrip,
        sink: &mut impl OutputSink,
    ) -> Result<Frame, OutputError> {
        let frame = self.tick(now, pins, counter, strip);
        if !sink.is_ready() {
            return Err(OutputError::NotReady);
        }
        sink.send(&frame).await?;
        Ok(frame)
    }

    /// Route a decoded host output report.
    pub fn host_command(&mut self, now: Instant, command: HostCommand, strip: &mut impl LedStrip) {
        let flags = self.mode_switch.flags();
        match command {
            HostCommand::Lights(bits) => self.lights.set_from_host(now, bits, &flags),
            HostCommand::Rgb(color) => {
                if flags.ws2812b {
                    self.rgb.update_from_hid(now, color, !flags.led_off, strip);
                }
            }
            HostCommand::Resistance(level) => {
                self.sensitivity
                    .resistance_report(now, level, &mut self.range);
            }
        }
    }

    /// Age out stale host overrides.
    pub fn refresh(&mut self, now: Instant) {
        self.sensitivity.refresh(now, &mut self.range);
    }

    fn gamepad_report(
        &self,
        flags: &ConfigFlags,
        buttons: Buttons,
        direction: i8,
        counter: u32,
    ) -> GamepadReport {
        if flags.joy_input_force_disable {
            return GamepadReport::NEUTRAL;
        }

        let mut bits = buttons.0 & !(GAMEPAD_TT_DOWN | GAMEPAD_TT_UP);
        if flags.digital_tt_enable {
            match direction {
                -1 => bits |= GAMEPAD_TT_DOWN,
                1 => bits |= GAMEPAD_TT_UP,
                _ => {}
            }
        }

        let axis_x = if flags.analog_axis_enabled() {
            // Only the low byte reaches the host.
            self.sensitivity.scale_counter(counter) as u8
        } else {
            127
        };

        GamepadReport {
            buttons: bits,
            axis_x,
            axis_y: 127,
        }
    }

    fn keyboard_report(&self, buttons: Buttons, direction: i8) -> KeyboardReport {
        let keycodes = &self.config.keycodes;
        let mut scancodes = [0u8; KEYCODE_COUNT];
        for (i, button) in Buttons::KEYCODE_ORDER.iter().enumerate() {
            if buttons.contains(*button) {
                scancodes[i] = keycodes[i];
            }
        }
        match direction {
            -1 => scancodes[KEYCODE_TT_DOWN] = keycodes[KEYCODE_TT_DOWN],
            1 => scancodes[KEYCODE_TT_UP] = keycodes[KEYCODE_TT_UP],
            _ => {}
        }
        KeyboardReport { scancodes }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::rgb::ShiftOut;
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use controller_proto::{InputMode, RgbColor, TurntableMode, MAX_LEDS};
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

    #[derive(Default)]
    struct MockSink {
        sent: Vec<Frame>,
        offline: bool,
    }

    impl OutputSink for MockSink {
        fn send(&mut self, frame: &Frame) -> impl Future<Output = Result<(), OutputError>> {
            self.sent.push(*frame);
            core::future::ready(Ok(()))
        }

        fn is_ready(&self) -> bool {
            !self.offline
        }
    }

    fn block_on<F: Future>(mut f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: f is not moved after pinning
        let mut f = unsafe { Pin::new_unchecked(&mut f) };

        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => panic!("Mock future returned Pending unexpectedly"),
        }
    }

    type Strip = ShiftOut<{ MAX_LEDS as usize }>;

    fn ms(t: u32) -> Instant {
        Instant::from_millis(t)
    }

    fn controller(config: Config) -> Controller<MockRange> {
        Controller::new(config, MockRange::default(), ms(0))
    }

    /// Tick every millisecond over `from..to` with constant inputs.
    fn run(
        ctrl: &mut Controller<MockRange>,
        strip: &mut Strip,
        pins: Pins,
        counter: u32,
        from: u32,
        to: u32,
    ) -> Frame {
        let mut frame = *ctrl.last_frame();
        for t in from..to {
            frame = ctrl.tick(ms(t), pins, counter, strip);
        }
        frame
    }

    #[test]
    fn test_new_programs_reload_and_boot_flash() {
        let mut config = Config::default();
        config.tt_sensitivity = -2;
        let mut ctrl = controller(config);
        assert_eq!(ctrl.range().reloads, [511]);

        let mut strip = Strip::new();
        let frame = ctrl.tick(ms(0), Pins::NONE, 0, &mut strip);
        assert_eq!(frame.lights.buttons, Pins::WHITE_KEYS);
        let frame = run(&mut ctrl, &mut strip, Pins::NONE, 0, 1, 1002);
        assert_eq!(frame.lights.buttons, Pins::NONE);
    }

    #[test]
    fn test_effectors_debounced_even_when_disabled() {
        let mut ctrl = controller(Config::default());
        let mut strip = Strip::new();
        let frame = run(&mut ctrl, &mut strip, Pins::START | Pins::B1, 0, 0, 3);
        assert_eq!(frame.buttons, Buttons::B1);
        let frame = run(&mut ctrl, &mut strip, Pins::START | Pins::B1, 0, 3, 4);
        assert_eq!(frame.buttons, Buttons::B1 | Buttons::E1);
        assert_eq!(frame.gamepad.buttons, (Buttons::B1 | Buttons::E1).0);
    }

    #[test]
    fn test_key_debounce_when_enabled() {
        let mut config = Config::default();
        config.flags.debounce_enable = true;
        config.debounce_ticks = 3;
        let mut ctrl = controller(config);
        let mut strip = Strip::new();
        let frame = run(&mut ctrl, &mut strip, Pins::B2, 0, 0, 2);
        assert_eq!(frame.buttons, Buttons::NONE);
        let frame = run(&mut ctrl, &mut strip, Pins::B2, 0, 2, 3);
        assert_eq!(frame.buttons, Buttons::B2);
    }

    #[test]
    fn test_axis_and_digital_turntable() {
        let mut config = Config::default();
        config.flags.set_turntable_mode(TurntableMode::Both);
        let mut ctrl = controller(config);
        let mut strip = Strip::new();

        let frame = ctrl.tick(ms(0), Pins::NONE, 10, &mut strip);
        assert_eq!(frame.gamepad.axis_x, 10);
        assert_eq!(frame.gamepad.axis_y, 127);
        assert_eq!(frame.direction, 0);

        let frame = ctrl.tick(ms(1), Pins::NONE, 16, &mut strip);
        assert_eq!(frame.direction, 1);
        assert_eq!(frame.gamepad.buttons & GAMEPAD_TT_UP, GAMEPAD_TT_UP);

        let frame = ctrl.tick(ms(2), Pins::NONE, 12, &mut strip);
        assert_eq!(frame.gamepad.buttons & (GAMEPAD_TT_UP | GAMEPAD_TT_DOWN), 0);
    }

    #[test]
    fn test_digital_only_centres_axis() {
        let mut config = Config::default();
        config.flags.set_turntable_mode(TurntableMode::DigitalOnly);
        let mut ctrl = controller(config);
        let frame = ctrl.tick(ms(0), Pins::NONE, 42, &mut Strip::new());
        assert_eq!(frame.gamepad.axis_x, 127);
    }

    #[test]
    fn test_keyboard_report() {
        let mut config = Config::default();
        config.flags.set_input_mode(InputMode::Both);
        config.flags.set_turntable_mode(TurntableMode::Both);
        let mut ctrl = controller(config);
        let mut strip = Strip::new();

        ctrl.tick(ms(0), Pins::B3, 0, &mut strip);
        let frame = ctrl.tick(ms(1), Pins::B3, 250, &mut strip);
        let keyboard = frame.keyboard.unwrap();
        assert_eq!(keyboard.scancodes[2], config.keycodes[2]);
        assert_eq!(keyboard.scancodes[0], 0);
        assert_eq!(keyboard.scancodes[11], config.keycodes[11]);
        assert_eq!(keyboard.scancodes[12], 0);
        assert_eq!(frame.direction, -1);
    }

    #[test]
    fn test_keyboard_only_neutral_gamepad() {
        let mut config = Config::default();
        config.flags.set_input_mode(InputMode::KeyboardOnly);
        let mut ctrl = controller(config);
        let frame = ctrl.tick(ms(0), Pins::B1, 0, &mut Strip::new());
        assert_eq!(frame.gamepad, GamepadReport::NEUTRAL);
        assert!(frame.keyboard.is_some());
    }

    #[test]
    fn test_controller_only_has_no_keyboard() {
        let frame = controller(Config::default()).tick(ms(0), Pins::B1, 0, &mut Strip::new());
        assert!(frame.keyboard.is_none());
    }

    #[test]
    fn test_strip_pin_masked() {
        let mut config = Config::default();
        config.flags.ws2812b = true;
        let mut ctrl = controller(config);
        let frame = run(&mut ctrl, &mut Strip::new(), Pins::B9, 0, 0, 10);
        assert_eq!(frame.buttons, Buttons::NONE);
    }

    #[test]
    fn test_strip_frames_only_when_enabled() {
        let mut strip = Strip::new();
        controller(Config::default()).tick(ms(0), Pins::NONE, 0, &mut strip);
        assert!(!strip.is_busy());

        let mut config = Config::default();
        config.flags.ws2812b = true;
        controller(config).tick(ms(0), Pins::NONE, 0, &mut strip);
        assert!(strip.is_busy());
    }

    #[test]
    fn test_mode_switch_chord() {
        let mut ctrl = controller(Config::default());
        let mut strip = Strip::new();
        let chord = Pins::START | Pins::SELECT | Pins::B7;
        run(&mut ctrl, &mut strip, chord, 0, 0, 3010);
        assert!(ctrl.flags().led_off);
        assert!(!ctrl.config().flags.led_off);
    }

    #[test]
    fn test_mode_switch_disabled() {
        let mut config = Config::default();
        config.flags.mode_switch_enable = false;
        let mut ctrl = controller(config);
        let chord = Pins::START | Pins::SELECT | Pins::B7;
        run(&mut ctrl, &mut Strip::new(), chord, 0, 0, 4000);
        assert!(!ctrl.flags().led_off);
    }

    #[test]
    fn test_multitap_replaces_e2() {
        let mut config = Config::default();
        config.flags.select_multi_function = true;
        let mut ctrl = controller(config);
        let mut strip = Strip::new();

        // Select maps to E2 in the default effector mode.
        let frame = run(&mut ctrl, &mut strip, Pins::SELECT, 0, 0, 50);
        assert!(!frame.buttons.contains(Buttons::E2));
        run(&mut ctrl, &mut strip, Pins::NONE, 0, 50, 100);
        let frame = run(&mut ctrl, &mut strip, Pins::NONE, 0, 100, 520);
        assert!(frame.buttons.contains(Buttons::E2));
    }

    #[test]
    fn test_host_lights_and_resistance() {
        let mut ctrl = controller(Config::default());
        let mut strip = Strip::new();
        run(&mut ctrl, &mut strip, Pins::NONE, 0, 0, 1002);

        ctrl.host_command(ms(1002), HostCommand::Lights(Pins::B5.0), &mut strip);
        let frame = ctrl.tick(ms(1003), Pins::B1, 0, &mut strip);
        assert_eq!(frame.lights.buttons, Pins::B5);

        ctrl.host_command(ms(1003), HostCommand::Resistance(255), &mut strip);
        assert_eq!(ctrl.sensitivity().current_ratio(), -10);
        run(&mut ctrl, &mut strip, Pins::NONE, 0, 1004, 11_005);
        assert_eq!(ctrl.sensitivity().current_ratio(), 0);
        assert_eq!(ctrl.range().reloads, [255, 256 * 10 - 1, 255]);
    }

    #[test]
    fn test_host_rgb_requires_strip() {
        let mut ctrl = controller(Config::default());
        let mut strip = Strip::new();
        ctrl.host_command(ms(5), HostCommand::Rgb(RgbColor::new(1, 2, 3)), &mut strip);
        assert!(!strip.is_busy());

        let mut config = Config::default();
        config.flags.ws2812b = true;
        let mut ctrl = controller(config);
        ctrl.host_command(ms(5), HostCommand::Rgb(RgbColor::new(1, 2, 3)), &mut strip);
        assert!(strip.is_busy());
        assert!(ctrl.rgb().host_override_active(ms(6)));
    }

    #[test]
    fn test_tick_and_send() {
        let mut ctrl = controller(Config::default());
        let mut strip = Strip::new();
        let mut sink = MockSink::default();

        let frame = block_on(ctrl.tick_and_send(ms(0), Pins::B1, 0, &mut strip, &mut sink));
        assert_eq!(frame, Ok(sink.sent[0]));

        sink.offline = true;
        let result = block_on(ctrl.tick_and_send(ms(1), Pins::B1, 0, &mut strip, &mut sink));
        assert_eq!(result, Err(OutputError::NotReady));
        assert_eq!(sink.sent.len(), 1);
    }
}
