//! Persisted controller configuration.
//!
//! [`Config`] is a plain record of named fields. Range-bounded fields are
//! clamped by [`Config::sanitized`]; the wire form lives in [`crate::serialize`].

/// Maximum number of LEDs on the RGB strip.
pub const MAX_LEDS: u8 = 60;

/// Maximum number of comets in the multi-comet animation.
pub const MAX_CIRCLES: u8 = 8;

/// Bounds for the configured debounce window, in polls.
pub const DEBOUNCE_TICKS_MIN: u8 = 2;
pub const DEBOUNCE_TICKS_MAX: u8 = 10;

/// Length of the human readable label.
pub const LABEL_LEN: usize = 12;

/// Keyboard scancodes: B1..B7, E1..E4, turntable -1, turntable +1.
pub const KEYCODE_COUNT: usize = 13;

/// Which HID interfaces carry button input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    Both,
    ControllerOnly,
    KeyboardOnly,
    /// Keyboard off and joystick force-disabled. Only reachable from a
    /// hand-edited record; the mode switch never produces it.
    Neither,
}

/// How the turntable is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TurntableMode {
    Both,
    AnalogOnly,
    DigitalOnly,
}

/// Boolean behaviour switches.
///
/// The persisted record seeds the runtime copy at boot; afterwards only the
/// mode switch changes the runtime copy.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigFlags {
    /// Select acts as a multi-tap effector source.
    pub select_multi_function: bool,
    /// Reverse the quadrature counter direction.
    pub invert_qe1: bool,
    /// Swap which effector buttons 8 and 9 drive.
    pub swap_8_9: bool,
    /// Report the turntable as two digital buttons.
    pub digital_tt_enable: bool,
    /// Debounce the seven keys.
    pub debounce_enable: bool,
    /// Poll the host at 250 Hz instead of 1 kHz.
    pub poll_at_250hz: bool,
    /// Keep the analog axis alive while the digital turntable is enabled.
    pub analog_tt_force_enable: bool,
    pub keyboard_enable: bool,
    pub joy_input_force_disable: bool,
    /// Allow Start+Select chords to change modes.
    pub mode_switch_enable: bool,
    /// All lights off.
    pub led_off: bool,
    /// Turntable LEDs follow turntable motion.
    pub tt_led_reactive: bool,
    /// Turntable LEDs follow host LED bits.
    pub tt_led_hid: bool,
    /// An addressable LED strip is fitted.
    pub ws2812b: bool,
}

impl ConfigFlags {
    pub const SELECT_MULTI_FUNCTION: u32 = 1 << 0;
    pub const INVERT_QE1: u32 = 1 << 1;
    pub const SWAP_8_9: u32 = 1 << 2;
    pub const DIGITAL_TT_ENABLE: u32 = 1 << 3;
    pub const DEBOUNCE_ENABLE: u32 = 1 << 4;
    pub const POLL_AT_250HZ: u32 = 1 << 5;
    pub const ANALOG_TT_FORCE_ENABLE: u32 = 1 << 6;
    pub const KEYBOARD_ENABLE: u32 = 1 << 7;
    pub const JOY_INPUT_FORCE_DISABLE: u32 = 1 << 8;
    pub const MODE_SWITCH_ENABLE: u32 = 1 << 9;
    pub const LED_OFF: u32 = 1 << 10;
    pub const TT_LED_REACTIVE: u32 = 1 << 11;
    pub const TT_LED_HID: u32 = 1 << 12;
    pub const WS2812B: u32 = 1 << 13;

    /// Pack into the persisted bit layout.
    #[must_use]
    pub fn to_bits(self) -> u32 {
        let mut bits = 0;
        for (set, bit) in [
            (self.select_multi_function, Self::SELECT_MULTI_FUNCTION),
            (self.invert_qe1, Self::INVERT_QE1),
            (self.swap_8_9, Self::SWAP_8_9),
            (self.digital_tt_enable, Self::DIGITAL_TT_ENABLE),
            (self.debounce_enable, Self::DEBOUNCE_ENABLE),
            (self.poll_at_250hz, Self::POLL_AT_250HZ),
            (self.analog_tt_force_enable, Self::ANALOG_TT_FORCE_ENABLE),
            (self.keyboard_enable, Self::KEYBOARD_ENABLE),
            (self.joy_input_force_disable, Self::JOY_INPUT_FORCE_DISABLE),
            (self.mode_switch_enable, Self::MODE_SWITCH_ENABLE),
            (self.led_off, Self::LED_OFF),
            (self.tt_led_reactive, Self::TT_LED_REACTIVE),
            (self.tt_led_hid, Self::TT_LED_HID),
            (self.ws2812b, Self::WS2812B),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }

    /// Unpack from the persisted bit layout. Unknown bits are ignored.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        let has = |bit: u32| bits & bit != 0;
        Self {
            select_multi_function: has(Self::SELECT_MULTI_FUNCTION),
            invert_qe1: has(Self::INVERT_QE1),
            swap_8_9: has(Self::SWAP_8_9),
            digital_tt_enable: has(Self::DIGITAL_TT_ENABLE),
            debounce_enable: has(Self::DEBOUNCE_ENABLE),
            poll_at_250hz: has(Self::POLL_AT_250HZ),
            analog_tt_force_enable: has(Self::ANALOG_TT_FORCE_ENABLE),
            keyboard_enable: has(Self::KEYBOARD_ENABLE),
            joy_input_force_disable: has(Self::JOY_INPUT_FORCE_DISABLE),
            mode_switch_enable: has(Self::MODE_SWITCH_ENABLE),
            led_off: has(Self::LED_OFF),
            tt_led_reactive: has(Self::TT_LED_REACTIVE),
            tt_led_hid: has(Self::TT_LED_HID),
            ws2812b: has(Self::WS2812B),
        }
    }

    #[must_use]
    pub fn input_mode(&self) -> InputMode {
        match (self.keyboard_enable, self.joy_input_force_disable) {
            (true, false) => InputMode::Both,
            (false, false) => InputMode::ControllerOnly,
            (true, true) => InputMode::KeyboardOnly,
            (false, true) => InputMode::Neither,
        }
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        let (keyboard, joy_disable) = match mode {
            InputMode::Both => (true, false),
            InputMode::ControllerOnly => (false, false),
            InputMode::KeyboardOnly => (true, true),
            InputMode::Neither => (false, true),
        };
        self.keyboard_enable = keyboard;
        self.joy_input_force_disable = joy_disable;
    }

    #[must_use]
    pub fn turntable_mode(&self) -> TurntableMode {
        match (self.digital_tt_enable, self.analog_tt_force_enable) {
            (false, _) => TurntableMode::AnalogOnly,
            (true, true) => TurntableMode::Both,
            (true, false) => TurntableMode::DigitalOnly,
        }
    }

    pub fn set_turntable_mode(&mut self, mode: TurntableMode) {
        let (digital, analog_force) = match mode {
            TurntableMode::Both => (true, true),
            TurntableMode::AnalogOnly => (false, false),
            TurntableMode::DigitalOnly => (true, false),
        };
        self.digital_tt_enable = digital;
        self.analog_tt_force_enable = analog_force;
    }

    /// Whether the analog axis carries the turntable position.
    #[must_use]
    pub fn analog_axis_enabled(&self) -> bool {
        !self.joy_input_force_disable && self.turntable_mode() != TurntableMode::DigitalOnly
    }
}

/// Which physical buttons drive which effector outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EffectorMode {
    /// Start → E1, Select → E2.
    #[default]
    StartE1SelectE2 = 0,
    /// Start → E2, Select → E1.
    StartE2SelectE1 = 1,
    /// Start → E3, Select → E4.
    StartE3SelectE4 = 2,
    /// Start → E4, Select → E3.
    StartE4SelectE3 = 3,
}

impl EffectorMode {
    /// Decode a persisted value. Unknown values fall back to the default.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::StartE2SelectE1,
            2 => Self::StartE3SelectE4,
            3 => Self::StartE4SelectE3,
            _ => Self::StartE1SelectE2,
        }
    }
}

/// RGB strip animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnimationMode {
    /// Primary colour; turntable motion lifts brightness.
    #[default]
    Static = 0,
    /// Fade between primary and secondary.
    TwoColorFade = 1,
    /// Fade through primary, secondary and tertiary.
    ThreeColorFade = 2,
    /// Repeating primary/secondary/tertiary pattern that rotates.
    Tricolor = 3,
    /// Hue gradient across the strip.
    Rainbow = 4,
    /// One bright dot with a fading tail.
    Comet = 5,
    /// Several evenly spaced dots.
    MultiComet = 6,
    /// Primary colour with breathing brightness.
    Breathe = 7,
    /// New random hue on every turntable spin.
    RandomHue = 8,
    /// Built-in palette spread across the strip.
    Palette = 9,
}

impl AnimationMode {
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::TwoColorFade,
            2 => Self::ThreeColorFade,
            3 => Self::Tricolor,
            4 => Self::Rainbow,
            5 => Self::Comet,
            6 => Self::MultiComet,
            7 => Self::Breathe,
            8 => Self::RandomHue,
            9 => Self::Palette,
            _ => Self::Static,
        }
    }
}

/// Built-in colour palettes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PaletteId {
    #[default]
    RainbowReverse = 0,
    CannonBallers = 1,
    Tricoro = 2,
    Bistrover = 3,
    HeroicVerse = 4,
}

impl PaletteId {
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::CannonBallers,
            2 => Self::Tricoro,
            3 => Self::Bistrover,
            4 => Self::HeroicVerse,
            _ => Self::RainbowReverse,
        }
    }
}

/// Hue-saturation-value colour, all channels 0..=255.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HsvColor {
    pub hue: u8,
    pub sat: u8,
    pub val: u8,
}

impl HsvColor {
    #[must_use]
    pub const fn new(hue: u8, sat: u8, val: u8) -> Self {
        Self { hue, sat, val }
    }
}

/// Red-green-blue colour as sent by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Addressable LED strip settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbConfig {
    pub primary: HsvColor,
    pub secondary: HsvColor,
    pub tertiary: HsvColor,
    /// Global dimming, 0 = full brightness, 255 = off.
    pub darkness: u8,
    pub mode: AnimationMode,
    pub palette: PaletteId,
    pub num_leds: u8,
    /// Phase advance while the turntable is still.
    pub idle_speed: u8,
    /// Extra phase advance at full turntable activity.
    pub tt_speed: u8,
    /// Brightness floor for modes that brighten with turntable motion.
    pub idle_brightness: u8,
    /// Time for turntable activity to decay to zero.
    pub tt_fade_out_ms: u16,
    pub num_circles: u8,
    /// Reverse the animation direction.
    pub flip_direction: bool,
    /// Accept colour overrides from the host.
    pub enable_hid: bool,
    /// Let turntable motion drive the animation.
    pub react_to_tt: bool,
}

impl RgbConfig {
    pub const FLIP_DIRECTION: u8 = 1 << 0;
    pub const ENABLE_HID: u8 = 1 << 1;
    pub const REACT_TO_TT: u8 = 1 << 2;

    #[must_use]
    pub fn flag_bits(&self) -> u8 {
        let mut bits = 0;
        if self.flip_direction {
            bits |= Self::FLIP_DIRECTION;
        }
        if self.enable_hid {
            bits |= Self::ENABLE_HID;
        }
        if self.react_to_tt {
            bits |= Self::REACT_TO_TT;
        }
        bits
    }

    pub fn set_flag_bits(&mut self, bits: u8) {
        self.flip_direction = bits & Self::FLIP_DIRECTION != 0;
        self.enable_hid = bits & Self::ENABLE_HID != 0;
        self.react_to_tt = bits & Self::REACT_TO_TT != 0;
    }
}

impl Default for RgbConfig {
    fn default() -> Self {
        Self {
            primary: HsvColor::new(170, 255, 255),
            secondary: HsvColor::new(0, 255, 255),
            tertiary: HsvColor::new(85, 255, 255),
            darkness: 0,
            mode: AnimationMode::Static,
            palette: PaletteId::RainbowReverse,
            num_leds: 12,
            idle_speed: 10,
            tt_speed: 80,
            idle_brightness: 96,
            tt_fade_out_ms: 1000,
            num_circles: 2,
            flip_direction: false,
            enable_hid: true,
            react_to_tt: true,
        }
    }
}

/// The persisted configuration record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub label: [u8; LABEL_LEN],
    pub flags: ConfigFlags,
    /// Turntable counter ratio: 0 = 1:1, -N = 1:N, +N = N:1.
    pub tt_sensitivity: i8,
    pub effector_mode: EffectorMode,
    /// Key debounce window in polls, used when `flags.debounce_enable` is set.
    pub debounce_ticks: u8,
    /// Counter travel that counts as digital turntable motion.
    pub tt_deadzone: u8,
    /// How long digital turntable motion is held after the last movement.
    pub tt_sustain_ms: u16,
    /// HID usage codes, see [`KEYCODE_COUNT`].
    pub keycodes: [u8; KEYCODE_COUNT],
    pub rgb: RgbConfig,
}

impl Config {
    /// Return a copy with every range-bounded field clamped into range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.debounce_ticks = self
            .debounce_ticks
            .clamp(DEBOUNCE_TICKS_MIN, DEBOUNCE_TICKS_MAX);
        self.tt_sensitivity = self.tt_sensitivity.max(-i8::MAX);
        self.tt_deadzone = self.tt_deadzone.max(1);
        self.rgb.num_leds = self.rgb.num_leds.clamp(1, MAX_LEDS);
        self.rgb.num_circles = self.rgb.num_circles.clamp(1, MAX_CIRCLES);
        self
    }

    /// Label as text, up to the first NUL.
    #[must_use]
    pub fn label_str(&self) -> &str {
        let end = self
            .label
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(LABEL_LEN);
        core::str::from_utf8(&self.label[..end]).unwrap_or("")
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut label = [0u8; LABEL_LEN];
        label[..9].copy_from_slice(b"turntable");
        Self {
            label,
            flags: ConfigFlags {
                mode_switch_enable: true,
                tt_led_reactive: true,
                ..ConfigFlags::default()
            },
            tt_sensitivity: 0,
            effector_mode: EffectorMode::StartE1SelectE2,
            debounce_ticks: DEBOUNCE_TICKS_MIN,
            tt_deadzone: 4,
            tt_sustain_ms: 200,
            // HID usages: Z S X D C F V, Tab Enter Esc Backspace, Down Up.
            keycodes: [
                0x1D, 0x16, 0x1B, 0x07, 0x06, 0x09, 0x19, 0x2B, 0x28, 0x29, 0x2A, 0x51, 0x52,
            ],
            rgb: RgbConfig::default(),
        }
    }
}
