//! Frame-by-frame colour computation for the LED strip.

use super::color::{
    apply_darkness, blend, brightest, from_host, hsv_to_rgb, lerp8, scale_rgb, triangle8,
    with_hue, BLACK,
};
use super::palette::palette_color;
use super::strip::{LedStrip, StripError};
use crate::log;
use crate::time::{Instant, Timer};
use controller_proto::{AnimationMode, RgbColor, RgbConfig, MAX_LEDS};
use smart_leds::RGB8;

/// Minimum time between animation frames.
pub const FRAME_PERIOD_MS: u32 = 20;

/// A host colour overrides the animation this long after it arrives.
pub const HOST_COLOR_TIMEOUT_MS: u32 = 5000;

/// Magnitude of turntable activity right after movement.
pub const ACTIVITY_MAX: i32 = 1 << 12;

/// Phase units per millisecond per unit of idle speed.
const IDLE_RATE: i64 = 2;

/// Phase units per millisecond per unit of turntable speed at full activity.
const TT_RATE: i64 = 4;

/// Per-mode speed multipliers in quarters: `(idle, turntable)`.
const fn rate_quarters(mode: AnimationMode) -> (i64, i64) {
    match mode {
        AnimationMode::Static | AnimationMode::RandomHue => (0, 0),
        AnimationMode::TwoColorFade | AnimationMode::ThreeColorFade => (2, 1),
        AnimationMode::Breathe => (4, 0),
        AnimationMode::Tricolor => (2, 2),
        AnimationMode::Rainbow | AnimationMode::Palette => (4, 4),
        AnimationMode::Comet | AnimationMode::MultiComet => (4, 6),
    }
}

/// RGB animation engine.
///
/// Call [`RgbEngine::update_colors`] every poll; it renders at most one frame
/// per [`FRAME_PERIOD_MS`]. Animation phase advances by wall-clock time, so
/// frames refused by a busy strip do not slow the animation down.
pub struct RgbEngine {
    config: RgbConfig,
    frame: [RGB8; MAX_LEDS as usize],
    last_frame: Option<Instant>,
    /// Wrapping animation phase, 65536 = one cycle.
    shift: u16,
    /// Signed turntable activity in `-ACTIVITY_MAX..=ACTIVITY_MAX`.
    activity: i32,
    /// True when the phase last moved backwards.
    reversed: bool,
    last_direction: i8,
    random_hue: u8,
    rng: fastrand::Rng,
    host_color: RGB8,
    host_expiry: Timer,
    dropped: u32,
}

impl RgbEngine {
    /// `seed` feeds the random-hue animation.
    #[must_use]
    pub fn new(config: RgbConfig, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let random_hue = rng.u8(..);
        Self {
            config,
            frame: [BLACK; MAX_LEDS as usize],
            last_frame: None,
            shift: 0,
            activity: 0,
            reversed: false,
            last_direction: 0,
            random_hue,
            rng,
            host_color: BLACK,
            host_expiry: Timer::new(),
            dropped: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RgbConfig {
        &self.config
    }

    /// Number of LEDs driven.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.config.num_leds.clamp(1, MAX_LEDS))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The most recently rendered frame.
    #[must_use]
    pub fn frame(&self) -> &[RGB8] {
        &self.frame[..self.len()]
    }

    #[must_use]
    pub fn phase(&self) -> u16 {
        self.shift
    }

    #[must_use]
    pub fn activity(&self) -> i32 {
        self.activity
    }

    /// Frames refused by a busy strip so far.
    #[must_use]
    pub fn dropped_frames(&self) -> u32 {
        self.dropped
    }

    /// Whether a host colour currently overrides the animation.
    #[must_use]
    pub fn host_override_active(&self, now: Instant) -> bool {
        self.host_expiry.is_armed() && !self.host_expiry.is_expired(now)
    }

    /// Feed this poll's turntable direction and render a frame when one is due.
    ///
    /// Returns true if a frame was handed to the strip.
    pub fn update_colors(
        &mut self,
        now: Instant,
        tt_direction: i8,
        enabled: bool,
        strip: &mut impl LedStrip,
    ) -> bool {
        if self.config.react_to_tt && tt_direction != 0 {
            if self.config.mode == AnimationMode::RandomHue && tt_direction != self.last_direction
            {
                self.random_hue = self.rng.u8(..);
            }
            self.activity = i32::from(tt_direction) * ACTIVITY_MAX;
        }
        self.last_direction = tt_direction;

        let elapsed = match self.last_frame {
            Some(last) => {
                let elapsed = now.elapsed_since(last);
                if elapsed < FRAME_PERIOD_MS {
                    return false;
                }
                elapsed
            }
            None => FRAME_PERIOD_MS,
        };
        self.last_frame = Some(now);

        self.advance(elapsed);
        self.render(now, enabled);
        self.transmit(strip)
    }

    /// Show a host colour on the whole strip, immediately.
    ///
    /// Ignored unless host control is enabled in the configuration.
    pub fn update_from_hid(
        &mut self,
        now: Instant,
        color: RgbColor,
        enabled: bool,
        strip: &mut impl LedStrip,
    ) -> bool {
        if !self.config.enable_hid {
            return false;
        }
        self.host_color = from_host(color);
        self.host_expiry.arm(now, HOST_COLOR_TIMEOUT_MS);
        self.render(now, enabled);
        self.transmit(strip)
    }

    fn transmit(&mut self, strip: &mut impl LedStrip) -> bool {
        let len = self.len();
        match strip.write(&self.frame[..len]) {
            Ok(()) => true,
            Err(StripError::Busy) => {
                self.dropped = self.dropped.wrapping_add(1);
                log::trace!("LED frame dropped, strip busy");
                false
            }
        }
    }

    /// Decay activity and move the phase by `elapsed_ms` of wall-clock time.
    fn advance(&mut self, elapsed_ms: u32) {
        let elapsed = i64::from(elapsed_ms);

        if self.config.react_to_tt && self.last_direction != 0 {
            self.activity = i32::from(self.last_direction) * ACTIVITY_MAX;
        } else {
            let fade = i64::from(self.config.tt_fade_out_ms);
            let decay = if fade == 0 {
                i64::from(ACTIVITY_MAX)
            } else {
                (i64::from(ACTIVITY_MAX) * elapsed / fade).max(1)
            };
            let magnitude = (i64::from(self.activity.abs()) - decay).max(0) as i32;
            self.activity = magnitude * self.activity.signum();
        }

        let (idle_q, tt_q) = rate_quarters(self.config.mode);
        let idle = i64::from(self.config.idle_speed) * IDLE_RATE * idle_q;
        let tt = i64::from(self.config.tt_speed) * TT_RATE * tt_q * i64::from(self.activity)
            / i64::from(ACTIVITY_MAX);
        let mut delta = (idle + tt) * elapsed / 4;
        if self.config.flip_direction {
            delta = -delta;
        }
        if delta != 0 {
            self.reversed = delta < 0;
        }
        // Truncation keeps the phase modulo one cycle.
        self.shift = self.shift.wrapping_add(delta as u16);
    }

    /// Brightness from idle floor up to full with turntable activity.
    fn reactive_level(&self) -> u8 {
        if !self.config.react_to_tt {
            return 255;
        }
        lerp8(self.config.idle_brightness, 255, self.intensity())
    }

    /// Activity magnitude as 0..=255.
    fn intensity(&self) -> u8 {
        (self.activity.unsigned_abs() * 255 / ACTIVITY_MAX as u32) as u8
    }

    fn render(&mut self, now: Instant, enabled: bool) {
        let len = self.len();
        if !enabled {
            self.frame[..len].fill(BLACK);
            return;
        }
        if self.host_override_active(now) {
            let color = apply_darkness(self.host_color, self.config.darkness);
            self.frame[..len].fill(color);
            return;
        }

        let cfg = self.config;
        let phase8 = (self.shift >> 8) as u8;
        let primary = hsv_to_rgb(cfg.primary);
        let secondary = hsv_to_rgb(cfg.secondary);
        let tertiary = hsv_to_rgb(cfg.tertiary);
        let colors = [primary, secondary, tertiary];
        let level = self.reactive_level();

        match cfg.mode {
            AnimationMode::Static => {
                self.frame[..len].fill(scale_rgb(primary, level));
            }
            AnimationMode::TwoColorFade => {
                let color = blend(primary, secondary, triangle8(phase8));
                self.frame[..len].fill(scale_rgb(color, level));
            }
            AnimationMode::ThreeColorFade => {
                let scaled = u32::from(self.shift) * 3;
                let segment = (scaled >> 16) as usize;
                let frac = (scaled >> 8) as u8;
                let color = blend(colors[segment], colors[(segment + 1) % 3], frac);
                self.frame[..len].fill(scale_rgb(color, level));
            }
            AnimationMode::Tricolor => {
                let offset = self.position(len);
                for (i, led) in self.frame[..len].iter_mut().enumerate() {
                    *led = scale_rgb(colors[(i + offset) % 3], level);
                }
            }
            AnimationMode::Rainbow => {
                let circles = usize::from(cfg.num_circles.max(1));
                for (i, led) in self.frame[..len].iter_mut().enumerate() {
                    let hue = phase8.wrapping_add((i * 256 * circles / len) as u8);
                    *led = scale_rgb(hsv_to_rgb(with_hue(cfg.primary, hue)), level);
                }
            }
            AnimationMode::Comet => {
                let head = self.position(len);
                let tail = (len / 4).max(1);
                for (i, led) in self.frame[..len].iter_mut().enumerate() {
                    let fade = comet_fade(head, i, len, tail, self.reversed);
                    *led = scale_rgb(primary, scale_level(fade, level));
                }
            }
            AnimationMode::MultiComet => {
                let circles = usize::from(cfg.num_circles.max(1)).min(len);
                let head = self.position(len);
                let tail = (len / (4 * circles)).max(1);
                for (i, led) in self.frame[..len].iter_mut().enumerate() {
                    *led = (0..circles).fold(BLACK, |acc, k| {
                        let head_k = (head + k * len / circles) % len;
                        let fade = comet_fade(head_k, i, len, tail, self.reversed);
                        brightest(acc, scale_rgb(colors[k % 3], scale_level(fade, level)))
                    });
                }
            }
            AnimationMode::Breathe => {
                let breath = lerp8(cfg.idle_brightness, 255, triangle8(phase8));
                let value = lerp8(breath, 255, self.intensity());
                self.frame[..len].fill(scale_rgb(primary, value));
            }
            AnimationMode::RandomHue => {
                let color = hsv_to_rgb(with_hue(cfg.primary, self.random_hue));
                self.frame[..len].fill(scale_rgb(color, level));
            }
            AnimationMode::Palette => {
                for (i, led) in self.frame[..len].iter_mut().enumerate() {
                    let index = phase8.wrapping_add((i * 256 / len) as u8);
                    *led = scale_rgb(palette_color(cfg.palette, index), level);
                }
            }
        }

        if cfg.darkness != 0 {
            for led in &mut self.frame[..len] {
                *led = apply_darkness(*led, cfg.darkness);
            }
        }
    }

    /// Phase as an LED index.
    fn position(&self, len: usize) -> usize {
        (usize::from(self.shift) * len) >> 16
    }
}

/// Brightness of LED `i` for a comet whose head is at `head`, trailing
/// `tail` LEDs behind it in the direction of travel.
fn comet_fade(head: usize, i: usize, len: usize, tail: usize, reversed: bool) -> u8 {
    let behind = if reversed {
        (i + len - head) % len
    } else {
        (head + len - i) % len
    };
    if behind >= tail {
        return 0;
    }
    (255 - behind * 255 / tail) as u8
}

fn scale_level(fade: u8, level: u8) -> u8 {
    super::color::scale8(fade, level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rgb::strip::ShiftOut;
    use controller_proto::HsvColor;

    fn ms(t: u32) -> Instant {
        Instant::from_millis(t)
    }

    fn config(mode: AnimationMode) -> RgbConfig {
        RgbConfig {
            mode,
            num_leds: 8,
            ..RgbConfig::default()
        }
    }

    /// Strip that never stays busy.
    struct Sink {
        frames: u32,
        busy: bool,
    }

    impl LedStrip for Sink {
        fn is_busy(&self) -> bool {
            self.busy
        }

        fn write(&mut self, _frame: &[RGB8]) -> Result<(), StripError> {
            if self.busy {
                return Err(StripError::Busy);
            }
            self.frames += 1;
            Ok(())
        }
    }

    fn sink() -> Sink {
        Sink {
            frames: 0,
            busy: false,
        }
    }

    #[test]
    fn test_frames_are_throttled() {
        let mut engine = RgbEngine::new(config(AnimationMode::Rainbow), 1);
        let mut strip = sink();
        for t in 0..100 {
            engine.update_colors(ms(t), 0, true, &mut strip);
        }
        // Frames at 0, 20, 40, 60, 80.
        assert_eq!(strip.frames, 5);
    }

    #[test]
    fn test_disabled_is_black() {
        let mut engine = RgbEngine::new(config(AnimationMode::Static), 1);
        let mut strip = sink();
        engine.update_colors(ms(0), 0, false, &mut strip);
        assert!(engine.frame().iter().all(|&c| c == BLACK));
        assert_eq!(engine.frame().len(), 8);
    }

    #[test]
    fn test_host_color_overrides_then_expires() {
        let mut engine = RgbEngine::new(config(AnimationMode::Static), 1);
        let mut strip = sink();
        let host = RgbColor::new(1, 2, 3);
        assert!(engine.update_from_hid(ms(0), host, true, &mut strip));
        assert!(engine.frame().iter().all(|&c| c == from_host(host)));

        engine.update_colors(ms(4000), 0, true, &mut strip);
        assert_eq!(engine.frame()[0], from_host(host));

        engine.update_colors(ms(5001), 0, true, &mut strip);
        assert_ne!(engine.frame()[0], from_host(host));
    }

    #[test]
    fn test_host_color_ignored_when_disabled_in_config() {
        let mut cfg = config(AnimationMode::Static);
        cfg.enable_hid = false;
        let mut engine = RgbEngine::new(cfg, 1);
        let mut strip = sink();
        assert!(!engine.update_from_hid(ms(0), RgbColor::new(9, 9, 9), true, &mut strip));
        assert!(!engine.host_override_active(ms(1)));
    }

    #[test]
    fn test_global_disable_beats_host_color() {
        let mut engine = RgbEngine::new(config(AnimationMode::Static), 1);
        let mut strip = sink();
        engine.update_from_hid(ms(0), RgbColor::new(200, 0, 0), false, &mut strip);
        assert!(engine.frame().iter().all(|&c| c == BLACK));
    }

    #[test]
    fn test_activity_jumps_and_decays() {
        let mut cfg = config(AnimationMode::Static);
        cfg.tt_fade_out_ms = 100;
        let mut engine = RgbEngine::new(cfg, 1);
        let mut strip = sink();

        engine.update_colors(ms(0), 1, true, &mut strip);
        assert_eq!(engine.activity(), ACTIVITY_MAX);
        engine.update_colors(ms(20), 0, true, &mut strip);
        assert!(engine.activity() < ACTIVITY_MAX && engine.activity() > 0);
        for t in (40..=200).step_by(20) {
            engine.update_colors(ms(t), 0, true, &mut strip);
        }
        assert_eq!(engine.activity(), 0);

        engine.update_colors(ms(220), -1, true, &mut strip);
        assert_eq!(engine.activity(), -ACTIVITY_MAX);
    }

    #[test]
    fn test_turntable_direction_flips_phase_direction() {
        let mut cfg = config(AnimationMode::Rainbow);
        cfg.idle_speed = 0;
        let mut forward = RgbEngine::new(cfg, 1);
        let mut backward = RgbEngine::new(cfg, 1);
        let mut strip = sink();

        forward.update_colors(ms(0), 1, true, &mut strip);
        forward.update_colors(ms(20), 1, true, &mut strip);
        backward.update_colors(ms(0), -1, true, &mut strip);
        backward.update_colors(ms(20), -1, true, &mut strip);

        assert_ne!(forward.phase(), 0);
        assert_eq!(forward.phase(), backward.phase().wrapping_neg());
    }

    #[test]
    fn test_flip_direction_negates_idle_drift() {
        let cfg = config(AnimationMode::Rainbow);
        let flipped = RgbConfig {
            flip_direction: true,
            ..cfg
        };
        let mut a = RgbEngine::new(cfg, 1);
        let mut b = RgbEngine::new(flipped, 1);
        let mut strip = sink();
        a.update_colors(ms(0), 0, true, &mut strip);
        b.update_colors(ms(0), 0, true, &mut strip);
        assert_eq!(a.phase(), b.phase().wrapping_neg());
    }

    #[test]
    fn test_dropped_frames_keep_wall_clock_phase() {
        let cfg = config(AnimationMode::Rainbow);
        let mut smooth = RgbEngine::new(cfg, 1);
        let mut choppy = RgbEngine::new(cfg, 1);
        let mut free = sink();
        let mut busy = ShiftOut::<8>::new();

        for t in (0..=200).step_by(20) {
            smooth.update_colors(ms(t), 0, true, &mut free);
            choppy.update_colors(ms(t), 0, true, &mut busy);
        }
        assert!(choppy.dropped_frames() > 0);
        assert_eq!(smooth.phase(), choppy.phase());
    }

    #[test]
    fn test_darkness_applies_to_animation() {
        let mut cfg = config(AnimationMode::Static);
        cfg.react_to_tt = false;
        cfg.primary = HsvColor::new(0, 0, 255);
        let bright = {
            let mut engine = RgbEngine::new(cfg, 1);
            engine.update_colors(ms(0), 0, true, &mut sink());
            engine.frame()[0]
        };
        cfg.darkness = 255;
        let mut engine = RgbEngine::new(cfg, 1);
        engine.update_colors(ms(0), 0, true, &mut sink());
        assert_ne!(bright, BLACK);
        assert_eq!(engine.frame()[0], BLACK);
    }

    #[test]
    fn test_rainbow_spreads_hue() {
        let mut cfg = config(AnimationMode::Rainbow);
        cfg.react_to_tt = false;
        let mut engine = RgbEngine::new(cfg, 1);
        engine.update_colors(ms(0), 0, true, &mut sink());
        let frame = engine.frame();
        // Two circles over eight LEDs: LED 2 is half a hue turn ahead.
        assert_ne!(frame[0], frame[2]);
    }

    #[test]
    fn test_comet_has_single_head() {
        let mut cfg = config(AnimationMode::Comet);
        cfg.react_to_tt = false;
        cfg.idle_speed = 0;
        cfg.primary = HsvColor::new(0, 0, 255);
        let mut engine = RgbEngine::new(cfg, 1);
        engine.update_colors(ms(0), 0, true, &mut sink());
        let lit = engine.frame().iter().filter(|&&c| c != BLACK).count();
        // Eight LEDs, tail of two: head plus one fading LED.
        assert_eq!(lit, 2);
        assert_eq!(engine.frame()[0], scale_rgb(hsv_to_rgb(cfg.primary), 255));
    }

    #[test]
    fn test_random_hue_changes_on_spin() {
        let mut cfg = config(AnimationMode::RandomHue);
        cfg.react_to_tt = true;
        let mut engine = RgbEngine::new(cfg, 7);
        let mut strip = sink();
        let mut hues = [0u8; 8];
        for (i, hue) in hues.iter_mut().enumerate() {
            let t = i as u32 * 40;
            engine.update_colors(ms(t), 1, true, &mut strip);
            engine.update_colors(ms(t + 20), 0, true, &mut strip);
            *hue = engine.random_hue;
        }
        assert!(hues.windows(2).any(|w| w[0] != w[1]));
    }
}
