//! Per-bit temporal majority filter over a sliding window of raw samples.

use crate::time::Instant;

/// Deepest supported history.
pub const MAX_WINDOW: usize = 10;

/// Sliding-window debouncer for up to 16 independent bits.
///
/// A bit changes its stable value only once every sample in the window
/// agrees on it. Bits that disagree anywhere in the window keep their
/// previous stable value.
///
/// ```
/// use controller_core::{Debouncer, Instant};
///
/// let mut debouncer = Debouncer::new(2);
/// assert_eq!(debouncer.update(Instant::from_millis(1), 0b1), 0);
/// assert_eq!(debouncer.update(Instant::from_millis(2), 0b1), 0b1);
/// ```
#[derive(Clone, Debug)]
pub struct Debouncer {
    history: [u16; MAX_WINDOW],
    window: usize,
    index: usize,
    stable: u16,
    last_sample: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with `window` samples of history, clamped to 1..=10.
    #[must_use]
    pub fn new(window: u8) -> Self {
        Self {
            history: [0; MAX_WINDOW],
            window: usize::from(window).clamp(1, MAX_WINDOW),
            index: 0,
            stable: 0,
            last_sample: None,
        }
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Last accepted value.
    #[must_use]
    pub fn stable(&self) -> u16 {
        self.stable
    }

    /// Feed one raw sample and return the stable value.
    ///
    /// Repeated calls within the same millisecond return the previous result
    /// without touching the history.
    pub fn update(&mut self, now: Instant, raw: u16) -> u16 {
        if self.last_sample == Some(now) {
            return self.stable;
        }
        self.last_sample = Some(now);

        self.history[self.index] = raw;
        self.index = (self.index + 1) % self.window;

        let (ones, zeros) = self.history[..self.window]
            .iter()
            .fold((0u16, 0u16), |(ones, zeros), &sample| {
                (ones | sample, zeros | !sample)
            });
        let unanimous = ones ^ zeros;

        self.stable = (self.stable & !unanimous) | (ones & unanimous);
        self.stable
    }

    /// Debounce only the bits in `mask`; the others pass straight through.
    pub fn update_masked(&mut self, now: Instant, value: u16, mask: u16) -> u16 {
        (value & !mask) | (self.update(now, value & mask) & mask)
    }
}
