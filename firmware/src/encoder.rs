//! Quadrature turntable counter.
//!
//! Edges on the two encoder phases are decoded into steps and accumulated
//! into an atomic counter that wraps at the reload value programmed by the
//! sensitivity adapter.

use controller_core::CounterRange;
use portable_atomic::{AtomicU32, Ordering};

/// Phase state as `(a << 1) | b`.
#[must_use]
pub fn phase(a: bool, b: bool) -> u8 {
    (u8::from(a) << 1) | u8::from(b)
}

/// Step between two phase states: 1 forward, -1 backward, 0 for no change
/// or a skipped state.
#[must_use]
pub fn decode(previous: u8, current: u8) -> i8 {
    match (previous & 0b11, current & 0b11) {
        (0b00, 0b01) | (0b01, 0b11) | (0b11, 0b10) | (0b10, 0b00) => 1,
        (0b00, 0b10) | (0b10, 0b11) | (0b11, 0b01) | (0b01, 0b00) => -1,
        _ => 0,
    }
}

/// Wrapping counter shared between the encoder task and the main loop.
pub struct QuadratureCounter {
    count: AtomicU32,
    reload: AtomicU32,
}

impl QuadratureCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
            reload: AtomicU32::new(255),
        }
    }

    pub fn get(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Advance by one step in the direction of `step`'s sign.
    pub fn step(&self, step: i8) {
        if step == 0 {
            return;
        }
        let reload = self.reload.load(Ordering::Relaxed);
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                Some(match step {
                    s if s > 0 && count >= reload => 0,
                    s if s > 0 => count + 1,
                    _ if count == 0 || count > reload => reload,
                    _ => count - 1,
                })
            });
    }

    pub fn set_reload(&self, reload: u32) {
        self.reload.store(reload, Ordering::Relaxed);
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                Some(count % (reload + 1))
            });
    }
}

impl Default for QuadratureCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reload hook handed to the controller core.
pub struct ReloadHandle(pub &'static QuadratureCounter);

impl CounterRange for ReloadHandle {
    fn set_auto_reload(&mut self, reload: u32) {
        self.0.set_reload(reload);
    }
}
