//! Millisecond clock helpers.
//!
//! The clock is a free-running `u32` that wraps roughly every 49.7 days.
//! Instants are only ever compared through a signed difference, so every
//! comparison stays correct across the wrap as long as the two instants are
//! less than half the range apart.

/// A point in time, in milliseconds since an arbitrary epoch.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant(u32);

impl Instant {
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// The instant `ms` milliseconds later, wrapping.
    #[inline]
    #[must_use]
    pub const fn wrapping_add_ms(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }

    /// Milliseconds elapsed since `earlier`.
    #[inline]
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// True if `self` is strictly later than `other`.
    #[inline]
    #[must_use]
    pub const fn is_after(self, other: Self) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }
}

/// A one-shot deadline.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    #[must_use]
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the timer to expire `ms` milliseconds after `now`.
    pub fn arm(&mut self, now: Instant, ms: u32) {
        self.deadline = Some(now.wrapping_add_ms(ms));
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Armed and strictly past its deadline.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now.is_after(deadline))
    }

    /// Like [`Timer::is_expired`], disarming the timer when it fires.
    pub fn check_expired_and_disarm(&mut self, now: Instant) -> bool {
        let expired = self.is_expired(now);
        if expired {
            self.deadline = None;
        }
        expired
    }
}
