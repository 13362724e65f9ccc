//! Multi-tap detector: repeated presses of one button select an effector
//! combination.

use crate::log;
use crate::time::Instant;
use controller_proto::Buttons;

/// How long taps are collected after the first one.
pub const DETECTION_WINDOW_MS: u32 = 500;

/// Minimum time the resulting combination is reported.
pub const ASSERT_HOLD_MS: u32 = 100;

/// Combination reported for a number of taps.
#[must_use]
pub const fn tap_combination(taps: u8) -> Buttons {
    match taps {
        0 => Buttons::NONE,
        1 => Buttons::E2,
        2 => Buttons::E3,
        3 => Buttons(Buttons::E2.0 | Buttons::E3.0),
        _ => Buttons::E4,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum TapState {
    Idle,
    Capturing { taps: u8, deadline: Instant },
    Asserting { combination: Buttons, deadline: Instant },
}

/// Capture-then-assert multi-tap state machine over a single logical button.
#[derive(Clone, Debug)]
pub struct MultiTap {
    watched: Buttons,
    window_ms: u32,
    hold_ms: u32,
    state: TapState,
    was_pressed: bool,
    /// A press that arrived while a combination was being asserted; it opens
    /// the next window once the assertion ends.
    queued: Option<Instant>,
    last_update: Option<Instant>,
}

impl MultiTap {
    /// Watch `watched` with the default window and hold times.
    #[must_use]
    pub fn new(watched: Buttons) -> Self {
        Self::with_timing(watched, DETECTION_WINDOW_MS, ASSERT_HOLD_MS)
    }

    #[must_use]
    pub fn with_timing(watched: Buttons, window_ms: u32, hold_ms: u32) -> Self {
        Self {
            watched,
            window_ms,
            hold_ms,
            state: TapState::Idle,
            was_pressed: false,
            queued: None,
            last_update: None,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == TapState::Idle
    }

    /// Feed the watched button and return the synthesized combination.
    ///
    /// Runs at most once per millisecond; repeated calls within the same
    /// millisecond return the previous result.
    pub fn update(&mut self, now: Instant, pressed: bool) -> Buttons {
        if self.last_update == Some(now) {
            return self.output();
        }
        self.last_update = Some(now);

        let rising = pressed && !self.was_pressed;
        self.was_pressed = pressed;

        self.state = match self.state {
            TapState::Idle if rising => TapState::Capturing {
                taps: 1,
                deadline: now.wrapping_add_ms(self.window_ms),
            },
            TapState::Idle => TapState::Idle,
            TapState::Capturing { taps, deadline } if now.is_after(deadline) => {
                if rising {
                    self.queued = Some(now);
                }
                let combination = tap_combination(taps);
                log::debug!("Multi-tap taps={:?}", taps);
                TapState::Asserting {
                    combination,
                    deadline: now.wrapping_add_ms(self.hold_ms),
                }
            }
            TapState::Capturing { taps, deadline } => TapState::Capturing {
                taps: if rising { taps.saturating_add(1) } else { taps },
                deadline,
            },
            TapState::Asserting {
                combination,
                deadline,
            } => {
                if rising && self.queued.is_none() {
                    self.queued = Some(now);
                }
                if !now.is_after(deadline) {
                    TapState::Asserting {
                        combination,
                        deadline,
                    }
                } else if pressed {
                    TapState::Asserting {
                        combination,
                        deadline: now.wrapping_add_ms(self.hold_ms),
                    }
                } else if let Some(first) = self.queued.take() {
                    TapState::Capturing {
                        taps: 1,
                        deadline: first.wrapping_add_ms(self.window_ms),
                    }
                } else {
                    TapState::Idle
                }
            }
        };

        self.output()
    }

    /// Replace the watched bit in `buttons` with the synthesized combination.
    pub fn apply(&mut self, now: Instant, buttons: Buttons) -> Buttons {
        let combination = self.update(now, buttons.contains(self.watched));
        (buttons & !self.watched) | combination
    }

    fn output(&self) -> Buttons {
        match self.state {
            TapState::Asserting { combination, .. } => combination,
            _ => Buttons::NONE,
        }
    }
}
