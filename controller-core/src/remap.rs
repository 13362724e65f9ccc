//! Physical pins to logical buttons.

use controller_proto::{Buttons, EffectorMode, Pins};

/// Effectors driven by Start and Select for each [`EffectorMode`].
#[must_use]
pub const fn start_select_effectors(mode: EffectorMode) -> (Buttons, Buttons) {
    match mode {
        EffectorMode::StartE1SelectE2 => (Buttons::E1, Buttons::E2),
        EffectorMode::StartE2SelectE1 => (Buttons::E2, Buttons::E1),
        EffectorMode::StartE3SelectE4 => (Buttons::E3, Buttons::E4),
        EffectorMode::StartE4SelectE3 => (Buttons::E4, Buttons::E3),
    }
}

/// Map physical pins to logical buttons.
///
/// The seven keys keep their bit positions. Start and Select go to the
/// effector pair chosen by `mode`; buttons 8 and 9 go to E3 and E4, or E4
/// and E3 when `swap_8_9` is set.
///
/// ```
/// use controller_core::remap;
/// use controller_proto::{Buttons, EffectorMode, Pins};
///
/// let out = remap(Pins::B2 | Pins::START, EffectorMode::StartE2SelectE1, false);
/// assert_eq!(out, Buttons::B2 | Buttons::E2);
/// ```
#[must_use]
pub fn remap(pins: Pins, mode: EffectorMode, swap_8_9: bool) -> Buttons {
    let mut out = Buttons(pins.raw() & Pins::KEYS.raw());

    let (start, select) = start_select_effectors(mode);
    out.set(start, pins.contains(Pins::START));
    out.set(select, pins.contains(Pins::SELECT));

    let (b8, b9) = if swap_8_9 {
        (Buttons::E4, Buttons::E3)
    } else {
        (Buttons::E3, Buttons::E4)
    };
    if pins.contains(Pins::B8) {
        out |= b8;
    }
    if pins.contains(Pins::B9) {
        out |= b9;
    }
    out
}
