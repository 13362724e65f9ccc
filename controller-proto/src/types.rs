//! Button bit-sets: physical [`Pins`] as wired on the board and logical
//! [`Buttons`] as reported to the host.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

macro_rules! impl_bit_ops {
    ($ty:ident) => {
        impl $ty {
            /// Nothing pressed.
            pub const NONE: Self = Self(0);

            /// Check if all of the given bit(s) are set.
            #[inline]
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Check if any of the given bit(s) are set.
            #[inline]
            #[must_use]
            pub const fn intersects(self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            /// Set or clear bit(s).
            #[inline]
            pub fn set(&mut self, other: Self, pressed: bool) {
                if pressed {
                    self.0 |= other.0;
                } else {
                    self.0 &= !other.0;
                }
            }

            /// Get the raw u16 value.
            #[inline]
            #[must_use]
            pub const fn raw(self) -> u16 {
                self.0
            }

            #[inline]
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $ty {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: Self) -> Self::Output {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $ty {
            #[inline]
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $ty {
            type Output = Self;

            #[inline]
            fn bitand(self, rhs: Self) -> Self::Output {
                Self(self.0 & rhs.0)
            }
        }

        impl BitAndAssign for $ty {
            #[inline]
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl Not for $ty {
            type Output = Self;

            #[inline]
            fn not(self) -> Self::Output {
                Self(!self.0)
            }
        }
    };
}

/// Physical button inputs, active-high, one bit per switch on the board.
///
/// Bits 0..=6 are the seven keys, then buttons 8 and 9, Start and Select.
///
/// ```
/// use controller_proto::Pins;
///
/// let chord = Pins::START | Pins::SELECT | Pins::B1;
/// assert!(chord.contains(Pins::START | Pins::SELECT));
/// assert!(!chord.contains(Pins::B3));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pins(pub u16);

impl Pins {
    pub const B1: Self = Self(1 << 0);
    pub const B2: Self = Self(1 << 1);
    pub const B3: Self = Self(1 << 2);
    pub const B4: Self = Self(1 << 3);
    pub const B5: Self = Self(1 << 4);
    pub const B6: Self = Self(1 << 5);
    pub const B7: Self = Self(1 << 6);
    pub const B8: Self = Self(1 << 7);
    pub const B9: Self = Self(1 << 8);
    pub const START: Self = Self(1 << 9);
    pub const SELECT: Self = Self(1 << 10);

    /// The seven playing keys.
    pub const KEYS: Self = Self(0x7F);
    /// The four keys with white caps (1, 3, 5, 7).
    pub const WHITE_KEYS: Self = Self(0x55);
    /// The three keys with black caps (2, 4, 6).
    pub const BLACK_KEYS: Self = Self(0x2A);
    /// Every physical button.
    pub const ALL: Self = Self(0x7FF);
}

/// Logical buttons as reported to the host.
///
/// Keys keep their physical position, effectors E1..E4 occupy bits 8..=11,
/// and the digital turntable occupies bits 12 (direction -1) and 13 (+1).
///
/// ```
/// use controller_proto::Buttons;
///
/// let buttons = Buttons::B1 | Buttons::E2;
/// assert!(buttons.contains(Buttons::E2));
/// assert_eq!(buttons.raw(), 0x0201);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const B1: Self = Self(1 << 0);
    pub const B2: Self = Self(1 << 1);
    pub const B3: Self = Self(1 << 2);
    pub const B4: Self = Self(1 << 3);
    pub const B5: Self = Self(1 << 4);
    pub const B6: Self = Self(1 << 5);
    pub const B7: Self = Self(1 << 6);
    pub const E1: Self = Self(1 << 8);
    pub const E2: Self = Self(1 << 9);
    pub const E3: Self = Self(1 << 10);
    pub const E4: Self = Self(1 << 11);
    /// Digital turntable, direction -1.
    pub const TT_DOWN: Self = Self(1 << 12);
    /// Digital turntable, direction +1.
    pub const TT_UP: Self = Self(1 << 13);

    pub const KEYS: Self = Self(0x7F);
    pub const EFFECTORS: Self = Self(0x0F00);

    /// Logical keys in keycode-table order: B1..B7 then E1..E4.
    pub const KEYCODE_ORDER: [Self; 11] = [
        Self::B1,
        Self::B2,
        Self::B3,
        Self::B4,
        Self::B5,
        Self::B6,
        Self::B7,
        Self::E1,
        Self::E2,
        Self::E3,
        Self::E4,
    ];
}

impl_bit_ops!(Pins);
impl_bit_ops!(Buttons);

impl From<Pins> for u16 {
    fn from(pins: Pins) -> Self {
        pins.0
    }
}

impl From<Buttons> for u16 {
    fn from(buttons: Buttons) -> Self {
        buttons.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pins_bitwise_or() {
        let pins = Pins::B1 | Pins::B3;
        assert!(pins.contains(Pins::B1));
        assert!(pins.contains(Pins::B3));
        assert!(!pins.contains(Pins::B2));
        assert!(pins.intersects(Pins::B3 | Pins::B4));
    }

    #[test]
    fn test_buttons_set_clear() {
        let mut buttons = Buttons::NONE;
        buttons.set(Buttons::E3, true);
        assert!(buttons.contains(Buttons::E3));
        buttons.set(Buttons::E3, false);
        assert!(buttons.is_empty());
    }

    #[test]
    fn test_key_colours_partition_keys() {
        assert_eq!(Pins::WHITE_KEYS | Pins::BLACK_KEYS, Pins::KEYS);
        assert!((Pins::WHITE_KEYS & Pins::BLACK_KEYS).is_empty());
    }

    #[test]
    fn test_keycode_order_covers_keys_and_effectors() {
        let all = Buttons::KEYCODE_ORDER
            .iter()
            .fold(Buttons::NONE, |acc, &b| acc | b);
        assert_eq!(all, Buttons::KEYS | Buttons::EFFECTORS);
    }
}
