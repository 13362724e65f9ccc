//! 8-bit colour arithmetic. All operations saturate; hue wraps.

use controller_proto::{HsvColor, RgbColor};
use smart_leds::hsv::{hsv2rgb, Hsv};
use smart_leds::RGB8;

pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Scale `value` by `scale / 256`, with 255 leaving the value unchanged.
#[inline]
#[must_use]
pub fn scale8(value: u8, scale: u8) -> u8 {
    ((u16::from(value) * (1 + u16::from(scale))) >> 8) as u8
}

/// Saturating add.
#[inline]
#[must_use]
pub fn qadd8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Linear interpolation from `a` (frac 0) to `b` (frac 255).
#[inline]
#[must_use]
pub fn lerp8(a: u8, b: u8, frac: u8) -> u8 {
    let (a, b, frac) = (i32::from(a), i32::from(b), i32::from(frac));
    (a + (b - a) * frac / 255) as u8
}

/// Triangle wave over one 8-bit period: 0 → 254 → 0.
#[inline]
#[must_use]
pub fn triangle8(phase: u8) -> u8 {
    if phase < 128 {
        phase << 1
    } else {
        (255 - phase) << 1
    }
}

#[must_use]
pub fn scale_rgb(color: RGB8, scale: u8) -> RGB8 {
    RGB8 {
        r: scale8(color.r, scale),
        g: scale8(color.g, scale),
        b: scale8(color.b, scale),
    }
}

/// Channel-wise interpolation between two colours.
#[must_use]
pub fn blend(a: RGB8, b: RGB8, frac: u8) -> RGB8 {
    RGB8 {
        r: lerp8(a.r, b.r, frac),
        g: lerp8(a.g, b.g, frac),
        b: lerp8(a.b, b.b, frac),
    }
}

/// Channel-wise maximum.
#[must_use]
pub fn brightest(a: RGB8, b: RGB8) -> RGB8 {
    RGB8 {
        r: a.r.max(b.r),
        g: a.g.max(b.g),
        b: a.b.max(b.b),
    }
}

/// Dim by `darkness`: 0 leaves the colour alone, 255 turns it off.
#[must_use]
pub fn apply_darkness(color: RGB8, darkness: u8) -> RGB8 {
    let keep = 255 - u16::from(darkness);
    let dim = |c: u8| (u16::from(c) * keep / 255) as u8;
    RGB8 {
        r: dim(color.r),
        g: dim(color.g),
        b: dim(color.b),
    }
}

#[must_use]
pub fn hsv_to_rgb(color: HsvColor) -> RGB8 {
    hsv2rgb(Hsv {
        hue: color.hue,
        sat: color.sat,
        val: color.val,
    })
}

/// Same saturation and value, different hue.
#[must_use]
pub fn with_hue(color: HsvColor, hue: u8) -> HsvColor {
    HsvColor { hue, ..color }
}

#[must_use]
pub fn from_host(color: RgbColor) -> RGB8 {
    RGB8 {
        r: color.red,
        g: color.green,
        b: color.blue,
    }
}

/// Unpack `0xRRGGBB`.
#[must_use]
pub const fn from_code(code: u32) -> RGB8 {
    RGB8 {
        r: (code >> 16) as u8,
        g: (code >> 8) as u8,
        b: code as u8,
    }
}
