//! Built-in colour palettes.
//!
//! Sixteen-entry palettes are sampled with linear blending between
//! neighbouring entries, wrapping from the last entry back to the first.
//! Gradient palettes interpolate between anchor points.

use super::color::{blend, from_code};
use controller_proto::PaletteId;
use smart_leds::RGB8;

const RED: u32 = 0xFF0000;
const DIM_GRAY: u32 = 0x696969;
const GREEN: u32 = 0x008000;
const GRAY: u32 = 0x808080;
const YELLOW: u32 = 0xFFFF00;
const BLUE: u32 = 0x0000FF;

const RAINBOW_REVERSE: [u32; 16] = [
    0xD5002B, 0xAB0055, 0x7F0081, 0x5500AB, 0x2A00D5, 0x0000FF, 0x0056AA, 0x00AB55, 0x00D52A,
    0x00FF00, 0x56D500, 0xABAB00, 0xAB7F00, 0xAB5500, 0xD52A00, 0xFF0000,
];

const CANNON_BALLERS: [u32; 16] = [
    RED, RED, RED, RED, RED, RED, DIM_GRAY, DIM_GRAY, GREEN, GREEN, GREEN, GREEN, GREEN, GREEN,
    DIM_GRAY, DIM_GRAY,
];

const TRICORO: [u32; 16] = [
    RED, RED, RED, RED, RED, GRAY, YELLOW, YELLOW, YELLOW, YELLOW, GRAY, BLUE, BLUE, BLUE, BLUE,
    GRAY,
];

const BISTROVER: [u32; 16] = [
    BLUE, BLUE, BLUE, YELLOW, YELLOW, YELLOW, BLUE, BLUE, BLUE, BLUE, YELLOW, YELLOW, YELLOW, GREEN,
    GREEN, BLUE,
];

/// `(position, colour)` anchors, positions ascending from 0 to 255.
const HEROIC_VERSE: [(u8, u32); 4] = [
    (0, 0x800080),
    (43, 0x4F2B9A),
    (186, 0xDA07DA),
    (255, 0x800080),
];

/// Colour at `index` (0..=255 covers the whole palette once).
#[must_use]
pub fn palette_color(palette: PaletteId, index: u8) -> RGB8 {
    match palette {
        PaletteId::RainbowReverse => sample16(&RAINBOW_REVERSE, index),
        PaletteId::CannonBallers => sample16(&CANNON_BALLERS, index),
        PaletteId::Tricoro => sample16(&TRICORO, index),
        PaletteId::Bistrover => sample16(&BISTROVER, index),
        PaletteId::HeroicVerse => sample_gradient(&HEROIC_VERSE, index),
    }
}

fn sample16(entries: &[u32; 16], index: u8) -> RGB8 {
    let entry = usize::from(index >> 4);
    let frac = (index & 0x0F) << 4;
    let current = from_code(entries[entry]);
    if frac == 0 {
        return current;
    }
    let next = from_code(entries[(entry + 1) % entries.len()]);
    blend(current, next, frac)
}

fn sample_gradient(anchors: &[(u8, u32)], index: u8) -> RGB8 {
    for pair in anchors.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if index <= end {
            let span = u16::from(end - start).max(1);
            let frac = (u16::from(index - start) * 255 / span) as u8;
            return blend(from_code(from), from_code(to), frac);
        }
    }
    anchors
        .last()
        .map_or(RGB8::default(), |&(_, code)| from_code(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_sampled_exactly() {
        assert_eq!(
            palette_color(PaletteId::RainbowReverse, 0),
            from_code(0xD5002B)
        );
        assert_eq!(
            palette_color(PaletteId::RainbowReverse, 0xF0),
            from_code(0xFF0000)
        );
        assert_eq!(palette_color(PaletteId::Tricoro, 0x50), from_code(GRAY));
    }

    #[test]
    fn test_blend_between_entries() {
        // Halfway from red (entry 5) to dim gray (entry 6).
        let c = palette_color(PaletteId::CannonBallers, 0x58);
        assert!(c.r < 0xFF && c.r > 0x69);
        assert!(c.g > 0 && c.g < 0x69);
    }

    #[test]
    fn test_last_entry_wraps_to_first() {
        let c = palette_color(PaletteId::Bistrover, 0xF8);
        // Blue blended towards blue stays blue.
        assert_eq!(c, from_code(BLUE));
    }

    #[test]
    fn test_gradient_anchors() {
        assert_eq!(palette_color(PaletteId::HeroicVerse, 0), from_code(0x800080));
        assert_eq!(palette_color(PaletteId::HeroicVerse, 43), from_code(0x4F2B9A));
        assert_eq!(palette_color(PaletteId::HeroicVerse, 186), from_code(0xDA07DA));
        assert_eq!(palette_color(PaletteId::HeroicVerse, 255), from_code(0x800080));
    }
}
