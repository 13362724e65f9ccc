//! Versioned binary form of [`Config`].
//!
//! # Layout (version 1)
//!
//! ```text
//! offset  size  field
//!      0     1  version (= 1)
//!      1    12  label
//!     13     4  flags (u32 LE, see ConfigFlags bit constants)
//!     17     1  tt_sensitivity (i8)
//!     18     1  effector_mode
//!     19     1  debounce_ticks
//!     20     1  tt_deadzone
//!     21     2  tt_sustain_ms (u16 LE)
//!     23    13  keycodes
//!     36     9  primary, secondary, tertiary (hue, sat, val)
//!     45     1  darkness
//!     46     1  animation mode
//!     47     1  palette
//!     48     1  num_leds
//!     49     1  idle_speed
//!     50     1  tt_speed
//!     51     1  idle_brightness
//!     52     2  tt_fade_out_ms (u16 LE)
//!     54     1  num_circles
//!     55     1  rgb flags
//!     56     1  CRC-8/SMBUS of bytes 0..56
//! ```
//!
//! # Example
//!
//! ```
//! use controller_proto::{Config, CONFIG_SIZE};
//!
//! let config = Config::default();
//! let mut buf = [0u8; CONFIG_SIZE];
//! let len = config.serialize(&mut buf).unwrap();
//! assert_eq!(Config::deserialize(&buf[..len]), Ok(config));
//! ```

use crate::config::{
    AnimationMode, Config, ConfigFlags, EffectorMode, HsvColor, PaletteId, RgbConfig,
    KEYCODE_COUNT, LABEL_LEN,
};
use crate::crc::{calculate_crc8, Crc8Digest};

/// Current record version.
pub const CONFIG_VERSION: u8 = 1;

/// Size of a serialized version 1 record, checksum included.
pub const CONFIG_SIZE: usize = 57;

/// Error type for serialization operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializeError {
    /// The output buffer is too small to hold the record.
    BufferTooSmall,
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Error type for parsing a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Fewer bytes than a full record.
    TooShort,
    /// Unsupported record version (erased flash reads as 0xFF).
    BadVersion(u8),
    /// Checksum mismatch.
    Checksum,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort => write!(f, "record too short"),
            Self::BadVersion(v) => write!(f, "unsupported version {v}"),
            Self::Checksum => write!(f, "checksum mismatch"),
        }
    }
}

/// Writes fields in order while accumulating the checksum.
struct RecordWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    crc: Crc8Digest,
}

impl<'a> RecordWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            crc: Crc8Digest::new(),
        }
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.crc.update(bytes);
        self.pos += bytes.len();
    }

    fn u8(&mut self, value: u8) {
        self.bytes(&[value]);
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    fn hsv(&mut self, color: HsvColor) {
        self.bytes(&[color.hue, color.sat, color.val]);
    }

    fn finalize(self) -> usize {
        let checksum = self.crc.finalize();
        self.buf[self.pos] = checksum;
        self.pos + 1
    }
}

/// Reads fields in order from an already validated record.
struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn hsv(&mut self) -> HsvColor {
        let [hue, sat, val] = self.take();
        HsvColor { hue, sat, val }
    }
}

impl Config {
    /// Serialize into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if `buf` is shorter than [`CONFIG_SIZE`].
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        if buf.len() < CONFIG_SIZE {
            return Err(SerializeError::BufferTooSmall);
        }

        let mut w = RecordWriter::new(buf);
        w.u8(CONFIG_VERSION);
        w.bytes(&self.label);
        w.bytes(&self.flags.to_bits().to_le_bytes());
        w.u8(self.tt_sensitivity as u8);
        w.u8(self.effector_mode as u8);
        w.u8(self.debounce_ticks);
        w.u8(self.tt_deadzone);
        w.u16(self.tt_sustain_ms);
        w.bytes(&self.keycodes);

        let rgb = &self.rgb;
        w.hsv(rgb.primary);
        w.hsv(rgb.secondary);
        w.hsv(rgb.tertiary);
        w.u8(rgb.darkness);
        w.u8(rgb.mode as u8);
        w.u8(rgb.palette as u8);
        w.u8(rgb.num_leds);
        w.u8(rgb.idle_speed);
        w.u8(rgb.tt_speed);
        w.u8(rgb.idle_brightness);
        w.u16(rgb.tt_fade_out_ms);
        w.u8(rgb.num_circles);
        w.u8(rgb.flag_bits());

        Ok(w.finalize())
    }

    /// Serialize to a `heapless::Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if `N` is smaller than [`CONFIG_SIZE`].
    #[cfg(feature = "heapless")]
    pub fn serialize_to_vec<const N: usize>(&self) -> Result<heapless::Vec<u8, N>, SerializeError> {
        let mut vec = heapless::Vec::new();
        vec.resize(N, 0)
            .map_err(|_| SerializeError::BufferTooSmall)?;
        let len = self.serialize(&mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }

    /// Parse a persisted record. Trailing bytes after the record are ignored.
    ///
    /// The returned record is [sanitized](Config::sanitized).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the record is truncated, has an unknown
    /// version or fails its checksum.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ConfigError> {
        let version = *bytes.first().ok_or(ConfigError::TooShort)?;
        if version != CONFIG_VERSION {
            return Err(ConfigError::BadVersion(version));
        }
        if bytes.len() < CONFIG_SIZE {
            return Err(ConfigError::TooShort);
        }
        let payload = &bytes[..CONFIG_SIZE - 1];
        if calculate_crc8(payload) != bytes[CONFIG_SIZE - 1] {
            return Err(ConfigError::Checksum);
        }

        let mut r = RecordReader { buf: payload, pos: 1 };
        let label: [u8; LABEL_LEN] = r.take();
        let flags = ConfigFlags::from_bits(r.u32());
        let tt_sensitivity = r.u8() as i8;
        let effector_mode = EffectorMode::from_u8(r.u8());
        let debounce_ticks = r.u8();
        let tt_deadzone = r.u8();
        let tt_sustain_ms = r.u16();
        let keycodes: [u8; KEYCODE_COUNT] = r.take();

        let mut rgb = RgbConfig {
            primary: r.hsv(),
            secondary: r.hsv(),
            tertiary: r.hsv(),
            darkness: r.u8(),
            mode: AnimationMode::from_u8(r.u8()),
            palette: PaletteId::from_u8(r.u8()),
            num_leds: r.u8(),
            idle_speed: r.u8(),
            tt_speed: r.u8(),
            idle_brightness: r.u8(),
            tt_fade_out_ms: r.u16(),
            num_circles: r.u8(),
            ..RgbConfig::default()
        };
        rgb.set_flag_bits(r.u8());

        Ok(Self {
            label,
            flags,
            tt_sensitivity,
            effector_mode,
            debounce_ticks,
            tt_deadzone,
            tt_sustain_ms,
            keycodes,
            rgb,
        }
        .sanitized())
    }
}
