// src/color.rs

//! Defines the fixed raster palette (`PixelColor`) and the RGBA conversion
//! used by display sinks.
//!
//! The emulated monitor is a green-phosphor composite display, so the
//! palette is four intensity levels of green indexed by a 2-bit value.
//! Index 0 is the screen background and index 3 is the bright cursor
//! level; the two middle levels allow multi-intensity rendering without
//! widening the pixel representation.

use serde::{Deserialize, Serialize};

/// A 2-bit palette index for one raster pixel.
///
/// The hardware XOR cursor is modelled as inverting the index
/// (`idx ^ 0b11`), which pairs `Background` with `Cursor` and `Dim` with
/// `Foreground`. Inversion is therefore an involution: applying the
/// cursor overlay twice restores the original pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PixelColor {
    /// Unlit phosphor.
    Background = 0,
    /// Low-intensity green.
    Dim = 1,
    /// Normal text intensity.
    Foreground = 2,
    /// Full-intensity green, produced under the cursor.
    Cursor = 3,
}

impl PixelColor {
    /// Converts a 2-bit index to a palette entry. Only the low two bits
    /// are significant; higher bits are masked off.
    pub fn from_index(idx: u8) -> Self {
        match idx & 0b11 {
            0 => PixelColor::Background,
            1 => PixelColor::Dim,
            2 => PixelColor::Foreground,
            _ => PixelColor::Cursor,
        }
    }

    /// The palette index of this entry.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// The XOR-cursor inversion of this entry.
    pub fn inverted(self) -> Self {
        PixelColor::from_index(self.index() ^ 0b11)
    }

    /// Boolean pixel selection: foreground when set, background when clear.
    pub fn from_bit(on: bool) -> Self {
        if on {
            PixelColor::Foreground
        } else {
            PixelColor::Background
        }
    }
}

impl Default for PixelColor {
    fn default() -> Self {
        PixelColor::Background
    }
}

/// RGBA color in 32-bit format (8 bits per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to an RGBA byte array for framebuffer blits.
    pub fn to_bytes(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Maps the four palette indices to concrete RGBA values.
///
/// The defaults are the green intensity ramp of the emulated monitor:
/// 0x00, 0x80, 0xC0 and 0xFF in the green channel. A display sink that
/// wants a different phosphor color can deserialize its own table from
/// the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub entries: [Rgba; 4],
}

impl Palette {
    /// Resolves a palette index to its RGBA value.
    pub fn resolve(&self, color: PixelColor) -> Rgba {
        self.entries[color.index() as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            entries: [
                Rgba::opaque(0x00, 0x00, 0x00), // background
                Rgba::opaque(0x00, 0x80, 0x00), // dim
                Rgba::opaque(0x00, 0xC0, 0x00), // foreground
                Rgba::opaque(0x00, 0xFF, 0x00), // cursor
            ],
        }
    }
}
