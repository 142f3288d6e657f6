// src/font.rs

//! Glyph ROM loading and decoding.
//!
//! The character generator is a flat 2048-byte ROM: 256 glyph codes, 8
//! scanlines per glyph, one byte per scanline with the MSB as the leftmost
//! pixel. `GlyphRom` decodes that once at startup into per-row pixel masks;
//! everything downstream reads it immutably through an `Arc`.
//!
//! A malformed ROM (missing file, wrong length) is fatal at load time. The
//! per-row lookup itself never fails: callers clamp the row index against
//! `GLYPH_HEIGHT` before querying.

use anyhow::{ensure, Context, Result};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

/// Pixels per glyph scanline.
pub const GLYPH_WIDTH: usize = 8;
/// Scanlines per glyph.
pub const GLYPH_HEIGHT: usize = 8;
/// Number of glyph codes in the ROM.
pub const GLYPH_COUNT: usize = 256;
/// Expected ROM image size in bytes: one byte per glyph scanline.
pub const ROM_SIZE: usize = GLYPH_COUNT * GLYPH_HEIGHT;

/// An immutable, pre-decoded character generator ROM.
#[derive(Debug)]
pub struct GlyphRom {
    /// `GLYPH_COUNT * GLYPH_HEIGHT` rows of `GLYPH_WIDTH` pixels each,
    /// indexed by `code * GLYPH_HEIGHT + row`.
    rows: Vec<[bool; GLYPH_WIDTH]>,
}

impl GlyphRom {
    /// Decodes a raw ROM image. The image must be exactly [`ROM_SIZE`]
    /// bytes; anything else indicates a truncated or corrupt resource.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        ensure!(
            raw.len() == ROM_SIZE,
            "glyph ROM must be exactly {} bytes, got {}",
            ROM_SIZE,
            raw.len()
        );

        let mut rows = Vec::with_capacity(ROM_SIZE);
        for &byte in raw {
            let mut row = [false; GLYPH_WIDTH];
            for (px, slot) in row.iter_mut().enumerate() {
                // MSB-first: bit 7 is the leftmost pixel.
                *slot = byte & (0x80 >> px) != 0;
            }
            rows.push(row);
        }
        Ok(GlyphRom { rows })
    }

    /// Loads and decodes a ROM image from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read glyph ROM {}", path.display()))?;
        Self::from_bytes(&raw)
            .with_context(|| format!("failed to decode glyph ROM {}", path.display()))
    }

    /// The builtin ROM: printable ASCII (0x20-0x7E), all other codes blank.
    pub fn builtin() -> Arc<GlyphRom> {
        BUILTIN_ROM.clone()
    }

    /// Returns the pixel mask for one scanline of one glyph.
    ///
    /// # Panics
    /// Panics if `row >= GLYPH_HEIGHT`; the caller is responsible for
    /// clamping when scanlines-per-row exceeds the glyph height.
    pub fn glyph_row(&self, code: u8, row: usize) -> &[bool; GLYPH_WIDTH] {
        assert!(row < GLYPH_HEIGHT, "glyph row {} out of range", row);
        &self.rows[code as usize * GLYPH_HEIGHT + row]
    }
}

static BUILTIN_ROM: Lazy<Arc<GlyphRom>> = Lazy::new(|| {
    let mut raw = vec![0u8; ROM_SIZE];
    raw[0x20 * GLYPH_HEIGHT..0x7F * GLYPH_HEIGHT].copy_from_slice(&PRINTABLE_ASCII);
    Arc::new(GlyphRom::from_bytes(&raw).expect("builtin glyph ROM is well formed"))
});

/// 8x8 glyphs for ASCII 0x20-0x7E, one byte per row, MSB leftmost.
#[rustfmt::skip]
static PRINTABLE_ASCII: [u8; 95 * GLYPH_HEIGHT] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x20 'Space'
    0x18, 0x18, 0x18, 0x18, 0x18, 0x00, 0x18, 0x00, // 0x21 '!'
    0x6C, 0x6C, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x22 '"'
    0x6C, 0x6C, 0xFE, 0x6C, 0xFE, 0x6C, 0x6C, 0x00, // 0x23 '#'
    0x18, 0x7E, 0xC0, 0x7C, 0x06, 0xFC, 0x18, 0x00, // 0x24 '$'
    0x00, 0xC6, 0xCC, 0x18, 0x30, 0x66, 0xC6, 0x00, // 0x25 '%'
    0x38, 0x6C, 0x38, 0x76, 0xDC, 0xCC, 0x76, 0x00, // 0x26 '&'
    0x18, 0x18, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x27 "'"
    0x0C, 0x18, 0x30, 0x30, 0x30, 0x18, 0x0C, 0x00, // 0x28 '('
    0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x18, 0x30, 0x00, // 0x29 ')'
    0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00, // 0x2a '*'
    0x00, 0x18, 0x18, 0x7E, 0x18, 0x18, 0x00, 0x00, // 0x2b '+'
    0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x30, // 0x2c ','
    0x00, 0x00, 0x00, 0x7E, 0x00, 0x00, 0x00, 0x00, // 0x2d '-'
    0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00, // 0x2e '.'
    0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0x80, 0x00, // 0x2f '/'
    0x7C, 0xCE, 0xDE, 0xF6, 0xE6, 0xC6, 0x7C, 0x00, // 0x30 '0'
    0x18, 0x38, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00, // 0x31 '1'
    0x7C, 0xC6, 0x06, 0x7C, 0xC0, 0xC0, 0xFE, 0x00, // 0x32 '2'
    0xFC, 0x06, 0x06, 0x3C, 0x06, 0x06, 0xFC, 0x00, // 0x33 '3'
    0x0C, 0xCC, 0xCC, 0xCC, 0xFE, 0x0C, 0x0C, 0x00, // 0x34 '4'
    0xFE, 0xC0, 0xFC, 0x06, 0x06, 0xC6, 0x7C, 0x00, // 0x35 '5'
    0x7C, 0xC0, 0xC0, 0xFC, 0xC6, 0xC6, 0x7C, 0x00, // 0x36 '6'
    0xFE, 0x06, 0x06, 0x0C, 0x18, 0x18, 0x18, 0x00, // 0x37 '7'
    0x7C, 0xC6, 0xC6, 0x7C, 0xC6, 0xC6, 0x7C, 0x00, // 0x38 '8'
    0x7C, 0xC6, 0xC6, 0x7E, 0x06, 0x06, 0x7C, 0x00, // 0x39 '9'
    0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x00, // 0x3a ':'
    0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x30, // 0x3b ';'
    0x0C, 0x18, 0x30, 0x60, 0x30, 0x18, 0x0C, 0x00, // 0x3c '<'
    0x00, 0x00, 0x7E, 0x00, 0x7E, 0x00, 0x00, 0x00, // 0x3d '='
    0x30, 0x18, 0x0C, 0x06, 0x0C, 0x18, 0x30, 0x00, // 0x3e '>'
    0x3C, 0x66, 0x0C, 0x18, 0x18, 0x00, 0x18, 0x00, // 0x3f '?'
    0x7C, 0xC6, 0xDE, 0xDE, 0xDE, 0xC0, 0x7E, 0x00, // 0x40 '@'
    0x38, 0x6C, 0xC6, 0xC6, 0xFE, 0xC6, 0xC6, 0x00, // 0x41 'A'
    0xFC, 0xC6, 0xC6, 0xFC, 0xC6, 0xC6, 0xFC, 0x00, // 0x42 'B'
    0x7C, 0xC6, 0xC0, 0xC0, 0xC0, 0xC6, 0x7C, 0x00, // 0x43 'C'
    0xF8, 0xCC, 0xC6, 0xC6, 0xC6, 0xCC, 0xF8, 0x00, // 0x44 'D'
    0xFE, 0xC0, 0xC0, 0xF8, 0xC0, 0xC0, 0xFE, 0x00, // 0x45 'E'
    0xFE, 0xC0, 0xC0, 0xF8, 0xC0, 0xC0, 0xC0, 0x00, // 0x46 'F'
    0x7C, 0xC6, 0xC0, 0xCE, 0xC6, 0xC6, 0x7C, 0x00, // 0x47 'G'
    0xC6, 0xC6, 0xC6, 0xFE, 0xC6, 0xC6, 0xC6, 0x00, // 0x48 'H'
    0x7E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00, // 0x49 'I'
    0x06, 0x06, 0x06, 0x06, 0xC6, 0xC6, 0x7C, 0x00, // 0x4a 'J'
    0xC6, 0xCC, 0xD8, 0xF0, 0xD8, 0xCC, 0xC6, 0x00, // 0x4b 'K'
    0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xFE, 0x00, // 0x4c 'L'
    0xC6, 0xEE, 0xFE, 0xD6, 0xC6, 0xC6, 0xC6, 0x00, // 0x4d 'M'
    0xC6, 0xE6, 0xF6, 0xDE, 0xCE, 0xC6, 0xC6, 0x00, // 0x4e 'N'
    0x7C, 0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x7C, 0x00, // 0x4f 'O'
    0xFC, 0xC6, 0xC6, 0xFC, 0xC0, 0xC0, 0xC0, 0x00, // 0x50 'P'
    0x7C, 0xC6, 0xC6, 0xC6, 0xD6, 0xDE, 0x7C, 0x06, // 0x51 'Q'
    0xFC, 0xC6, 0xC6, 0xFC, 0xD8, 0xCC, 0xC6, 0x00, // 0x52 'R'
    0x7C, 0xC6, 0xC0, 0x7C, 0x06, 0xC6, 0x7C, 0x00, // 0x53 'S'
    0x7E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x00, // 0x54 'T'
    0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x7C, 0x00, // 0x55 'U'
    0xC6, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x10, 0x00, // 0x56 'V'
    0xC6, 0xC6, 0xC6, 0xD6, 0xFE, 0xEE, 0xC6, 0x00, // 0x57 'W'
    0xC6, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0xC6, 0x00, // 0x58 'X'
    0x66, 0x66, 0x66, 0x3C, 0x18, 0x18, 0x18, 0x00, // 0x59 'Y'
    0xFE, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFE, 0x00, // 0x5a 'Z'
    0x3C, 0x30, 0x30, 0x30, 0x30, 0x30, 0x3C, 0x00, // 0x5b '['
    0xC0, 0x60, 0x30, 0x18, 0x0C, 0x06, 0x02, 0x00, // 0x5c '\\'
    0x3C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x3C, 0x00, // 0x5d ']'
    0x10, 0x38, 0x6C, 0xC6, 0x00, 0x00, 0x00, 0x00, // 0x5e '^'
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFE, // 0x5f '_'
    0x18, 0x18, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x60 '`'
    0x00, 0x00, 0x7C, 0x06, 0x7E, 0xC6, 0x7E, 0x00, // 0x61 'a'
    0xC0, 0xC0, 0xFC, 0xC6, 0xC6, 0xC6, 0xFC, 0x00, // 0x62 'b'
    0x00, 0x00, 0x7C, 0xC6, 0xC0, 0xC6, 0x7C, 0x00, // 0x63 'c'
    0x06, 0x06, 0x7E, 0xC6, 0xC6, 0xC6, 0x7E, 0x00, // 0x64 'd'
    0x00, 0x00, 0x7C, 0xC6, 0xFE, 0xC0, 0x7C, 0x00, // 0x65 'e'
    0x1C, 0x30, 0x30, 0x7C, 0x30, 0x30, 0x30, 0x00, // 0x66 'f'
    0x00, 0x00, 0x7E, 0xC6, 0xC6, 0x7E, 0x06, 0x7C, // 0x67 'g'
    0xC0, 0xC0, 0xFC, 0xC6, 0xC6, 0xC6, 0xC6, 0x00, // 0x68 'h'
    0x18, 0x00, 0x38, 0x18, 0x18, 0x18, 0x3C, 0x00, // 0x69 'i'
    0x18, 0x00, 0x38, 0x18, 0x18, 0x18, 0x18, 0x70, // 0x6a 'j'
    0xC0, 0xC0, 0xC6, 0xCC, 0xF8, 0xCC, 0xC6, 0x00, // 0x6b 'k'
    0x38, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, 0x00, // 0x6c 'l'
    0x00, 0x00, 0xEC, 0xFE, 0xD6, 0xC6, 0xC6, 0x00, // 0x6d 'm'
    0x00, 0x00, 0xFC, 0xC6, 0xC6, 0xC6, 0xC6, 0x00, // 0x6e 'n'
    0x00, 0x00, 0x7C, 0xC6, 0xC6, 0xC6, 0x7C, 0x00, // 0x6f 'o'
    0x00, 0x00, 0xFC, 0xC6, 0xC6, 0xFC, 0xC0, 0xC0, // 0x70 'p'
    0x00, 0x00, 0x7E, 0xC6, 0xC6, 0x7E, 0x06, 0x06, // 0x71 'q'
    0x00, 0x00, 0xDC, 0xE6, 0xC0, 0xC0, 0xC0, 0x00, // 0x72 'r'
    0x00, 0x00, 0x7E, 0xC0, 0x7C, 0x06, 0xFC, 0x00, // 0x73 's'
    0x30, 0x30, 0x7C, 0x30, 0x30, 0x30, 0x1C, 0x00, // 0x74 't'
    0x00, 0x00, 0xC6, 0xC6, 0xC6, 0xC6, 0x7E, 0x00, // 0x75 'u'
    0x00, 0x00, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00, // 0x76 'v'
    0x00, 0x00, 0xC6, 0xC6, 0xD6, 0xFE, 0x6C, 0x00, // 0x77 'w'
    0x00, 0x00, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0x00, // 0x78 'x'
    0x00, 0x00, 0xC6, 0xC6, 0xC6, 0x7E, 0x06, 0x7C, // 0x79 'y'
    0x00, 0x00, 0xFE, 0x0C, 0x38, 0x60, 0xFE, 0x00, // 0x7a 'z'
    0x0E, 0x18, 0x18, 0x70, 0x18, 0x18, 0x0E, 0x00, // 0x7b '{'
    0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x00, // 0x7c '|'
    0x70, 0x18, 0x18, 0x0E, 0x18, 0x18, 0x70, 0x00, // 0x7d '}'
    0x72, 0x9C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x7e '~'
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_msb_first() {
        let mut raw = vec![0u8; ROM_SIZE];
        // Code 0x41, top row: 11110000.
        raw[0x41 * GLYPH_HEIGHT] = 0xF0;
        let rom = GlyphRom::from_bytes(&raw).unwrap();

        let row = rom.glyph_row(0x41, 0);
        assert_eq!(
            row,
            &[true, true, true, true, false, false, false, false]
        );
        // Every other row of that glyph stays clear.
        for r in 1..GLYPH_HEIGHT {
            assert_eq!(rom.glyph_row(0x41, r), &[false; GLYPH_WIDTH]);
        }
    }

    #[test]
    fn rejects_short_rom() {
        let err = GlyphRom::from_bytes(&[0u8; ROM_SIZE - 1]).unwrap_err();
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn rejects_oversized_rom() {
        assert!(GlyphRom::from_bytes(&vec![0u8; ROM_SIZE + 8]).is_err());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(GlyphRom::load(Path::new("/nonexistent/ascii.rom")).is_err());
    }

    #[test]
    #[should_panic(expected = "glyph row")]
    fn out_of_range_row_panics() {
        let rom = GlyphRom::from_bytes(&[0u8; ROM_SIZE]).unwrap();
        rom.glyph_row(0, GLYPH_HEIGHT);
    }

    #[test]
    fn builtin_rom_has_printable_ascii() {
        let rom = GlyphRom::builtin();
        // 'A' has pixels somewhere; control codes are blank.
        let lit = (0..GLYPH_HEIGHT).any(|r| rom.glyph_row(b'A', r).iter().any(|&p| p));
        assert!(lit, "'A' should have lit pixels in the builtin ROM");
        for r in 0..GLYPH_HEIGHT {
            assert_eq!(rom.glyph_row(0x00, r), &[false; GLYPH_WIDTH]);
        }
    }
}
