// SPDX-License-Identifier: MIT
//
// Cell colors: packed RGB with a terminal-default sentinel.
//
// The engine never does color math. A color is either a 24-bit RGB triple
// that goes out as a TrueColor SGR sequence, an index into the terminal's
// 256-color palette, or "whatever the terminal's default is". Themes and
// widgets hand us resolved values; the diff renderer compares them as plain
// integers.
//
// Packing: `0xRRGGBB` in the low 24 bits of a `u32`, which is the format
// theme files and hex literals use.

use std::fmt;
use std::str::FromStr;

// ─── CellColor ───────────────────────────────────────────────────────────────

/// Compact color for terminal cell storage.
///
/// Four bytes, `Copy`, compared by value in the diff renderer's hot loop.
///
/// ```
/// use tessel_term::color::CellColor;
///
/// let teal = CellColor::from_packed(0x00_80_80);
/// assert_eq!(teal, CellColor::Rgb(0, 128, 128));
/// assert_eq!(teal.packed(), Some(0x00_80_80));
/// assert_eq!("#008080".parse::<CellColor>().unwrap(), teal);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellColor {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// ANSI 256-color palette index.
    Ansi256(u8),

    /// Terminal default color (inherits from the user's terminal settings).
    #[default]
    Default,
}

impl CellColor {
    /// Unpack a `0xRRGGBB` value. Bits above the low 24 are ignored.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Masked to one byte each.
    pub const fn from_packed(rgb: u32) -> Self {
        Self::Rgb(
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        )
    }

    /// Pack an RGB color as `0xRRGGBB`.
    ///
    /// Returns `None` for palette and default colors, which have no
    /// fixed RGB value.
    #[inline]
    #[must_use]
    pub const fn packed(self) -> Option<u32> {
        match self {
            Self::Rgb(r, g, b) => Some(((r as u32) << 16) | ((g as u32) << 8) | b as u32),
            Self::Ansi256(_) | Self::Default => None,
        }
    }

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<u32> for CellColor {
    fn from(rgb: u32) -> Self {
        Self::from_packed(rgb)
    }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Error returned when a color string is not `#rrggbb`, `#rgb`, or `default`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {input:?}: expected \"#rrggbb\", \"#rgb\" or \"default\"")]
pub struct ParseColorError {
    input: String,
}

impl FromStr for CellColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }

        let err = || ParseColorError {
            input: s.to_owned(),
        };
        let hex = trimmed.strip_prefix('#').ok_or_else(err)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }

        match hex.len() {
            6 => u32::from_str_radix(hex, 16)
                .map(Self::from_packed)
                .map_err(|_| err()),
            3 => {
                // #rgb expands each nibble: #f80 → #ff8800.
                let value = u32::from_str_radix(hex, 16).map_err(|_| err())?;
                let r = (value >> 8) & 0xF;
                let g = (value >> 4) & 0xF;
                let b = value & 0xF;
                Ok(Self::from_packed((r * 0x11) << 16 | (g * 0x11) << 8 | b * 0x11))
            }
            _ => Err(err()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
