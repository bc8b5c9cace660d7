// SPDX-License-Identifier: MIT
//
// Theme: a handful of named color slots the built-in widgets paint with.
//
// Colors are written as "#rrggbb", "#rgb" or "default" in TOML and stored
// packed in `CellColor`. Name lookup and palettes are left to applications.

use serde::{Deserialize, Deserializer};
use tessel_term::{CellColor, Style};

/// Color slots shared by every widget in one kernel.
///
/// ```
/// use tessel_kernel::theme::Theme;
/// use tessel_term::CellColor;
///
/// let theme: Theme = toml::from_str(r##"accent = "#ff8800""##).unwrap();
/// assert_eq!(theme.accent, CellColor::Rgb(0xff, 0x88, 0x00));
/// assert_eq!(theme.background, CellColor::Default);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Theme {
    #[serde(deserialize_with = "color")]
    pub foreground: CellColor,
    #[serde(deserialize_with = "color")]
    pub background: CellColor,
    #[serde(deserialize_with = "color")]
    pub accent: CellColor,
    #[serde(deserialize_with = "color")]
    pub muted: CellColor,
    #[serde(deserialize_with = "color")]
    pub border: CellColor,
}

impl Theme {
    /// The terminal's own colors everywhere, with a blue accent.
    pub const DEFAULT: Self = Self {
        foreground: CellColor::Default,
        background: CellColor::Default,
        accent: CellColor::from_packed(0x61_AF_EF),
        muted: CellColor::from_packed(0x7F_84_8E),
        border: CellColor::from_packed(0x5C_63_70),
    };

    /// The style handed to the root node.
    #[inline]
    #[must_use]
    pub const fn base_style(&self) -> Style {
        Style::new().fg(self.foreground).bg(self.background)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn color<'de, D: Deserializer<'de>>(de: D) -> Result<CellColor, D::Error> {
    let raw = String::deserialize(de)?;
    raw.parse().map_err(serde::de::Error::custom)
}
