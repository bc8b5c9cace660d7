// SPDX-License-Identifier: MIT
//
// Primitive nodes: a box and a line of text. Interactive widgets are built
// on top of these by applications.

mod label;
mod panel;

pub use label::{Label, TextAlign};
pub use panel::Panel;

use tessel_term::Style;

/// `top` painted over `base`: default colors fall through, attributes
/// accumulate, an underline style replaces.
#[must_use]
pub fn overlay(base: Style, top: Style) -> Style {
    Style {
        fg: if top.fg.is_default() { base.fg } else { top.fg },
        bg: if top.bg.is_default() { base.bg } else { top.bg },
        attrs: base.attrs | top.attrs,
        underline: if top.underline.is_underlined() {
            top.underline
        } else {
            base.underline
        },
    }
}
