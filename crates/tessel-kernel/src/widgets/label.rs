// SPDX-License-Identifier: MIT

use std::any::Any;

use tessel_layout::{Measure, Size};
use tessel_term::Style;
use tessel_term::buffer::string_width;

use super::overlay;
use crate::widget::{Canvas, Widget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A single line of text. Overflow is cut at the node's right edge.
///
/// ```
/// use tessel_kernel::widgets::{Label, TextAlign};
///
/// let label = Label::new("ready").align(TextAlign::Right);
/// assert_eq!(label.text(), "ready");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Label {
    text: String,
    style: Style,
    align: TextAlign,
}

impl Label {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Painted over the inherited style.
    #[must_use]
    pub const fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub const fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub const fn set_style(&mut self, style: Style) {
        self.style = style;
    }
}

impl Measure for Label {
    fn measure(&self, _: Size) -> Size {
        let w = u16::try_from(string_width(&self.text)).unwrap_or(u16::MAX);
        Size::new(w, 1)
    }
}

impl Widget for Label {
    fn kind(&self) -> &'static str {
        "label"
    }

    fn render(&self, canvas: &mut Canvas<'_>, style: Style) -> anyhow::Result<()> {
        let style = overlay(style, self.style);
        let width = i32::try_from(string_width(&self.text)).unwrap_or(i32::MAX);
        let room = i32::from(canvas.width());
        let x = match self.align {
            TextAlign::Left => 0,
            TextAlign::Center => ((room - width) / 2).max(0),
            TextAlign::Right => (room - width).max(0),
        };
        canvas.write(x, 0, &self.text, style);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
