// SPDX-License-Identifier: MIT
//
// A rectangular container: optional background, border and title.
//
// The border is painted on the node's outer ring. Layout reserves that
// ring only when the node's own `border` layout property is set, so a
// bordered panel should be inserted with both.

use std::any::Any;

use tessel_layout::{Measure, Size};
use tessel_term::buffer::BorderSet;
use tessel_term::{Attr, CellColor, Style};

use super::overlay;
use crate::widget::{Canvas, Widget};

/// ```
/// use tessel_kernel::widgets::Panel;
/// use tessel_term::CellColor;
/// use tessel_term::buffer::BorderSet;
///
/// let panel = Panel::new()
///     .border(BorderSet::ROUNDED)
///     .title("Stats")
///     .background(CellColor::from_packed(0x20_20_20));
/// assert_eq!(panel.title_text(), Some("Stats"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Panel {
    background: CellColor,
    border: Option<BorderSet>,
    border_color: CellColor,
    focus_color: CellColor,
    title: Option<String>,
    focusable: bool,
}

impl Panel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill color. `Default` leaves the inherited background.
    #[must_use]
    pub const fn background(mut self, color: CellColor) -> Self {
        self.background = color;
        self
    }

    #[must_use]
    pub const fn border(mut self, set: BorderSet) -> Self {
        self.border = Some(set);
        self
    }

    #[must_use]
    pub const fn border_color(mut self, color: CellColor) -> Self {
        self.border_color = color;
        self
    }

    /// Border color while focused. `Default` keeps the normal color.
    #[must_use]
    pub const fn focus_color(mut self, color: CellColor) -> Self {
        self.focus_color = color;
        self
    }

    /// Shown in the top border.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub const fn focusable(mut self, on: bool) -> Self {
        self.focusable = on;
        self
    }

    #[must_use]
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }
}

impl Measure for Panel {}

impl Widget for Panel {
    fn kind(&self) -> &'static str {
        "panel"
    }

    fn render(&self, canvas: &mut Canvas<'_>, style: Style) -> anyhow::Result<()> {
        let fill = self.inherit(style);
        if !self.background.is_default() {
            canvas.fill(fill);
        }
        let Some(set) = &self.border else {
            return Ok(());
        };

        let color = if canvas.is_focused() && !self.focus_color.is_default() {
            self.focus_color
        } else {
            self.border_color
        };
        let edge = overlay(fill, Style::new().fg(color));
        canvas.draw_border(set, edge);

        if let Some(title) = &self.title {
            if canvas.width() > 4 {
                let label = format!(" {title} ");
                let max = usize::from(canvas.width() - 2);
                let clipped: String = label.chars().take(max).collect();
                canvas.write(1, 0, &clipped, edge.add_attrs(Attr::BOLD));
            }
        }
        Ok(())
    }

    fn inherit(&self, inherited: Style) -> Style {
        overlay(inherited, Style::new().bg(self.background))
    }

    fn focusable(&self) -> bool {
        self.focusable
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
