//! Layout management for the TUI.

use ratatui::layout::{Constraint, Flex, Layout as RatatuiLayout, Rect};

/// UI layout areas.
pub struct Layout {
    /// Status bar area (top).
    pub status_area: Rect,
    /// Tab bar area.
    pub tab_area: Rect,
    /// Main content area.
    pub main_area: Rect,
    /// Input line, present while searching or composing.
    pub input_area: Option<Rect>,
    /// Toast area, bottom right of the main area.
    pub notification_area: Rect,
}

impl Layout {
    /// Split the terminal area. The status row collapses when hidden and the
    /// input row only exists while editing.
    pub fn new(area: Rect, editing: bool, show_status_bar: bool) -> Self {
        let [status_area, tab_area, main_area, input_area] = RatatuiLayout::vertical([
            Constraint::Length(u16::from(show_status_bar)),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(if editing { 3 } else { 0 }),
        ])
        .areas(area);

        Self {
            status_area,
            tab_area,
            main_area,
            input_area: editing.then_some(input_area),
            notification_area: toast_area(main_area),
        }
    }
}

/// Bottom-right corner of `main`, half its width but at least 30 columns.
fn toast_area(main: Rect) -> Rect {
    let width = (main.width / 2).max(30).min(main.width);
    let height = 3.min(main.height);
    Rect {
        x: main.x + main.width.saturating_sub(width),
        y: main.y + main.height.saturating_sub(height),
        width,
        height,
    }
}

/// Popup taking the given share of `area`, centered on both axes.
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [row] = RatatuiLayout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = RatatuiLayout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(row);
    popup
}
