//! Formatting and rendering helpers shared by the widgets.

use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Truncate to `max_len` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Price with thousands separators. Sub-dollar prices keep six decimals.
pub fn format_price(price: Decimal) -> String {
    if price.abs() < Decimal::ONE {
        let rounded = price.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
        return format!("${}", rounded.normalize());
    }

    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((&text, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if price.is_sign_negative() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac)
}

/// Large amounts as `1.23T`, `4.56B`, `7.89M` or `12.3K`.
pub fn format_compact(value: Decimal) -> String {
    let units = [
        (Decimal::from(1_000_000_000_000u64), "T"),
        (Decimal::from(1_000_000_000u64), "B"),
        (Decimal::from(1_000_000u64), "M"),
        (Decimal::from(1_000u64), "K"),
    ];
    for (size, suffix) in units {
        if value.abs() >= size {
            return format!("${:.2}{}", value / size, suffix);
        }
    }
    format!("${:.0}", value)
}

/// Signed percent with two decimals.
pub fn format_percent(value: Decimal) -> String {
    let sign = if value > Decimal::ZERO { "+" } else { "" };
    format!("{}{:.2}%", sign, value)
}

/// Green for gains, red for losses.
pub fn change_style(value: Option<Decimal>) -> Style {
    match value {
        Some(v) if v > Decimal::ZERO => Style::default().fg(Color::Green),
        Some(v) if v < Decimal::ZERO => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Gray),
    }
}

/// Coarse age such as `5m` or `3d`.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    match secs {
        0..60 => "now".to_string(),
        60..3_600 => format!("{}m", secs / 60),
        3_600..86_400 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Placeholder text centered in a list area.
pub fn render_empty(frame: &mut Frame, area: Rect, message: &str) {
    let inner = Rect {
        x: area.x + 2,
        y: area.y + area.height / 2,
        width: area.width.saturating_sub(4),
        height: 1.min(area.height),
    };
    let text = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(text, inner);
}

/// Loading marker in the bottom right corner of a bordered area.
pub fn render_loading(frame: &mut Frame, area: Rect) {
    if area.width < 17 || area.height < 3 {
        return;
    }
    let loading = Line::from(Span::styled(
        "Loading...",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC),
    ));
    let loading_area = Rect {
        x: area.x + area.width - 15,
        y: area.y + area.height - 2,
        width: 13,
        height: 1,
    };
    frame.render_widget(Paragraph::new(loading), loading_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(dec!(67123.456)), "$67,123.46");
        assert_eq!(format_price(dec!(1000)), "$1,000.00");
        assert_eq!(format_price(dec!(999.5)), "$999.50");
        assert_eq!(format_price(dec!(0.00001234567)), "$0.000012");
        assert_eq!(format_price(dec!(-1234.5)), "-$1,234.50");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(dec!(1320000000000)), "$1.32T");
        assert_eq!(format_compact(dec!(45600000)), "$45.60M");
        assert_eq!(format_compact(dec!(950)), "$950");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("🚀🚀🚀", 2), "🚀…");
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "now");
        assert_eq!(format_age(now - Duration::minutes(5), now), "5m");
        assert_eq!(format_age(now - Duration::days(3), now), "3d");
    }
}
