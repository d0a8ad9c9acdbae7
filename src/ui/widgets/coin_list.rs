//! Market list widget.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table, TableState},
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::common::{
    change_style, format_compact, format_percent, format_price, render_empty, render_loading,
    truncate,
};
use crate::state::{ChartSeries, Coin, Store};

/// Coin table with a detail pane for the selected coin.
pub struct CoinList;

impl CoinList {
    /// Render the market list.
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        let (list_area, detail_area) = if area.width >= 100 {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(area);
            (chunks[0], Some(chunks[1]))
        } else {
            (area, None)
        };

        Self::render_table(frame, list_area, store);
        if let Some(detail_area) = detail_area {
            Self::render_detail(frame, detail_area, store);
        }
    }

    fn render_table(frame: &mut Frame, area: Rect, store: &Store) {
        let coins = store.markets.filtered_coins();

        let header_cells = ["#", "Coin", "Price", "24h", "Market Cap", ""].iter().map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = coins.iter().map(|coin| {
            let rank = coin
                .market_cap_rank
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let change = coin
                .price_change_24h_percent
                .map(format_percent)
                .unwrap_or_else(|| "-".to_string());
            let starred = if store.watchlist.contains(&coin.id) {
                "★"
            } else {
                ""
            };

            let cells = vec![
                Cell::from(rank).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format!("{} {}", coin.ticker(), truncate(&coin.name, 18))),
                Cell::from(format_price(coin.current_price)),
                Cell::from(change).style(change_style(coin.price_change_24h_percent)),
                Cell::from(coin.market_cap.map(format_compact).unwrap_or_default()),
                Cell::from(starred).style(Style::default().fg(Color::Yellow)),
            ];

            Row::new(cells).height(1)
        });

        let mut title = format!(
            " Markets ({}) p.{} ",
            coins.len(),
            store.markets.current_page()
        );
        if let Some(query) = &store.markets.search_query {
            title.push_str(&format!("[/{}] ", query));
        }

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Min(20),
                Constraint::Length(16),
                Constraint::Length(9),
                Constraint::Length(11),
                Constraint::Length(2),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(store.markets.selected_index);

        frame.render_stateful_widget(table, area, &mut state);

        if coins.is_empty() && !store.markets.loading {
            let message = if store.markets.search_query.is_some() {
                "No coins match the search"
            } else {
                "No market data"
            };
            render_empty(frame, area, message);
        }
        if store.markets.loading {
            render_loading(frame, area);
        }
    }

    fn render_detail(frame: &mut Frame, area: Rect, store: &Store) {
        let block = Block::default()
            .title(" Detail ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(coin) = store.markets.selected_coin() else {
            render_empty(frame, inner, "Select a coin");
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(inner);

        frame.render_widget(Paragraph::new(detail_lines(coin)), chunks[0]);

        match store
            .markets
            .chart
            .as_ref()
            .filter(|chart| chart.coin_id == coin.id)
        {
            Some(chart) => render_chart(frame, chunks[1], chart),
            None => render_empty(frame, chunks[1], "Enter loads the 7d chart"),
        }
    }
}

fn detail_lines(coin: &Coin) -> Vec<Line<'static>> {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let optional = |value: Option<Decimal>| value.map(format_price).unwrap_or_else(|| "-".into());

    vec![
        Line::from(vec![
            Span::styled(
                coin.name.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" ({})", coin.ticker())),
        ]),
        Line::from(vec![
            label("Price   "),
            Span::raw(format_price(coin.current_price)),
        ]),
        Line::from(vec![
            label("24h     "),
            Span::styled(
                coin.price_change_24h_percent
                    .map(format_percent)
                    .unwrap_or_else(|| "-".into()),
                change_style(coin.price_change_24h_percent),
            ),
        ]),
        Line::from(vec![
            label("High    "),
            Span::raw(optional(coin.high_24h)),
            label("  Low "),
            Span::raw(optional(coin.low_24h)),
        ]),
        Line::from(vec![
            label("Cap     "),
            Span::raw(coin.market_cap.map(format_compact).unwrap_or_default()),
        ]),
        Line::from(vec![
            label("Volume  "),
            Span::raw(coin.total_volume.map(format_compact).unwrap_or_default()),
        ]),
    ]
}

fn render_chart(frame: &mut Frame, area: Rect, chart: &ChartSeries) {
    let Some((low, high)) = chart.bounds() else {
        render_empty(frame, area, "No chart data");
        return;
    };

    let change = chart.change_percent();
    let color = if change.is_some_and(|c| c < Decimal::ZERO) {
        Color::Red
    } else {
        Color::Green
    };
    let title = format!(
        " {}d {} ",
        chart.days,
        change.map(format_percent).unwrap_or_default()
    );

    let width = area.width.saturating_sub(2) as usize;
    let data = sparkline_data(chart, low, high, width);

    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .title(title)
                .title_bottom(format!(" {} - {} ", format_price(low), format_price(high)))
                .borders(Borders::TOP | Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .data(&data)
        .style(Style::default().fg(color));

    frame.render_widget(sparkline, area);
}

/// Resample the series to `width` columns scaled into 1..=100.
fn sparkline_data(chart: &ChartSeries, low: Decimal, high: Decimal, width: usize) -> Vec<u64> {
    if width == 0 || chart.points.is_empty() {
        return Vec::new();
    }
    let range = high - low;
    let step = (chart.points.len() as f64 / width as f64).max(1.0);

    (0..width.min(chart.points.len()))
        .filter_map(|col| chart.points.get((col as f64 * step) as usize))
        .map(|point| {
            if range.is_zero() {
                50
            } else {
                ((point.price - low) / range * Decimal::from(99))
                    .to_u64()
                    .unwrap_or(0)
                    + 1
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PricePoint;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn series(prices: &[Decimal]) -> ChartSeries {
        let now = Utc::now();
        ChartSeries {
            coin_id: "bitcoin".to_string(),
            days: 7,
            points: prices
                .iter()
                .map(|&price| PricePoint {
                    timestamp: now,
                    price,
                })
                .collect(),
        }
    }

    #[test]
    fn test_sparkline_scales_to_range() {
        let chart = series(&[dec!(100), dec!(150), dec!(200)]);
        let data = sparkline_data(&chart, dec!(100), dec!(200), 80);
        assert_eq!(data, vec![1, 50, 100]);
    }

    #[test]
    fn test_sparkline_downsamples_to_width() {
        let prices: Vec<Decimal> = (0..100).map(Decimal::from).collect();
        let data = sparkline_data(&series(&prices), dec!(0), dec!(99), 10);
        assert_eq!(data.len(), 10);
        assert_eq!(data[0], 1);
    }

    #[test]
    fn test_flat_series_draws_midline() {
        let chart = series(&[dec!(5), dec!(5)]);
        assert_eq!(sparkline_data(&chart, dec!(5), dec!(5), 10), vec![50, 50]);
    }
}
