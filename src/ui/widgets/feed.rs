//! Social feed widget.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use super::common::{format_age, render_empty, render_loading, truncate};
use crate::models::Sentiment;
use crate::social::FeedItem;
use crate::state::Store;

/// Post list, or one post with its comments.
pub struct FeedView;

impl FeedView {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        match store.feed.open_item() {
            Some(item) => Self::render_thread(frame, area, store, item),
            None => Self::render_list(frame, area, store),
        }
    }

    fn render_list(frame: &mut Frame, area: Rect, store: &Store) {
        let now = Utc::now();
        let width = area.width.saturating_sub(6) as usize;

        let items: Vec<ListItem> = store
            .feed
            .items
            .iter()
            .map(|item| {
                let mut header = post_header(item, now);
                header.push(Span::styled(
                    format!("  ♥ {}", item.like_count),
                    like_style(item.liked_by_me),
                ));
                if item.post.image_url.is_some() {
                    header.push(Span::styled(" 🖼", Style::default().fg(Color::DarkGray)));
                }

                let first_line = item.post.content.lines().next().unwrap_or_default();
                ListItem::new(vec![
                    Line::from(header),
                    Line::from(Span::raw(format!("  {}", truncate(first_line, width)))),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Feed ({}) ", store.feed.items.len()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        state.select(store.feed.selected_index);
        frame.render_stateful_widget(list, area, &mut state);

        if store.feed.items.is_empty() && !store.feed.loading {
            render_empty(frame, area, "No posts yet");
        }
        if store.feed.loading {
            render_loading(frame, area);
        }
    }

    fn render_thread(frame: &mut Frame, area: Rect, store: &Store, item: &FeedItem) {
        let now = Utc::now();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Min(0)])
            .split(area);

        let mut header = post_header(item, now);
        header.push(Span::styled(
            format!("  ♥ {}", item.like_count),
            like_style(item.liked_by_me),
        ));

        let mut lines = vec![Line::from(header), Line::from("")];
        lines.extend(
            item.post
                .content
                .lines()
                .map(|line| Line::from(line.to_string())),
        );
        if let Some(url) = &item.post.image_url {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Image: {}", url),
                Style::default().fg(Color::DarkGray),
            )));
        }

        let post_color = if store.feed.comment_index.is_none() {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let post = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(" Post (Esc to close) ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(post_color)),
            );
        frame.render_widget(post, chunks[0]);

        let comments: Vec<ListItem> = store
            .feed
            .comments
            .iter()
            .map(|comment| {
                let author = if Some(comment.user_id) == store.app.user_id() {
                    "you".to_string()
                } else {
                    comment.user_id.to_string()[..8].to_string()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", author), Style::default().fg(Color::Cyan)),
                    Span::styled(
                        format!("{} ", format_age(comment.created_at, now)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(comment.content.clone()),
                ]))
            })
            .collect();

        let list = List::new(comments)
            .block(
                Block::default()
                    .title(format!(" Comments ({}) ", store.feed.comments.len()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        state.select(store.feed.comment_index);
        frame.render_stateful_widget(list, chunks[1], &mut state);

        if store.feed.comments.is_empty() {
            render_empty(frame, chunks[1], "No comments yet");
        }
    }
}

fn post_header(item: &FeedItem, now: chrono::DateTime<Utc>) -> Vec<Span<'static>> {
    let mut spans = vec![
        Span::styled(
            item.author_name().to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" · {}", format_age(item.post.created_at, now)),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(coin) = &item.post.coin_id {
        spans.push(Span::styled(
            format!("  ${}", coin),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(sentiment) = item.post.sentiment {
        let color = match sentiment {
            Sentiment::Bullish => Color::Green,
            Sentiment::Bearish => Color::Red,
            Sentiment::Neutral => Color::Gray,
        };
        spans.push(Span::styled(
            format!("  {}", sentiment),
            Style::default().fg(color),
        ));
    }
    spans
}

fn like_style(liked: bool) -> Style {
    if liked {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}
