//! Feed polling widget.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use skywatch::telemetry::TelemetrySnapshot;

use super::format_duration;

/// Widget displaying feed poll and flush activity.
pub struct FeedWidget<'a> {
    snapshot: &'a TelemetrySnapshot,
}

impl<'a> FeedWidget<'a> {
    pub fn new(snapshot: &'a TelemetrySnapshot) -> Self {
        Self { snapshot }
    }

    fn last_flush_age(&self) -> Option<Duration> {
        if self.snapshot.last_flush_unix_ms == 0 {
            return None;
        }
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_millis() as u64;
        Some(Duration::from_millis(
            now_ms.saturating_sub(self.snapshot.last_flush_unix_ms),
        ))
    }
}

impl Widget for FeedWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let polls_line = Line::from(vec![
            Span::styled("Polls: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{} ok", self.snapshot.polls_ok),
                Style::default().fg(Color::Green),
            ),
            Span::raw(" / "),
            Span::styled(
                format!("{} failed", self.snapshot.polls_failed),
                Style::default().fg(if self.snapshot.polls_failed > 0 {
                    Color::Red
                } else {
                    Color::DarkGray
                }),
            ),
            Span::raw("  │  "),
            Span::styled("Snapshots merged: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.snapshot.snapshots_merged.to_string(),
                Style::default().fg(Color::Cyan),
            ),
        ]);

        let flush_line = match self.last_flush_age() {
            Some(age) => Line::from(vec![
                Span::styled("Last flush: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{} ago", format_duration(age)),
                    Style::default().fg(Color::Green),
                ),
            ]),
            None => Line::from(vec![Span::styled(
                "Waiting for first flush...",
                Style::default().fg(Color::DarkGray),
            )]),
        };

        let block = Block::default().borders(Borders::ALL).title(" Feed ");
        Paragraph::new(vec![polls_line, flush_line])
            .block(block)
            .render(area, buf);
    }
}
