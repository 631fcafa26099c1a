//! Aircraft cache widget.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use skywatch::telemetry::TelemetrySnapshot;

use super::progress_bar;

/// Widget displaying cache occupancy and churn.
pub struct CacheWidget<'a> {
    snapshot: &'a TelemetrySnapshot,
}

impl<'a> CacheWidget<'a> {
    pub fn new(snapshot: &'a TelemetrySnapshot) -> Self {
        Self { snapshot }
    }
}

impl Widget for CacheWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cache = &self.snapshot.cache;
        let over = cache.capacity > 0 && cache.tracked >= cache.capacity;

        let occupancy_line = Line::from(vec![
            Span::styled("Tracked: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!(
                    "{} {}/{}",
                    progress_bar(cache.tracked, cache.capacity, 10),
                    cache.tracked,
                    cache.capacity
                ),
                Style::default().fg(if over { Color::Red } else { Color::Cyan }),
            ),
            Span::raw("  │  "),
            Span::styled("Dirty: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                cache.dirty.to_string(),
                Style::default().fg(if cache.dirty > 0 {
                    Color::Yellow
                } else {
                    Color::DarkGray
                }),
            ),
        ]);

        let churn_line = Line::from(vec![
            Span::styled("Created: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                cache.records_created.to_string(),
                Style::default().fg(Color::White),
            ),
            Span::raw("  │  "),
            Span::styled("Merges: ", Style::default().fg(Color::DarkGray)),
            Span::styled(cache.merges.to_string(), Style::default().fg(Color::White)),
            Span::raw("  │  "),
            Span::styled("Evicted: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                cache.evictions.to_string(),
                Style::default().fg(Color::White),
            ),
        ]);

        let block = Block::default().borders(Borders::ALL).title(" Cache ");
        Paragraph::new(vec![occupancy_line, churn_line])
            .block(block)
            .render(area, buf);
    }
}
