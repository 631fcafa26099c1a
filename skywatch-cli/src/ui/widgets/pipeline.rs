//! Upload pipeline health widget.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use skywatch::pipeline::BreakerState;
use skywatch::telemetry::TelemetrySnapshot;

use super::{format_duration, progress_bar};

/// Widget displaying breaker state, pool usage and send counters.
pub struct PipelineWidget<'a> {
    snapshot: &'a TelemetrySnapshot,
}

impl<'a> PipelineWidget<'a> {
    pub fn new(snapshot: &'a TelemetrySnapshot) -> Self {
        Self { snapshot }
    }

    fn breaker_color(state: BreakerState) -> Color {
        match state {
            BreakerState::Closed => Color::Green,
            BreakerState::Open => Color::Red,
            BreakerState::HalfOpen => Color::Cyan,
        }
    }
}

impl Widget for PipelineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let pipeline = &self.snapshot.pipeline;

        let status_line = Line::from(vec![
            Span::styled("Store: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{:^14}", pipeline.breaker_state.display_status()),
                Style::default().fg(Self::breaker_color(pipeline.breaker_state)),
            ),
            Span::raw("  │  "),
            Span::styled("Pool: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!(
                    "{} {}/{}",
                    progress_bar(pipeline.pool_in_use, pipeline.pool_size, 4),
                    pipeline.pool_in_use,
                    pipeline.pool_size
                ),
                Style::default().fg(Color::Cyan),
            ),
        ]);

        let sends_line = Line::from(vec![
            Span::styled("Sends: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!(
                    "{} attempted / {} failed",
                    self.snapshot.send_attempts, self.snapshot.send_failures
                ),
                Style::default().fg(if self.snapshot.send_failures > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
            Span::raw("  │  "),
            Span::styled("Persisted: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.snapshot.records_persisted.to_string(),
                Style::default().fg(Color::Green),
            ),
        ]);

        let flushes_line = Line::from(vec![
            Span::styled("Flushes: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!(
                    "{} ok / {} failed",
                    self.snapshot.flushes_ok, self.snapshot.flushes_failed
                ),
                Style::default().fg(if self.snapshot.flushes_failed > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
            Span::raw("  │  "),
            Span::styled("Breaker opens: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.snapshot.breaker_opens.to_string(),
                Style::default().fg(if self.snapshot.breaker_opens > 0 {
                    Color::Red
                } else {
                    Color::DarkGray
                }),
            ),
            Span::raw("  │  "),
            Span::styled("Alerts: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.snapshot.alerts_sent.to_string(),
                Style::default().fg(Color::White),
            ),
        ]);

        let trouble_line = match (pipeline.consecutive_failures, pipeline.last_failure_age) {
            (0, _) => Line::from(vec![Span::styled(
                "No recent store failures",
                Style::default().fg(Color::DarkGray),
            )]),
            (failures, age) => {
                let mut spans = vec![
                    Span::styled("Consecutive failures: ", Style::default().fg(Color::DarkGray)),
                    Span::styled(failures.to_string(), Style::default().fg(Color::Red)),
                ];
                if let Some(age) = age {
                    spans.push(Span::styled(
                        format!("  (last {} ago)", format_duration(age)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            }
        };

        let block = Block::default().borders(Borders::ALL).title(" Pipeline ");
        Paragraph::new(vec![status_line, sends_line, flushes_line, trouble_line])
            .block(block)
            .render(area, buf);
    }
}
