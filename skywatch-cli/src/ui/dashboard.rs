//! Main dashboard loop.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio_util::sync::CancellationToken;

use skywatch::app::App;
use skywatch::telemetry::TelemetrySnapshot;

use super::widgets::{format_duration, CacheWidget, FeedWidget, PipelineWidget};

/// Live terminal dashboard.
///
/// Runs on a blocking thread, redrawing once per refresh interval. Quitting
/// the dashboard (q / Esc / Ctrl-C) cancels the whole tracker.
pub struct Dashboard {
    refresh: Duration,
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            refresh: Duration::from_millis(1000),
        }
    }

    /// Run until cancelled or the user quits.
    pub fn run(&self, app: &App, cancel: CancellationToken) -> io::Result<()> {
        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal, app, &cancel);
        ratatui::restore();
        result
    }

    fn event_loop(
        &self,
        terminal: &mut ratatui::DefaultTerminal,
        app: &App,
        cancel: &CancellationToken,
    ) -> io::Result<()> {
        while !cancel.is_cancelled() {
            let snapshot = app.telemetry_snapshot();
            terminal.draw(|frame| draw(frame, &snapshot))?;

            if event::poll(self.refresh)? {
                if let Event::Key(key) = event::read()? {
                    let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                        || (key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL));
                    if quit {
                        cancel.cancel();
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

fn draw(frame: &mut Frame, snapshot: &TelemetrySnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Min(7),
        ])
        .split(frame.area());

    frame.render_widget(header(snapshot), chunks[0]);
    frame.render_widget(FeedWidget::new(snapshot), chunks[1]);
    frame.render_widget(CacheWidget::new(snapshot), chunks[2]);
    frame.render_widget(PipelineWidget::new(snapshot), chunks[3]);
}

fn header(snapshot: &TelemetrySnapshot) -> Paragraph<'static> {
    let line = Line::from(vec![
        Span::styled("SKYWATCH", Style::default().fg(Color::Cyan)),
        Span::raw("  │  up "),
        Span::styled(
            format_duration(snapshot.uptime),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled("q to quit", Style::default().fg(Color::DarkGray)),
    ]);
    Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM))
}
