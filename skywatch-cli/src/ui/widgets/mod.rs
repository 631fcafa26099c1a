//! Reusable dashboard widgets.

mod cache;
mod feed;
mod pipeline;

pub use cache::CacheWidget;
pub use feed::FeedWidget;
pub use pipeline::PipelineWidget;

use std::time::Duration;

/// Format a duration compactly: `45s`, `3m12s`, `2h05m`.
pub(crate) fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Fixed-width bar of filled/empty blocks.
pub(crate) fn progress_bar(filled: usize, total: usize, width: usize) -> String {
    let blocks = if total == 0 {
        0
    } else {
        (filled * width).div_ceil(total).min(width)
    };
    format!("{}{}", "█".repeat(blocks), "░".repeat(width - blocks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(192)), "3m12s");
        assert_eq!(format_duration(Duration::from_secs(7500)), "2h05m");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 10, 4), "░░░░");
        assert_eq!(progress_bar(5, 10, 4), "██░░");
        assert_eq!(progress_bar(10, 10, 4), "████");
        // Over-full clamps to the bar width
        assert_eq!(progress_bar(15, 10, 4), "████");
        assert_eq!(progress_bar(3, 0, 4), "░░░░");
    }
}
