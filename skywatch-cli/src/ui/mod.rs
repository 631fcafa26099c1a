//! Terminal UI for Skywatch.
//!
//! A real-time dashboard showing feed polling, cache utilization and upload
//! pipeline health. The dashboard only reads telemetry snapshots; it never
//! touches the tracker's live state.

mod dashboard;
pub mod widgets;

pub use dashboard::Dashboard;
