//! Skywatch CLI - runs the tracker and the optional terminal dashboard.

mod ui;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use skywatch::app::{App, ShutdownOutcome};
use skywatch::config::AppConfig;
use skywatch::logging;

/// ADS-B aircraft tracker with resilient summary persistence.
///
/// Configuration is read from `SKYWATCH_*` environment variables; flags
/// override the environment.
#[derive(Debug, Parser)]
#[command(name = "skywatch", version, about)]
struct Cli {
    /// URL of the aircraft.json feed endpoint
    #[arg(long)]
    aircraft_json_url: Option<String>,

    /// URL of the aircraft registry CSV
    #[arg(long)]
    aircraft_csv_url: Option<String>,

    /// URL of the summary store upsert endpoint
    #[arg(long)]
    store_endpoint: Option<String>,

    /// Webhook URL for operator alerts
    #[arg(long)]
    alert_webhook_url: Option<String>,

    /// Feed poll interval in seconds
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Summary flush interval in seconds
    #[arg(long)]
    flush_interval_secs: Option<u64>,

    /// Show the live terminal dashboard
    #[arg(long)]
    dashboard: bool,

    /// Directory for the session log file
    #[arg(long, default_value_t = logging::default_log_dir().to_string())]
    log_dir: String,

    /// Name of the session log file within the log directory
    #[arg(long, default_value_t = logging::default_log_file().to_string())]
    log_file: String,
}

impl Cli {
    /// Environment configuration with flag overrides applied.
    fn into_config(self) -> AppConfig {
        let mut config = AppConfig::from_env();
        if let Some(url) = self.aircraft_json_url {
            config.feed.aircraft_json_url = url;
        }
        if let Some(url) = self.aircraft_csv_url {
            config.feed.aircraft_csv_url = url;
        }
        if let Some(url) = self.store_endpoint {
            config.store.endpoint = url;
        }
        if let Some(url) = self.alert_webhook_url {
            config.alert.webhook_url = Some(url);
        }
        if let Some(secs) = self.poll_interval_secs {
            config.feed.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.flush_interval_secs {
            config.flush_interval = Duration::from_secs(secs);
        }
        config
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let dashboard = cli.dashboard;

    // Console logging would tear the dashboard; keep it file-only then
    let _logging_guard =
        match logging::init_logging(&cli.log_dir, &cli.log_file, !dashboard) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Failed to initialize logging: {e}");
                std::process::exit(2);
            }
        };

    let config = cli.into_config();
    let app = match App::new(config) {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!(error = %e, "Failed to start tracker");
            eprintln!("Failed to start tracker: {e}");
            std::process::exit(2);
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                cancel.cancel();
            }
        });
    }

    let runner = {
        let app = Arc::clone(&app);
        let cancel = cancel.clone();
        tokio::spawn(async move { app.run(cancel).await })
    };

    if dashboard {
        let app = Arc::clone(&app);
        let cancel = cancel.clone();
        let result = tokio::task::spawn_blocking(move || ui::Dashboard::new().run(&app, cancel)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Dashboard terminated with an error"),
            Err(e) => error!(error = %e, "Dashboard task panicked"),
        }
    }

    let outcome = match runner.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Tracker task panicked");
            ShutdownOutcome::FinalFlushFailed
        }
    };

    if outcome == ShutdownOutcome::Clean {
        info!("Tracker stopped cleanly");
    }
    std::process::exit(outcome.exit_code());
}
