//! One-shot reminder run for CI runners (e.g. a cron workflow) that hold
//! AWS credentials instead of an EventBridge rule.

use feeguard_shared::notification_log::LogSource;
use feeguard_shared::reminders::{send_fee_reminders, ReminderKind};
use feeguard_shared::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    tracing::info!("Starting automated fee reminder process...");

    let state = match AppState::from_env().await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialise: {}", e);
            std::process::exit(1);
        }
    };

    match send_fee_reminders(&state, ReminderKind::Automated, LogSource::Ci).await {
        Ok(Some(report)) => tracing::info!(
            "Reminder process completed: {} sent, {} failed",
            report.receipt.success_count,
            report.receipt.failure_count
        ),
        Ok(None) => tracing::info!("Reminder process completed: nobody to remind"),
        Err(e) => {
            tracing::error!("CRITICAL ERROR in reminder process: {}", e);
            std::process::exit(1);
        }
    }
}
