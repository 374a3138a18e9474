use feeguard_shared::schedule::{run_scheduled_job, ScheduledJob};
use feeguard_shared::AppState;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let state = AppState::from_env().await?;

    run(service_fn(move |event: LambdaEvent<ScheduledJob>| {
        let state = Arc::clone(&state);
        async move { function_handler(event, &state).await }
    }))
    .await
}

async fn function_handler(event: LambdaEvent<ScheduledJob>, state: &AppState) -> Result<(), Error> {
    let job = event.payload;
    tracing::info!("Scheduled job received: {:?}", job);

    // Failures are logged; the next scheduled run is the retry
    if let Err(e) = run_scheduled_job(state, &job).await {
        tracing::error!("Scheduled job {:?} failed: {}", job, e);
    }

    Ok(())
}
