use aws_lambda_events::event::dynamodb::{Event, EventRecord};
use feeguard_shared::stream::{payment_from_image, trigger_from_image, image_str, StreamEntity};
use feeguard_shared::{payments, triggers, AppState};
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

    run(service_fn(move |event: LambdaEvent<Event>| {
        let state = Arc::clone(&state);
        async move { function_handler(event, &state).await }
    }))
    .await
}

async fn function_handler(event: LambdaEvent<Event>, state: &AppState) -> Result<(), Error> {
    tracing::info!("DynamoDB Stream event received with {} records", event.payload.records.len());

    // One bad record must not block the rest of the batch
    for record in event.payload.records {
        if let Err(e) = process_record(&record, state).await {
            tracing::error!("Failed to process record: {}", e);
        }
    }

    Ok(())
}

async fn process_record(record: &EventRecord, state: &AppState) -> Result<(), Error> {
    // Only newly created documents start work
    if record.event_name != "INSERT" {
        return Ok(());
    }

    let image = serde_json::to_value(&record.change.new_image)?;
    let pk = image_str(&image, "PK").ok_or("Missing PK")?;

    match StreamEntity::from_pk(&pk) {
        StreamEntity::Payment(payment_id) => {
            tracing::info!("Processing payment {}", payment_id);
            let payment = payment_from_image(&payment_id, &image)?;
            payments::handle_payment_created(state, &payment).await?;
        }
        StreamEntity::NotificationTrigger(trigger_id) => {
            tracing::info!("Processing notification trigger {}", trigger_id);
            let trigger = trigger_from_image(&trigger_id, &image)?;
            triggers::handle_notification_trigger(state, &trigger).await?;
        }
        StreamEntity::Other => {}
    }

    Ok(())
}
