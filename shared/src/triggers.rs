use chrono::NaiveDate;

use crate::config::Settings;
use crate::error::Result;
use crate::push::{AndroidOptions, PushMessage};
use crate::types::{NotificationTrigger, TRIGGER_TYPE_MANUAL_REMINDER};
use crate::AppState;

pub const FLUTTER_CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// Single notification for an admin-created trigger document
pub fn trigger_message(trigger_type: &str, today: NaiveDate, settings: &Settings) -> PushMessage {
    let body = if trigger_type == TRIGGER_TYPE_MANUAL_REMINDER {
        format!(
            "This is a reminder to pay your monthly fee for {}. Please visit the dashboard.",
            today.format("%B %Y")
        )
    } else {
        format!("You have a new message from {}.", settings.org_name)
    };

    PushMessage::new("🔔 Important Notification", body)
        .with_data("click_action", FLUTTER_CLICK_ACTION)
        .with_data("type", trigger_type)
        .with_android(AndroidOptions {
            click_action: Some(FLUTTER_CLICK_ACTION.to_string()),
            ..Default::default()
        })
        .with_link(settings.web_app_url.clone())
}

/// Send the trigger's notification. A trigger without a token is logged and dropped.
pub async fn handle_notification_trigger(
    state: &AppState,
    trigger: &NotificationTrigger,
) -> Result<()> {
    let Some(token) = trigger.push_token.as_deref() else {
        tracing::error!("No push token for notification trigger {}", trigger.trigger_id);
        return Ok(());
    };

    let today = state.settings.now().date_naive();
    let message = trigger_message(&trigger.trigger_type, today, &state.settings);

    match state.messenger.send(token, &message).await {
        Ok(()) => tracing::info!(
            "Notification sent to user {} via trigger {}",
            trigger.user_id.as_deref().unwrap_or("unknown"),
            trigger.trigger_id
        ),
        Err(e) => tracing::error!("Error sending triggered notification: {}", e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::testing::RecordingMessenger;
    use aws_sdk_cognitoidentityprovider::config::{BehaviorVersion, Region};
    use std::sync::Arc;

    fn offline_state(messenger: Arc<RecordingMessenger>) -> Arc<AppState> {
        let cognito = aws_sdk_cognitoidentityprovider::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("ap-south-1"))
            .build();
        let dynamo = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("ap-south-1"))
            .build();
        AppState::new(
            aws_sdk_cognitoidentityprovider::Client::from_conf(cognito),
            aws_sdk_dynamodb::Client::from_conf(dynamo),
            messenger,
            Settings::default(),
        )
    }

    #[test]
    fn test_manual_reminder_body() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let message = trigger_message("MANUAL_REMINDER", today, &Settings::default());

        assert_eq!(message.title, "🔔 Important Notification");
        assert_eq!(
            message.body,
            "This is a reminder to pay your monthly fee for October 2026. Please visit the dashboard."
        );
        assert_eq!(message.data["type"], "MANUAL_REMINDER");
        assert_eq!(message.data["click_action"], "FLUTTER_NOTIFICATION_CLICK");
        assert_eq!(message.link.as_deref(), Some("https://neethiyaithedi-a2640.web.app"));
    }

    #[test]
    fn test_other_types_get_generic_body() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let message = trigger_message("ANNOUNCEMENT", today, &Settings::default());
        assert_eq!(message.body, "You have a new message from Neethiyaithedi.");
    }

    #[tokio::test]
    async fn test_trigger_is_sent_to_its_token() {
        let messenger = Arc::new(RecordingMessenger::default());
        let state = offline_state(messenger.clone());
        let trigger = NotificationTrigger {
            trigger_id: "t1".to_string(),
            user_id: Some("u1".to_string()),
            push_token: Some("tok-u1".to_string()),
            trigger_type: "MANUAL_REMINDER".to_string(),
        };

        handle_notification_trigger(&state, &trigger).await.unwrap();

        assert_eq!(messenger.tokens(), vec!["tok-u1".to_string()]);
    }

    #[tokio::test]
    async fn test_trigger_without_token_is_skipped() {
        let messenger = Arc::new(RecordingMessenger::default());
        let state = offline_state(messenger.clone());
        let trigger = NotificationTrigger {
            trigger_id: "t2".to_string(),
            user_id: Some("u1".to_string()),
            push_token: None,
            trigger_type: "MANUAL_REMINDER".to_string(),
        };

        handle_notification_trigger(&state, &trigger).await.unwrap();
        assert!(messenger.tokens().is_empty());

        // delivery failures are logged, not raised
        let failing = NotificationTrigger {
            push_token: Some("bad-token".to_string()),
            ..trigger
        };
        assert!(handle_notification_trigger(&state, &failing).await.is_ok());
    }
}
