use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{FeeError, Result};
use crate::push::{PushMessage, PushMessenger};

/// Delivers through an SNS platform application backed by FCM
pub struct SnsMessenger {
    client: SnsClient,
    platform_application_arn: String,
}

impl SnsMessenger {
    pub fn new(client: SnsClient, platform_application_arn: String) -> Self {
        Self {
            client,
            platform_application_arn,
        }
    }

    /// Idempotent: SNS returns the existing endpoint for a known token
    async fn endpoint_for(&self, token: &str) -> Result<String> {
        let output = self
            .client
            .create_platform_endpoint()
            .platform_application_arn(&self.platform_application_arn)
            .token(token)
            .send()
            .await
            .map_err(FeeError::push)?;

        output
            .endpoint_arn()
            .map(|arn| arn.to_string())
            .ok_or_else(|| FeeError::Push("SNS returned no endpoint ARN".to_string()))
    }
}

#[async_trait]
impl PushMessenger for SnsMessenger {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<()> {
        let endpoint_arn = self.endpoint_for(token).await?;
        let payload = sns_payload(message)?;

        self.client
            .publish()
            .target_arn(&endpoint_arn)
            .message_structure("json")
            .message(payload)
            .send()
            .await
            .map_err(FeeError::push)?;

        Ok(())
    }
}

// ========== FCM v1 PAYLOAD ==========
#[derive(Debug, Serialize)]
struct FcmEnvelope<'a> {
    #[serde(rename = "fcmV1Message")]
    fcm_v1_message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    message: FcmBody<'a>,
}

#[derive(Debug, Serialize)]
struct FcmBody<'a> {
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "no_data")]
    data: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android: Option<FcmAndroid<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webpush: Option<FcmWebpush<'a>>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct FcmAndroid<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<&'static str>,
    notification: FcmAndroidNotification<'a>,
}

#[derive(Debug, Serialize)]
struct FcmAndroidNotification<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_priority: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    click_action: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct FcmWebpush<'a> {
    fcm_options: FcmWebpushOptions<'a>,
}

#[derive(Debug, Serialize)]
struct FcmWebpushOptions<'a> {
    link: &'a str,
}

fn no_data(data: &&BTreeMap<String, String>) -> bool {
    data.is_empty()
}

fn fcm_body(message: &PushMessage) -> FcmBody<'_> {
    let android = message.android.as_ref().map(|android| {
        let (priority, notification_priority) = if android.high_priority {
            (Some("HIGH"), Some("PRIORITY_HIGH"))
        } else {
            (None, None)
        };
        FcmAndroid {
            priority,
            notification: FcmAndroidNotification {
                channel_id: android.channel_id.as_deref(),
                notification_priority,
                click_action: android.click_action.as_deref(),
            },
        }
    });

    FcmBody {
        notification: FcmNotification {
            title: &message.title,
            body: &message.body,
        },
        data: &message.data,
        android,
        webpush: message.link.as_deref().map(|link| FcmWebpush {
            fcm_options: FcmWebpushOptions { link },
        }),
    }
}

/// SNS `MessageStructure=json` document: a plain default plus the GCM platform body
fn sns_payload(message: &PushMessage) -> Result<String> {
    let gcm = serde_json::to_string(&FcmEnvelope {
        fcm_v1_message: FcmMessage {
            message: fcm_body(message),
        },
    })
    .map_err(|e| FeeError::Push(format!("Failed to encode FCM payload: {}", e)))?;

    let envelope = serde_json::json!({
        "default": message.body,
        "GCM": gcm,
    });
    Ok(envelope.to_string())
}
