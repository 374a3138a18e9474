pub mod config;
pub mod error;
pub mod types;
pub mod http;
pub mod auth;
pub mod members;
pub mod membership;
pub mod reminders;
pub mod payments;
pub mod triggers;
pub mod notification_log;
pub mod push;
pub mod sns;
pub mod stream;
pub mod schedule;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sns::Client as SnsClient;
use config::Settings;
use error::FeeError;
use push::PushMessenger;
use sns::SnsMessenger;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub cognito_client: CognitoClient,
    pub dynamo_client: DynamoClient,
    pub messenger: Arc<dyn PushMessenger>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(
        cognito_client: CognitoClient,
        dynamo_client: DynamoClient,
        messenger: Arc<dyn PushMessenger>,
        settings: Settings,
    ) -> Arc<Self> {
        Arc::new(Self {
            cognito_client,
            dynamo_client,
            messenger,
            settings,
        })
    }

    /// Build every client once per cold start from the Lambda environment
    pub async fn from_env() -> Result<Arc<Self>, FeeError> {
        let settings = Settings::from_env()?;
        let platform_application_arn = settings
            .platform_application_arn
            .clone()
            .ok_or_else(|| {
                FeeError::Config("SNS_PLATFORM_APPLICATION_ARN must be set".to_string())
            })?;

        let config = aws_config::load_from_env().await;
        let messenger = SnsMessenger::new(SnsClient::new(&config), platform_application_arn);

        Ok(Self::new(
            CognitoClient::new(&config),
            DynamoClient::new(&config),
            Arc::new(messenger),
            settings,
        ))
    }
}
