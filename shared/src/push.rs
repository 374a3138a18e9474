//! Push-notification seam. The dispatcher only knows tokens and messages;
//! delivery belongs to whatever implements [`PushMessenger`].

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;

/// Largest token list handed to a single multicast call
pub const MULTICAST_LIMIT: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AndroidOptions {
    /// Deliver immediately instead of leaving it to the device's batching
    pub high_priority: bool,
    pub channel_id: Option<String>,
    pub click_action: Option<String>,
}

/// Platform-neutral notification
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Delivered to the client app as string key/value pairs
    pub data: BTreeMap<String, String>,
    pub android: Option<AndroidOptions>,
    /// Page opened when a web push is clicked
    pub link: Option<String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
            android: None,
            link: None,
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_android(mut self, android: AndroidOptions) -> Self {
        self.android = Some(android);
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Per-token outcome of a multicast send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastReceipt {
    pub success_count: usize,
    pub failure_count: usize,
    pub failed_tokens: Vec<String>,
}

impl MulticastReceipt {
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn merge(&mut self, other: MulticastReceipt) {
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.failed_tokens.extend(other.failed_tokens);
    }
}

#[async_trait]
pub trait PushMessenger: Send + Sync {
    /// Deliver one message to one device token
    async fn send(&self, token: &str, message: &PushMessage) -> Result<()>;

    /// Deliver to each token independently; failures are counted, never raised
    async fn send_each(&self, tokens: &[String], message: &PushMessage) -> MulticastReceipt {
        let mut receipt = MulticastReceipt::default();
        for token in tokens {
            match self.send(token, message).await {
                Ok(()) => receipt.success_count += 1,
                Err(e) => {
                    tracing::warn!("Push to token {} failed: {}", redact(token), e);
                    receipt.failure_count += 1;
                    receipt.failed_tokens.push(token.clone());
                }
            }
        }
        receipt
    }
}

/// Send to any number of tokens in chunks of at most [`MULTICAST_LIMIT`]
pub async fn send_multicast(
    messenger: &dyn PushMessenger,
    tokens: &[String],
    message: &PushMessage,
) -> MulticastReceipt {
    let mut receipt = MulticastReceipt::default();
    for chunk in tokens.chunks(MULTICAST_LIMIT) {
        receipt.merge(messenger.send_each(chunk, message).await);
    }
    receipt
}

/// Enough of a token to correlate log lines without leaking it
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::FeeError;
    use std::sync::Mutex;

    /// Records every delivery; tokens starting with `bad` fail
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<(String, PushMessage)>>,
    }

    impl RecordingMessenger {
        pub fn tokens(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl PushMessenger for RecordingMessenger {
        async fn send(&self, token: &str, message: &PushMessage) -> Result<()> {
            if token.starts_with("bad") {
                return Err(FeeError::Push(format!("endpoint disabled for {}", token)));
            }
            self.sent
                .lock()
                .unwrap()
                .push((token.to_string(), message.clone()));
            Ok(())
        }
    }
}
