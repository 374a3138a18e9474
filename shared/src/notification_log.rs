use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{FeeError, Result};
use crate::reminders::ReminderKind;
use crate::types::MembershipMonth;

pub const LOG_TYPE_FEE_REMINDER: &str = "FEE_REMINDER";

/// What started a reminder run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Scheduler,
    Api,
    Ci,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Scheduler => "scheduler",
            LogSource::Api => "api",
            LogSource::Ci => "ci",
        }
    }
}

/// Outcome of one reminder run, kept for admin visibility
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationLogEntry {
    pub reminder_type: ReminderKind,
    pub source: LogSource,
    pub month: MembershipMonth,
    pub is_overdue: bool,
    pub total_recipients: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

fn entry_to_item(
    log_id: &str,
    sent_at: &str,
    entry: &NotificationLogEntry,
) -> HashMap<String, AttributeValue> {
    let n = |v: usize| AttributeValue::N(v.to_string());
    HashMap::from([
        ("PK".to_string(), AttributeValue::S(format!("NOTIFICATION_LOG#{}", log_id))),
        ("SK".to_string(), AttributeValue::S("METADATA".to_string())),
        ("entity_type".to_string(), AttributeValue::S("notification_log".to_string())),
        ("type".to_string(), AttributeValue::S(LOG_TYPE_FEE_REMINDER.to_string())),
        ("reminder_type".to_string(), AttributeValue::S(entry.reminder_type.as_str().to_string())),
        ("source".to_string(), AttributeValue::S(entry.source.as_str().to_string())),
        ("month".to_string(), AttributeValue::S(entry.month.to_string())),
        ("is_overdue".to_string(), AttributeValue::Bool(entry.is_overdue)),
        ("sent_at".to_string(), AttributeValue::S(sent_at.to_string())),
        ("total_recipients".to_string(), n(entry.total_recipients)),
        ("success_count".to_string(), n(entry.success_count)),
        ("failure_count".to_string(), n(entry.failure_count)),
    ])
}

/// Store a log entry and return its id
pub async fn record_notification_log(
    client: &DynamoClient,
    table_name: &str,
    entry: &NotificationLogEntry,
) -> Result<String> {
    let log_id = Uuid::new_v4().to_string();
    let sent_at = Utc::now().to_rfc3339();

    client
        .put_item()
        .table_name(table_name)
        .set_item(Some(entry_to_item(&log_id, &sent_at, entry)))
        .send()
        .await
        .map_err(FeeError::datastore)?;

    Ok(log_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_item_layout() {
        let entry = NotificationLogEntry {
            reminder_type: ReminderKind::DailyEvening,
            source: LogSource::Scheduler,
            month: MembershipMonth::new(2026, 10).unwrap(),
            is_overdue: true,
            total_recipients: 12,
            success_count: 11,
            failure_count: 1,
        };

        let item = entry_to_item("log-1", "2026-10-19T18:00:00+05:30", &entry);

        assert_eq!(item["PK"], AttributeValue::S("NOTIFICATION_LOG#log-1".to_string()));
        assert_eq!(item["reminder_type"], AttributeValue::S("DAILY_EVENING".to_string()));
        assert_eq!(item["source"], AttributeValue::S("scheduler".to_string()));
        assert_eq!(item["month"], AttributeValue::S("2026-10".to_string()));
        assert_eq!(item["is_overdue"], AttributeValue::Bool(true));
        assert_eq!(item["total_recipients"], AttributeValue::N("12".to_string()));
        assert_eq!(item["failure_count"], AttributeValue::N("1".to_string()));
    }
}
