//! Fee reminder policy: who gets reminded, and with which bilingual message.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Settings;
use crate::error::Result;
use crate::members;
use crate::notification_log::{record_notification_log, LogSource, NotificationLogEntry};
use crate::push::{
    send_multicast, AndroidOptions, MulticastReceipt, PushMessage, PushMessenger,
};
use crate::types::{Member, MembershipMonth, Role};
use crate::AppState;

pub const FEE_REMINDER_TYPE: &str = "FEE_REMINDER";
pub const FEE_REMINDER_CHANNEL: &str = "fee_reminders";

const TAMIL_MONTHS: [&str; 12] = [
    "ஜனவரி",
    "பிப்ரவரி",
    "மார்ச்",
    "ஏப்ரல்",
    "மே",
    "ஜூன்",
    "ஜூலை",
    "ஆகஸ்ட்",
    "செப்டம்பர்",
    "அக்டோபர்",
    "நவம்பர்",
    "டிசம்பர்",
];

/// Urgency of a reminder, chosen from the day of the month only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderTier {
    NewMonth,
    Generic,
    Overdue,
}

impl ReminderTier {
    pub fn for_day(day: u32, due_day: u32) -> Self {
        if day > due_day {
            ReminderTier::Overdue
        } else if day == 1 {
            ReminderTier::NewMonth
        } else {
            ReminderTier::Generic
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, ReminderTier::Overdue)
    }
}

/// Which schedule or caller asked for the run. Recorded, never used to pick content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderKind {
    DailyMorning,
    DailyEvening,
    NewMonth,
    Overdue,
    Manual,
    Automated,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::DailyMorning => "DAILY_MORNING",
            ReminderKind::DailyEvening => "DAILY_EVENING",
            ReminderKind::NewMonth => "NEW_MONTH",
            ReminderKind::Overdue => "OVERDUE",
            ReminderKind::Manual => "MANUAL",
            ReminderKind::Automated => "AUTOMATED",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn tamil_month(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| TAMIL_MONTHS.get(i as usize))
        .copied()
        .unwrap_or_default()
}

/// `100`, `150.50`
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}

pub fn format_rupees(amount: f64) -> String {
    format!("₹{}", format_amount(amount))
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", day, suffix)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderContent {
    pub title: String,
    pub body: String,
}

/// Tamil paragraph first, English second
pub fn compose_reminder(
    tier: ReminderTier,
    today: NaiveDate,
    fee_amount: f64,
    due_day: u32,
) -> ReminderContent {
    let tamil = tamil_month(today.month());
    let english = today.format("%B %Y").to_string();
    let fee = format_rupees(fee_amount);
    let due = ordinal(due_day);

    match tier {
        ReminderTier::Overdue => ReminderContent {
            title: "⚠️ சந்தா செலுத்த காலதாமதம் | Overdue Notice".to_string(),
            body: format!(
                "{tamil} மாதத்திற்கான உங்கள் {fee} சந்தாவை இன்னும் செலுத்தவில்லை. தயவுசெய்து விரைந்து செலுத்தவும்.\n\n\
                 Your monthly fee for {english} is overdue. Please pay {fee} immediately to maintain your active status."
            ),
        },
        ReminderTier::NewMonth => ReminderContent {
            title: "💰 புதிய மாத சந்தா | New Month Fee".to_string(),
            body: format!(
                "{tamil} மாதம் தொடங்கிவிட்டது! இந்த மாதத்திற்கான {fee} சந்தாவை {due_day}-ம் தேதிக்குள் செலுத்தவும்.\n\n\
                 A new month has begun! Please pay your monthly fee of {fee} for {english} by the {due}."
            ),
        },
        ReminderTier::Generic => ReminderContent {
            title: "🔔 சந்தா நினைவூட்டல் | Fee Reminder".to_string(),
            body: format!(
                "{tamil} மாதத்திற்கான உங்கள் {fee} சந்தாவை {due_day}-ம் தேதிக்குள் செலுத்த நினைவூட்டுகிறோம்.\n\n\
                 Reminder to pay your monthly fee of {fee} for {english} by the {due}."
            ),
        },
    }
}

/// Members who owe this month's fee and can be reached
pub fn unpaid_recipients(members: &[Member], month: MembershipMonth) -> Vec<&Member> {
    members
        .iter()
        .filter(|m| m.role == Role::Member)
        .filter(|m| !m.has_paid_for(month))
        .filter(|m| m.push_token().is_some())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderPlan {
    pub month: MembershipMonth,
    pub tier: ReminderTier,
    pub kind: ReminderKind,
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

/// `None` when nobody needs a reminder
pub fn plan_reminders(
    members: &[Member],
    today: NaiveDate,
    kind: ReminderKind,
    settings: &Settings,
) -> Option<ReminderPlan> {
    let month = MembershipMonth::of(&today);
    let tokens: Vec<String> = unpaid_recipients(members, month)
        .into_iter()
        .filter_map(|m| m.push_token().map(|t| t.to_string()))
        .collect();

    if tokens.is_empty() {
        return None;
    }

    let tier = ReminderTier::for_day(today.day(), settings.due_day);
    let content = compose_reminder(tier, today, settings.fee_amount, settings.due_day);

    let message = PushMessage::new(content.title, content.body)
        .with_data("type", FEE_REMINDER_TYPE)
        .with_data("month", month.to_string())
        .with_data("reminderType", kind.as_str())
        .with_data("isOverdue", tier.is_overdue().to_string())
        .with_android(AndroidOptions {
            high_priority: true,
            channel_id: Some(FEE_REMINDER_CHANNEL.to_string()),
            click_action: None,
        });

    Some(ReminderPlan {
        month,
        tier,
        kind,
        tokens,
        message,
    })
}

pub async fn deliver_reminders(
    messenger: &dyn PushMessenger,
    plan: &ReminderPlan,
) -> MulticastReceipt {
    send_multicast(messenger, &plan.tokens, &plan.message).await
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderReport {
    pub month: MembershipMonth,
    pub tier: ReminderTier,
    pub total_recipients: usize,
    pub receipt: MulticastReceipt,
}

/// Remind every unpaid member. Push and log failures are recorded, not raised;
/// only a failed member lookup is an error.
pub async fn send_fee_reminders(
    state: &AppState,
    kind: ReminderKind,
    source: LogSource,
) -> Result<Option<ReminderReport>> {
    let today = state.settings.now().date_naive();
    tracing::info!("Fee reminder run {} from {} on {}", kind, source.as_str(), today);

    let table_name = &state.settings.table_name;
    let roster = members::list_by_role(&state.dynamo_client, table_name, Role::Member).await?;

    let Some(plan) = plan_reminders(&roster, today, kind, &state.settings) else {
        tracing::info!("No unpaid members to notify");
        return Ok(None);
    };

    tracing::info!(
        "Found {} unpaid members for {}, tier {:?}",
        plan.tokens.len(),
        plan.month,
        plan.tier
    );

    let receipt = deliver_reminders(state.messenger.as_ref(), &plan).await;
    tracing::info!(
        "Sent {} reminders, {} failed",
        receipt.success_count,
        receipt.failure_count
    );

    let entry = NotificationLogEntry {
        reminder_type: kind,
        source,
        month: plan.month,
        is_overdue: plan.tier.is_overdue(),
        total_recipients: plan.tokens.len(),
        success_count: receipt.success_count,
        failure_count: receipt.failure_count,
    };
    if let Err(e) = record_notification_log(&state.dynamo_client, table_name, &entry).await {
        tracing::error!("Failed to record notification log: {}", e);
    }

    Ok(Some(ReminderReport {
        month: plan.month,
        tier: plan.tier,
        total_recipients: plan.tokens.len(),
        receipt,
    }))
}
