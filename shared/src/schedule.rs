//! Jobs started by EventBridge rules. Each rule passes a constant JSON input:
//!
//! | rule (Asia/Kolkata)  | input |
//! |----------------------|-------|
//! | `0 9 * * *`          | `{"job":"fee_reminders","reminder_type":"DAILY_MORNING"}` |
//! | `0 18 * * *`         | `{"job":"fee_reminders","reminder_type":"DAILY_EVENING"}` |
//! | `0 10 1 * *`         | `{"job":"fee_reminders","reminder_type":"NEW_MONTH"}` |
//! | `0 10 10 * *`        | `{"job":"fee_reminders","reminder_type":"OVERDUE"}` |
//! | `0 0 10 * *`         | `{"job":"membership_guard"}` |

use serde::Deserialize;

use crate::error::Result;
use crate::membership::run_membership_guard;
use crate::notification_log::LogSource;
use crate::reminders::{send_fee_reminders, ReminderKind};
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum ScheduledJob {
    MembershipGuard,
    FeeReminders { reminder_type: ReminderKind },
}

pub async fn run_scheduled_job(state: &AppState, job: &ScheduledJob) -> Result<()> {
    match job {
        ScheduledJob::MembershipGuard => {
            run_membership_guard(state, state.settings.now()).await?;
        }
        ScheduledJob::FeeReminders { reminder_type } => {
            send_fee_reminders(state, *reminder_type, LogSource::Scheduler).await?;
        }
    }
    Ok(())
}
