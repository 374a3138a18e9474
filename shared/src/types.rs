use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::reminders::ReminderKind;

// ========== MONTH ==========
/// Calendar month a fee covers, written `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MembershipMonth {
    year: i32,
    month: u32,
}

impl MembershipMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (0..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MembershipMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MembershipMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(format!("expected YYYY-MM, got {:?}", s));
        }
        let year: i32 = year.parse().map_err(|_| format!("invalid year in {:?}", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in {:?}", s))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in {:?}", s))
    }
}

impl TryFrom<String> for MembershipMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MembershipMonth> for String {
    fn from(value: MembershipMonth) -> Self {
        value.to_string()
    }
}

// ========== MEMBER ==========
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MemberStatus::Active),
            "inactive" => Some(MemberStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Member {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub membership_id: Option<String>,
    pub role: Role,
    /// Cached; recomputed from `last_payment_month` by the monthly guard
    pub status: MemberStatus,
    pub last_payment_month: Option<MembershipMonth>,
    pub push_token: Option<String>,
    pub join_date: Option<String>,
    pub total_paid: f64,
}

impl Member {
    pub fn has_paid_for(&self, month: MembershipMonth) -> bool {
        self.last_payment_month == Some(month)
    }

    /// Registered push token, ignoring blank values
    pub fn push_token(&self) -> Option<&str> {
        self.push_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub membership_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateMemberResponse {
    pub success: bool,
    pub uid: String,
}

// ========== PAYMENT ==========
pub const PAYMENT_STATUS_SUCCESS: &str = "success";

/// Payment written by the upstream payment flow; already validated
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub user_id: String,
    pub amount: f64,
    pub status: String,
}

impl PaymentRecord {
    pub fn is_success(&self) -> bool {
        self.status == PAYMENT_STATUS_SUCCESS
    }
}

// ========== NOTIFICATION TRIGGER ==========
pub const TRIGGER_TYPE_MANUAL_REMINDER: &str = "MANUAL_REMINDER";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NotificationTrigger {
    pub trigger_id: String,
    pub user_id: Option<String>,
    pub push_token: Option<String>,
    #[serde(rename = "type")]
    pub trigger_type: String,
}

// ========== REMINDERS ==========
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRemindersRequest {
    #[serde(alias = "reminderType")]
    pub reminder_type: Option<ReminderKind>,
}
