use chrono::{DateTime, FixedOffset, Utc};
use std::env;
use std::str::FromStr;

use crate::error::{FeeError, Result};

const DEFAULT_TABLE_NAME: &str = "feeguard";
const DEFAULT_FEE_AMOUNT: f64 = 100.0;
const DEFAULT_DUE_DAY: u32 = 10;
// Asia/Kolkata, no DST
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
const DEFAULT_WEB_APP_URL: &str = "https://neethiyaithedi-a2640.web.app";
const DEFAULT_ORG_NAME: &str = "Neethiyaithedi";

/// Runtime settings read from the Lambda environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub table_name: String,
    pub user_pool_id: Option<String>,
    pub platform_application_arn: Option<String>,
    pub fee_amount: f64,
    pub due_day: u32,
    pub utc_offset: FixedOffset,
    pub web_app_url: String,
    pub org_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            user_pool_id: None,
            platform_application_arn: None,
            fee_amount: DEFAULT_FEE_AMOUNT,
            due_day: DEFAULT_DUE_DAY,
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .expect("default offset is within a day"),
            web_app_url: DEFAULT_WEB_APP_URL.to_string(),
            org_name: DEFAULT_ORG_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let due_day: u32 = parse_or(&lookup, "FEE_DUE_DAY", defaults.due_day)?;
        if !(1..=28).contains(&due_day) {
            return Err(FeeError::Config(format!(
                "FEE_DUE_DAY must be between 1 and 28, got {}",
                due_day
            )));
        }

        let fee_amount: f64 = parse_or(&lookup, "FEE_AMOUNT", defaults.fee_amount)?;
        if !fee_amount.is_finite() || fee_amount <= 0.0 {
            return Err(FeeError::Config(format!(
                "FEE_AMOUNT must be positive, got {}",
                fee_amount
            )));
        }

        let offset_minutes: i32 =
            parse_or(&lookup, "ORG_UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            FeeError::Config(format!("ORG_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))
        })?;

        Ok(Self {
            table_name: lookup("TABLE_NAME").unwrap_or(defaults.table_name),
            user_pool_id: lookup("COGNITO_USER_POOL_ID").filter(|s| !s.is_empty()),
            platform_application_arn: lookup("SNS_PLATFORM_APPLICATION_ARN")
                .filter(|s| !s.is_empty()),
            fee_amount,
            due_day,
            utc_offset,
            web_app_url: lookup("WEB_APP_URL").unwrap_or(defaults.web_app_url),
            org_name: lookup("ORG_NAME").unwrap_or(defaults.org_name),
        })
    }

    /// Current wall-clock time in the organization's time zone
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| FeeError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
