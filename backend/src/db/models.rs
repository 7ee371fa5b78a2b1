use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => Err(format!("unknown plan `{other}`")),
        }
    }
}

/// key: user-model -> billing customer keyed account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Billing customer id.
    pub id: String,
    pub email: String,
    pub plan: Plan,
    pub subscription_ref: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_pro(&self) -> bool {
        self.plan == Plan::Pro
    }
}

/// Input to `RecordStore::upsert_user`. `created_at` only applies on first insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub plan: Plan,
    pub subscription_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<User> for NewUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            plan: user.plan,
            subscription_ref: user.subscription_ref,
            created_at: Some(user.created_at),
        }
    }
}

/// key: usage-model -> append-only generation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: i64,
    pub user_id: Option<String>,
    pub subject_url: String,
    pub payload_snapshot: Option<String>,
    pub tone_label: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUsage {
    pub user_id: Option<String>,
    pub subject_url: String,
    pub payload_snapshot: Option<String>,
    pub tone_label: Option<String>,
}

/// Current time truncated to the millisecond precision both backings persist.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
