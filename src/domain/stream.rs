use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Cents;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamDirection {
    Inflow,
    Outflow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamFrequency {
    Weekly,
    Biweekly,
    SemiMonthly,
    Monthly,
    Annually,
    Unknown,
}

impl StreamFrequency {
    /// Maps a feed-reported frequency label; anything unrecognized is
    /// `Unknown` and contributes nothing to suggestions.
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("").to_uppercase().as_str() {
            "WEEKLY" => StreamFrequency::Weekly,
            "BIWEEKLY" => StreamFrequency::Biweekly,
            "SEMI_MONTHLY" => StreamFrequency::SemiMonthly,
            "MONTHLY" => StreamFrequency::Monthly,
            "ANNUALLY" => StreamFrequency::Annually,
            _ => StreamFrequency::Unknown,
        }
    }
}

impl fmt::Display for StreamFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StreamFrequency::Weekly => "Weekly",
            StreamFrequency::Biweekly => "Biweekly",
            StreamFrequency::SemiMonthly => "Semi-monthly",
            StreamFrequency::Monthly => "Monthly",
            StreamFrequency::Annually => "Annually",
            StreamFrequency::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// One detected recurring pattern per linked item, keyed by the feed's
/// stream id. Upserted on each refresh; streams absent from the latest
/// refresh are marked inactive, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringStream {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub feed_stream_id: String,
    pub direction: StreamDirection,
    pub description: String,
    pub merchant_name: Option<String>,
    pub frequency: StreamFrequency,
    pub avg_amount_cents: Cents,
    pub last_amount_cents: Cents,
    pub predicted_next_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// User-customizable; set only on create, never overwritten on refresh.
    pub counts_toward_income: bool,
    pub counts_toward_fixed: bool,
    pub user_amount_override_cents: Option<Cents>,
}

impl RecurringStream {
    /// Amount used for suggested totals: user override when present.
    pub fn suggestion_amount_cents(&self) -> Cents {
        self.user_amount_override_cents
            .unwrap_or(self.avg_amount_cents)
    }
}
