use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::action::{Intent, LineItem};
use crate::domain::business::BusinessId;
use crate::domain::call::{CallId, TerminationReason};

/// Identifier assigned by the back-office store on create.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Started,
    Completed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLogRecord {
    pub call_id: CallId,
    pub business_id: BusinessId,
    pub caller_number: String,
    pub call_date: DateTime<Utc>,
    pub duration_secs: i64,
    pub transcript: String,
    pub intent: Intent,
    pub status: CallStatus,
    pub end_reason: TerminationReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub call_id: CallId,
    pub business_id: BusinessId,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub pickup_time: String,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub call_id: CallId,
    pub business_id: BusinessId,
    pub customer_name: String,
    pub customer_phone: String,
    pub service: String,
    pub date_time: String,
    pub status: BookingStatus,
}
