use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    New,
    Responded,
    Closed,
}

impl InquiryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InquiryStatus::New => "new",
            InquiryStatus::Responded => "responded",
            InquiryStatus::Closed => "closed",
        }
    }

    /// States an inquiry may move into `self` from.
    pub fn reachable_from(self) -> &'static [&'static str] {
        match self {
            InquiryStatus::New => &[],
            InquiryStatus::Responded => &["new"],
            InquiryStatus::Closed => &["new", "responded"],
        }
    }
}

impl FromStr for InquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(InquiryStatus::New),
            "responded" => Ok(InquiryStatus::Responded),
            "closed" => Ok(InquiryStatus::Closed),
            other => Err(format!("unknown inquiry status {other:?}")),
        }
    }
}

/// A buyer's question about a listing. List queries join in the listing
/// title and the buyer's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: i64,
    pub property_id: i64,
    pub buyer_id: i64,
    pub message: String,
    pub status: InquiryStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub property_title: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    #[serde(default)]
    pub property_id: Option<i64>,
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub sender_name: Option<String>,
}
