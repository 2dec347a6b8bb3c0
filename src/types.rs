use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored row of the `btc_blocks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BlockRecord {
    pub id: i32,
    pub hash: String,
    pub number: i64,
    pub timestamp: i64,
}

/// A fetched block that passed timestamp validation and is ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub hash: String,
    pub number: i64,
    pub timestamp: i64,
}

/// Wire shape returned by the upstream latest-block endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamBlock {
    pub hash: String,
    pub height: i64,
    pub time: BlockTime,
}

/// The upstream `time` field: either a datetime string or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BlockTime {
    Text(String),
    Millis(i64),
}

impl BlockTime {
    /// Convert to epoch milliseconds. `None` when the value is not a
    /// recognizable datetime.
    pub fn to_epoch_millis(&self) -> Option<i64> {
        match self {
            BlockTime::Millis(ms) => Some(*ms),
            BlockTime::Text(s) => parse_datetime_millis(s),
        }
    }
}

// RFC 3339 first; naive datetimes and bare dates are taken as UTC.
fn parse_datetime_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}
