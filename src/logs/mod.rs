//! Log aggregation job.
//!
//! Log lines (`timestamp,level,component,message`) are imported into a store,
//! then a tasklet counts them per level and per day.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::item::memory::Entity;

pub mod generator;
pub mod job;
pub mod store;
pub mod tasklet;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub level: String,
    pub component: String,
    pub message: String,
}

impl Entity for LogEntry {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// Number of log entries of one level on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub id: Option<i64>,
    pub level: String,
    pub log_date: NaiveDate,
    pub count: u32,
}

impl Entity for LogSummary {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
