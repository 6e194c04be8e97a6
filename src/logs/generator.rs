use std::cell::Cell;

use chrono::{NaiveDateTime, SubsecRound, TimeDelta, Utc};
use log::debug;
use rand::seq::IndexedRandom;

use crate::{
    BatchError,
    core::item::{ItemReader, ItemReaderResult},
};

use super::LogEntry;

pub const LEVELS: [&str; 3] = ["INFO", "ERROR", "WARN"];
pub const COMPONENTS: [&str; 5] = ["Auth", "Payment", "Order", "Database", "Notification"];
pub const MESSAGES: [&str; 5] = [
    "User logged in successfully.",
    "Payment processed successfully.",
    "Order delayed due to inventory check.",
    "Database connection lost.",
    "Invalid credentials provided.",
];

/// Reader producing a fixed number of random log entries.
///
/// Entries are spaced by `interval` starting at `start`, with level, component
/// and message drawn from [`LEVELS`], [`COMPONENTS`] and [`MESSAGES`].
pub struct RandomLogEntryReader {
    count: usize,
    produced: Cell<usize>,
    start: NaiveDateTime,
    interval: TimeDelta,
}

impl RandomLogEntryReader {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            produced: Cell::new(0),
            start: Utc::now().naive_utc().trunc_subsecs(0),
            interval: TimeDelta::seconds(5),
        }
    }

    pub fn starting_at(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn interval(mut self, interval: TimeDelta) -> Self {
        self.interval = interval;
        self
    }
}

fn pick(values: &[&'static str]) -> Result<String, BatchError> {
    values
        .choose(&mut rand::rng())
        .map(|value| value.to_string())
        .ok_or_else(|| BatchError::ItemReader("nothing to pick from".to_string()))
}

impl ItemReader<LogEntry> for RandomLogEntryReader {
    fn read(&self) -> ItemReaderResult<LogEntry> {
        let index = self.produced.get();
        if index >= self.count {
            return Ok(None);
        }

        let timestamp = i32::try_from(index)
            .ok()
            .and_then(|index| self.interval.checked_mul(index))
            .and_then(|offset| self.start.checked_add_signed(offset))
            .ok_or_else(|| {
                BatchError::ItemReader(format!(
                    "timestamp of log entry {} is out of range",
                    index
                ))
            })?;

        let entry = LogEntry {
            id: None,
            timestamp,
            level: pick(&LEVELS)?,
            component: pick(&COMPONENTS)?,
            message: pick(&MESSAGES)?,
        };
        debug!("Generated log: {:?}", entry);

        self.produced.set(index + 1);
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::TIMESTAMP_FORMAT;

    #[test]
    fn produces_the_requested_number_of_entries() {
        let reader = RandomLogEntryReader::new(3);

        let mut entries = Vec::new();
        while let Some(entry) = reader.read().unwrap() {
            entries.push(entry);
        }

        assert_eq!(entries.len(), 3);
        assert!(reader.read().unwrap().is_none());
        for entry in &entries {
            assert!(LEVELS.contains(&entry.level.as_str()));
            assert!(COMPONENTS.contains(&entry.component.as_str()));
            assert!(MESSAGES.contains(&entry.message.as_str()));
        }
    }

    #[test]
    fn timestamps_follow_the_interval() {
        let start = NaiveDateTime::parse_from_str("2025-06-23 23:59:55", TIMESTAMP_FORMAT).unwrap();
        let reader = RandomLogEntryReader::new(2)
            .starting_at(start)
            .interval(TimeDelta::seconds(5));

        let first = reader.read().unwrap().unwrap();
        let second = reader.read().unwrap().unwrap();

        assert_eq!(first.timestamp, start);
        assert_eq!(
            second.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2025-06-24 00:00:00"
        );
    }

    #[test]
    fn out_of_range_timestamp_is_a_reader_error() {
        let reader = RandomLogEntryReader::new(2).interval(TimeDelta::days(200_000_000));

        assert!(reader.read().unwrap().is_some());
        assert!(matches!(reader.read(), Err(BatchError::ItemReader(_))));
    }
}
