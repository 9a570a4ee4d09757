//! Rotated log file names
//!
//! ```text
//! hourly:        <stem>.<YYYY-MM-DD>.<HH>.<index>.log
//! daily / none:  <stem>.<YYYY-MM-DD>.<index>.log
//! ```

use super::rolling_file::TimeGranularity;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub const LOG_EXTENSION: &str = "log";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Position of one rotated file in the retention order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    path: PathBuf,
    day: NaiveDate,
    hour: Option<u32>,
    index: u32,
}

impl FileMeta {
    pub fn new(path: impl Into<PathBuf>, day: NaiveDate, hour: Option<u32>, index: u32) -> Self {
        Self {
            path: path.into(),
            day,
            hour,
            index,
        }
    }

    /// Parse `file_name` from `directory` as a rotated file of `stem`.
    ///
    /// Returns `None` for anything that is not a rotated file under the
    /// given granularity, including the active `<stem>.log` itself.
    pub fn parse(
        directory: &Path,
        file_name: &str,
        stem: &str,
        granularity: TimeGranularity,
    ) -> Option<Self> {
        let segments: Vec<&str> = file_name.split('.').collect();
        if segments.first() != Some(&stem) || segments.last() != Some(&LOG_EXTENSION) {
            return None;
        }

        let (day, hour, index) = match (granularity, segments.as_slice()) {
            (TimeGranularity::Hour, [_, day, hour, index, _]) => (*day, Some(*hour), *index),
            (TimeGranularity::None | TimeGranularity::Day, [_, day, index, _]) => {
                (*day, None, *index)
            }
            _ => return None,
        };

        let day = NaiveDate::parse_from_str(day, DAY_FORMAT).ok()?;
        let hour = match hour {
            Some(hour) => Some(parse_hour(hour)?),
            None => None,
        };
        let index = parse_number(index)?;

        Some(Self::new(directory.join(file_name), day, hour, index))
    }

    /// File name for a rotated file in the given bucket
    pub fn file_name(stem: &str, day: NaiveDate, hour: Option<u32>, index: u32) -> String {
        match hour {
            Some(hour) => format!(
                "{}.{}.{:02}.{}.{}",
                stem,
                day.format(DAY_FORMAT),
                hour,
                index,
                LOG_EXTENSION
            ),
            None => format!(
                "{}.{}.{}.{}",
                stem,
                day.format(DAY_FORMAT),
                index,
                LOG_EXTENSION
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn hour(&self) -> Option<u32> {
        self.hour
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn in_bucket(&self, day: NaiveDate, hour: Option<u32>) -> bool {
        self.day == day && self.hour == hour
    }

    /// Retention order, oldest first: day and hour ascending, then index
    /// descending.
    pub fn cmp_age(&self, other: &Self) -> Ordering {
        self.day
            .cmp(&other.day)
            .then(self.hour.cmp(&other.hour))
            .then(other.index.cmp(&self.index))
    }
}

fn parse_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_hour(text: &str) -> Option<u32> {
    parse_number(text).filter(|hour| *hour < 24)
}
