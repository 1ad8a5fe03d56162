// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record file format.
//!
//! One captured delivery is one JSON file:
//!
//! ```text
//! {
//!   "Timestamp": "2025-03-14 09:26:53.589",
//!   "MessageBody": "<UTF-8 text>",
//!   "MessageHeaders": { "exchange_name": "orders", "routing_keys": ["eu"], ... }
//! }
//! ```
//!
//! Files are named `message_<yyyy-MM-dd_HH-mm-ss-fff>_<00-99>.json`.

pub mod json;

pub use json::{decode, encode, FormatError};

use crate::value::HeaderMap;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Timestamp layout stored inside a record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Timestamp layout used in record filenames.
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%3f";

/// Record file extension.
pub const RECORD_EXTENSION: &str = "json";

/// A captured firehose message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Capture time, millisecond precision.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// Message body as text.
    #[serde(rename = "MessageBody")]
    pub body: String,

    /// Normalized message headers.
    #[serde(rename = "MessageHeaders")]
    pub headers: HeaderMap,
}

impl MessageRecord {
    /// Build a record stamped with `at`.
    pub fn new<Tz>(at: &DateTime<Tz>, body: impl Into<String>, headers: HeaderMap) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            body: body.into(),
            headers,
        }
    }
}

/// Filename for a record captured at `at` with the given counter value.
pub fn record_filename<Tz>(at: &DateTime<Tz>, counter: u8) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "message_{}_{:02}.{}",
        at.format(FILENAME_TIMESTAMP_FORMAT),
        counter,
        RECORD_EXTENSION
    )
}

/// Check whether a store entry looks like a record file.
pub fn is_record_file(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == RECORD_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn instant() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_milli_opt(9, 26, 53, 589))
            .expect("valid date")
            .and_utc()
    }

    #[test]
    fn test_record_timestamp_format() {
        let record = MessageRecord::new(&instant(), "hello", HeaderMap::new());
        assert_eq!(record.timestamp, "2025-03-14 09:26:53.589");
    }

    #[test]
    fn test_record_filename() {
        assert_eq!(
            record_filename(&instant(), 7),
            "message_2025-03-14_09-26-53-589_07.json"
        );
        assert_eq!(
            record_filename(&instant(), 99),
            "message_2025-03-14_09-26-53-589_99.json"
        );
    }

    #[test]
    fn test_is_record_file() {
        assert!(is_record_file("message_2025-03-14_09-26-53-589_07.json"));
        assert!(!is_record_file("notes.txt"));
        assert!(!is_record_file("json"));
    }
}
