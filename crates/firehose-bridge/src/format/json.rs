// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON codec for [`MessageRecord`].

use super::MessageRecord;
use crate::value::HeaderMap;
use serde::Deserialize;
use thiserror::Error;

/// Record codec errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Text is not a well-formed record object.
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Record has no `MessageBody`.
    #[error("malformed record: missing MessageBody")]
    MissingBody,
}

// Lenient mirror of MessageRecord: only the body is mandatory.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<String>,

    #[serde(rename = "MessageBody", default)]
    body: Option<String>,

    #[serde(rename = "MessageHeaders", default)]
    headers: Option<HeaderMap>,
}

/// Encode a record as indented JSON.
pub fn encode(record: &MessageRecord) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Decode a record.
///
/// Missing or null `MessageHeaders` decode to an empty map.
pub fn decode(text: &str) -> Result<MessageRecord, FormatError> {
    let raw: RawRecord = serde_json::from_str(text)?;
    let body = raw.body.ok_or(FormatError::MissingBody)?;

    Ok(MessageRecord {
        timestamp: raw.timestamp.unwrap_or_default(),
        body,
        headers: raw.headers.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NormalizedValue;
    use std::collections::BTreeMap;

    fn sample_record() -> MessageRecord {
        let mut headers = HeaderMap::new();
        headers.insert("exchange_name".into(), "orders".into());
        headers.insert("routing_keys".into(), vec!["eu.created", "us.created"].into());
        headers.insert("redelivered".into(), false.into());
        headers.insert("node".into(), "rabbit@broker-1".into());
        headers.insert(
            "properties".into(),
            NormalizedValue::Map(BTreeMap::from([
                ("delivery_mode".to_string(), 2.into()),
                ("headers".to_string(), NormalizedValue::Map(BTreeMap::new())),
                ("correlation_id".to_string(), NormalizedValue::Null),
            ])),
        );

        MessageRecord {
            timestamp: "2025-03-14 09:26:53.589".into(),
            body: "{\"order\": 17, \"note\": \"ünïcode\"}".into(),
            headers,
        }
    }

    #[test]
    fn test_round_trip() {
        let record = sample_record();
        let text = encode(&record).expect("encode");
        let decoded = decode(&text).expect("decode");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_encode_is_indented_with_fixed_names() {
        let text = encode(&sample_record()).expect("encode");
        assert!(text.contains("\n  \"Timestamp\": \"2025-03-14 09:26:53.589\""));
        assert!(text.contains("\"MessageBody\""));
        assert!(text.contains("\"MessageHeaders\""));
    }

    #[test]
    fn test_missing_headers_is_empty_map() {
        let record = decode(r#"{"Timestamp": "t", "MessageBody": "b"}"#).expect("decode");
        assert!(record.headers.is_empty());

        let record = decode(r#"{"MessageBody": "b", "MessageHeaders": null}"#).expect("decode");
        assert!(record.headers.is_empty());
        assert_eq!(record.timestamp, "");
    }

    #[test]
    fn test_missing_body_is_malformed() {
        let err = decode(r#"{"Timestamp": "t", "MessageHeaders": {}}"#).unwrap_err();
        assert!(matches!(err, FormatError::MissingBody));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(decode("{not json"), Err(FormatError::Malformed(_))));
        assert!(matches!(decode("[1, 2]"), Err(FormatError::Malformed(_))));
        assert!(matches!(
            decode(r#"{"MessageBody": 5}"#),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_external_record() {
        let text = r#"{
  "Timestamp": "2024-11-02 17:45:01.003",
  "MessageBody": "ping",
  "MessageHeaders": {
    "exchange_name": "",
    "routing_keys": ["jobs"],
    "properties": {"priority": 0}
  }
}"#;
        let record = decode(text).expect("decode");
        assert_eq!(record.body, "ping");
        assert_eq!(record.headers["exchange_name"], NormalizedValue::from(""));
        assert_eq!(
            record.headers["routing_keys"].string_list(),
            Some(vec!["jobs".to_string()])
        );
    }
}
