// SLogViz - core/eventlog.rs
//
// Windows event-log records to log entries. The app layer decodes the binary
// container with the `evtx` crate and hands each record over as a JSON
// document; this module extracts the `Event.System` fields.
//
// Attributes appear either nested (`"Provider": {"#attributes": {...}}`) or
// flattened (`"Provider_attributes": {...}`) depending on decoder settings;
// both are accepted.

use crate::core::model::LogEntry;
use crate::core::timestamp::parse_event_time;
use crate::util::error::RecordError;
use serde_json::Value;

/// Convert one decoded event document.
///
/// `record_id` is the id from the record header, used when the document has
/// no usable `EventRecordID`. Returns the reason for records missing a
/// required field; the caller counts them and moves on.
pub fn entry_from_event(
    doc: &Value,
    record_id: u64,
    origin: &str,
) -> Result<LogEntry, RecordError> {
    let system = doc
        .get("Event")
        .and_then(|e| e.get("System"))
        .ok_or(RecordError::MissingField("Event.System"))?;

    let created = attribute(system, "TimeCreated", "SystemTime")
        .and_then(scalar_text)
        .ok_or(RecordError::MissingField("TimeCreated/SystemTime"))?;
    let timestamp = parse_event_time(&created).ok_or(RecordError::BadTime { raw: created })?;

    let sequence_id = system
        .get("EventRecordID")
        .and_then(element_text)
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(record_id);
    if sequence_id == 0 {
        return Err(RecordError::NonPositiveId { id: 0 });
    }

    let event_id = system
        .get("EventID")
        .and_then(element_text)
        .ok_or(RecordError::MissingField("EventID"))?;

    let computer = system
        .get("Computer")
        .and_then(element_text)
        .ok_or(RecordError::MissingField("Computer"))?;

    // Provider is optional; events without one get an empty source.
    let provider = attribute(system, "Provider", "Name")
        .and_then(scalar_text)
        .unwrap_or_default();

    Ok(LogEntry {
        sequence_id,
        origin: origin.to_string(),
        source: provider,
        timestamp,
        message: event_id,
        raw: doc.to_string(),
        hostname: Some(computer),
    })
}

/// Look up `element`'s attribute `name` in either attribute layout.
fn attribute<'a>(parent: &'a Value, element: &str, name: &str) -> Option<&'a Value> {
    parent
        .get(element)
        .and_then(|e| e.get("#attributes"))
        .and_then(|a| a.get(name))
        .or_else(|| {
            parent
                .get(format!("{element}_attributes"))
                .and_then(|a| a.get(name))
        })
}

/// Text content of an element: a bare scalar, or the `#text` of an element
/// that also carries attributes (`EventID` with `Qualifiers`).
fn element_text(v: &Value) -> Option<String> {
    match v {
        Value::Object(map) => map.get("#text").and_then(scalar_text),
        other => scalar_text(other),
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timestamp::format_timestamp;
    use serde_json::json;

    fn nested_doc() -> Value {
        json!({
            "Event": {
                "#attributes": {"xmlns": "http://schemas.microsoft.com/win/2004/08/events/event"},
                "System": {
                    "Provider": {"#attributes": {"Name": "Microsoft-Windows-Security-Auditing"}},
                    "EventID": 4624,
                    "TimeCreated": {"#attributes": {"SystemTime": "2016-07-08T18:12:51.681640Z"}},
                    "EventRecordID": 1107,
                    "Computer": "WIN-HOST01"
                },
                "EventData": {"TargetUserName": "alice"}
            }
        })
    }

    #[test]
    fn test_nested_attributes() {
        let e = entry_from_event(&nested_doc(), 99, "Security.evtx").unwrap();
        assert_eq!(e.sequence_id, 1107);
        assert_eq!(e.message, "4624");
        assert_eq!(e.source, "Microsoft-Windows-Security-Auditing");
        assert_eq!(e.hostname.as_deref(), Some("WIN-HOST01"));
        assert_eq!(
            format_timestamp(&e.timestamp),
            "2016-07-08T18:12:51.681640+00:00"
        );
        assert!(e.raw.contains("alice"));
    }

    #[test]
    fn test_flattened_attributes_and_qualified_event_id() {
        let doc = json!({
            "Event": {
                "System": {
                    "Provider_attributes": {"Name": "Service Control Manager"},
                    "EventID": {"#attributes": {"Qualifiers": 16384}, "#text": 7036},
                    "TimeCreated_attributes": {"SystemTime": "2016-07-08 18:12:51.681640"},
                    "EventRecordID": "12",
                    "Computer": "srv"
                }
            }
        });
        let e = entry_from_event(&doc, 1, "System.evtx").unwrap();
        assert_eq!(e.message, "7036");
        assert_eq!(e.source, "Service Control Manager");
        assert_eq!(e.sequence_id, 12);
    }

    #[test]
    fn test_missing_provider_gives_empty_source() {
        let mut doc = nested_doc();
        doc["Event"]["System"]
            .as_object_mut()
            .unwrap()
            .remove("Provider");
        let e = entry_from_event(&doc, 1, "x.evtx").unwrap();
        assert_eq!(e.source, "");
    }

    #[test]
    fn test_record_header_id_used_as_fallback() {
        let mut doc = nested_doc();
        doc["Event"]["System"]
            .as_object_mut()
            .unwrap()
            .remove("EventRecordID");
        assert_eq!(entry_from_event(&doc, 42, "x.evtx").unwrap().sequence_id, 42);
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        for (field, missing) in [
            ("TimeCreated", "TimeCreated/SystemTime"),
            ("EventID", "EventID"),
            ("Computer", "Computer"),
        ] {
            let mut doc = nested_doc();
            doc["Event"]["System"].as_object_mut().unwrap().remove(field);
            let err = entry_from_event(&doc, 1, "x.evtx").unwrap_err();
            assert_eq!(err, RecordError::MissingField(missing), "{field} should be required");
        }
        assert_eq!(
            entry_from_event(&json!({"Event": {}}), 1, "x.evtx").unwrap_err(),
            RecordError::MissingField("Event.System")
        );
    }

    #[test]
    fn test_bad_time_and_zero_id_rejected() {
        let mut doc = nested_doc();
        doc["Event"]["System"]["TimeCreated"]["#attributes"]["SystemTime"] = json!("yesterday");
        assert_eq!(
            entry_from_event(&doc, 1, "x.evtx").unwrap_err(),
            RecordError::BadTime {
                raw: "yesterday".to_string()
            }
        );

        let mut doc = nested_doc();
        doc["Event"]["System"]
            .as_object_mut()
            .unwrap()
            .remove("EventRecordID");
        assert_eq!(
            entry_from_event(&doc, 0, "x.evtx").unwrap_err(),
            RecordError::NonPositiveId { id: 0 }
        );
    }
}
