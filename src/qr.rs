//! Student QR payloads.
//!
//! A payload is a small JSON object identifying a student. Nothing is signed
//! and nothing expires, so a payload is only as good as the roster check the
//! scanner does afterwards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const QR_TYPE: &str = "attendance";
pub const QR_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub student_id: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: Option<String>,
}

pub fn generate_student_qr(student_id: &str) -> String {
    json!({
        "studentId": student_id,
        "timestamp": Utc::now().timestamp_millis(),
        "type": QR_TYPE,
        "version": QR_VERSION,
    })
    .to_string()
}

/// Parses a scanned payload. Returns `None` for anything that isn't a
/// JSON object with `type == "attendance"`, a non-empty string `studentId`
/// and a numeric `timestamp`.
pub fn parse_qr(raw: &str) -> Option<QrPayload> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("Rejected QR payload: {}", e);
            return None;
        }
    };
    let object = value.as_object()?;
    if object.get("type").and_then(Value::as_str) != Some(QR_TYPE) {
        return None;
    }
    let student_id = object
        .get("studentId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?;
    let timestamp = object.get("timestamp").filter(|t| t.is_number())?;
    let timestamp = timestamp
        .as_i64()
        .or_else(|| timestamp.as_f64().map(|millis| millis as i64))?;
    let version = object
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(QrPayload {
        student_id: student_id.to_string(),
        timestamp,
        kind: QR_TYPE.to_string(),
        version,
    })
}

pub fn validate_qr_code(raw: &str) -> bool {
    parse_qr(raw).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_payload_validates() {
        for id in ["S001", "student2", "a", "名前"] {
            let raw = generate_student_qr(id);
            assert!(validate_qr_code(&raw), "{}", raw);
            let payload = parse_qr(&raw).unwrap();
            assert_eq!(payload.student_id, id);
            assert_eq!(payload.version.as_deref(), Some(QR_VERSION));
        }
    }

    #[test]
    fn generated_payload_shape() {
        let value: Value = serde_json::from_str(&generate_student_qr("X")).unwrap();
        assert_eq!(value["type"], "attendance");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["studentId"], "X");
        assert!(value["timestamp"].is_i64());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(!validate_qr_code(""));
        assert!(!validate_qr_code("not json"));
        assert!(!validate_qr_code("{\"studentId\":"));
        assert!(!validate_qr_code("null"));
        assert!(!validate_qr_code("42"));
        assert!(!validate_qr_code("[\"attendance\"]"));
        assert!(!validate_qr_code("\"attendance\""));
    }

    #[test]
    fn rejects_wrong_type_or_missing_fields() {
        assert!(!validate_qr_code(
            r#"{"studentId":"S1","timestamp":1,"type":"payment"}"#
        ));
        assert!(!validate_qr_code(r#"{"studentId":"S1","timestamp":1}"#));
        assert!(!validate_qr_code(r#"{"timestamp":1,"type":"attendance"}"#));
        assert!(!validate_qr_code(
            r#"{"studentId":"","timestamp":1,"type":"attendance"}"#
        ));
        assert!(!validate_qr_code(
            r#"{"studentId":7,"timestamp":1,"type":"attendance"}"#
        ));
        assert!(!validate_qr_code(
            r#"{"studentId":"S1","timestamp":"1","type":"attendance"}"#
        ));
        assert!(!validate_qr_code(r#"{"studentId":"S1","type":"attendance"}"#));
    }

    #[test]
    fn accepts_minimal_payload_without_version() {
        let payload = parse_qr(r#"{"studentId":"S1","timestamp":1.5,"type":"attendance"}"#)
            .unwrap();
        assert_eq!(payload.timestamp, 1);
        assert_eq!(payload.version, None);
    }
}
