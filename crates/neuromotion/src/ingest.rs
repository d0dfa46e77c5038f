//! Inbound sample envelope parsing and dispatch.
//!
//! The browser streams envelopes of the shape
//! `{"type": "landmarkData" | "emgData", "recordingData": {"time": f64, ...}}`
//! over a long-lived WebSocket. Each message is handled to completion before
//! the next is read, so buffer append order equals arrival order. A bad
//! message is a per-message error: it is logged by the caller and skipped,
//! never a reason to tear down the connection.

use crate::session::{RecordingSession, Sample, SampleKind, SessionError};
use thiserror::Error;

/// Per-message ingestion errors.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Not JSON, or missing/ill-typed envelope fields.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Well-formed envelope with a `type` this server does not know.
    #[error("unrecognized sample type {0:?}")]
    UnknownKind(String),

    /// The session refused the sample (epoch unset).
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A validated inbound envelope.
#[derive(Debug)]
pub struct Envelope {
    pub kind: SampleKind,
    pub sample: Sample,
}

/// Parse and validate one serialized envelope.
pub fn parse_envelope(text: &str) -> Result<Envelope, IngestError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| IngestError::Malformed(e.to_string()))?;

    let kind_str = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IngestError::Malformed("missing \"type\" field".to_string()))?;

    let kind = match kind_str {
        "landmarkData" => SampleKind::Landmark,
        "emgData" => SampleKind::Emg,
        other => return Err(IngestError::UnknownKind(other.to_string())),
    };

    let data = value
        .get("recordingData")
        .cloned()
        .ok_or_else(|| IngestError::Malformed("missing \"recordingData\" field".to_string()))?;

    let sample: Sample = serde_json::from_value(data)
        .map_err(|e| IngestError::Malformed(format!("bad recordingData: {e}")))?;

    Ok(Envelope { kind, sample })
}

/// Parse one message and append its sample to the session buffer.
///
/// Returns the kind that was buffered so the caller can log it.
pub fn ingest_message(
    session: &mut RecordingSession,
    text: &str,
) -> Result<SampleKind, IngestError> {
    let envelope = parse_envelope(text)?;
    session.ingest(envelope.kind, envelope.sample)?;
    Ok(envelope.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_landmark_envelope() {
        let text = r#"{"type": "landmarkData", "recordingData": {"time": 12.5, "landmarks": [[0.1, 0.2, 0.3]]}}"#;
        let envelope = parse_envelope(text).unwrap();
        assert_eq!(envelope.kind, SampleKind::Landmark);
        assert_eq!(envelope.sample.time, 12.5);
        assert!(envelope.sample.payload.contains_key("landmarks"));
    }

    #[test]
    fn test_parse_emg_envelope() {
        let text = r#"{"type": "emgData", "recordingData": {"time": 3.0, "channels": [1, 2]}}"#;
        let envelope = parse_envelope(text).unwrap();
        assert_eq!(envelope.kind, SampleKind::Emg);
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_envelope("{not json").unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
    }

    #[test]
    fn test_unknown_type() {
        let text = r#"{"type": "gyroData", "recordingData": {"time": 1.0}}"#;
        let err = parse_envelope(text).unwrap_err();
        assert!(matches!(err, IngestError::UnknownKind(kind) if kind == "gyroData"));
    }

    #[test]
    fn test_missing_time() {
        let text = r#"{"type": "emgData", "recordingData": {"channels": [1]}}"#;
        let err = parse_envelope(text).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
    }

    #[test]
    fn test_missing_recording_data() {
        let err = parse_envelope(r#"{"type": "emgData"}"#).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
    }

    #[test]
    fn test_ingest_before_start_is_session_error() {
        let mut session = RecordingSession::new();
        let text = r#"{"type": "emgData", "recordingData": {"time": 1.0}}"#;
        let err = ingest_message(&mut session, text).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Session(SessionError::EpochUnset)
        ));
    }

    #[test]
    fn test_bad_message_between_valid_ones_does_not_interrupt() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();

        let messages = [
            r#"{"type": "landmarkData", "recordingData": {"time": 1.0}}"#,
            r#"{"type": "bogusData", "recordingData": {"time": 2.0}}"#,
            r#"{"type": "landmarkData", "recordingData": {"time": 3.0}}"#,
        ];

        let buffered: Vec<_> = messages
            .iter()
            .filter_map(|m| ingest_message(&mut session, m).ok())
            .collect();

        assert_eq!(buffered.len(), 2);
        let record = session.snapshot();
        let times: Vec<f64> = record.landmark_data.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![1.0, 3.0]);
        assert!(record.emg_data.is_empty());
    }
}
