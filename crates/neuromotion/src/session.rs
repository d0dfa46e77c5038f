//! Recording session state machine.
//!
//! A session moves through `Idle -> Recording -> Idle`: the start signal
//! sets the epoch, samples stream in and are rebased to session-relative
//! time, and the save signal snapshots the buffer for persistence and
//! resets the session. Exactly one session is live per process; callers
//! share it behind a mutex and every mutation happens inside one lock scope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two sample streams a recording session accumulates.
///
/// Serialized names match the wire envelope `type` field and the keys of
/// the persisted record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    #[serde(rename = "landmarkData")]
    Landmark,
    #[serde(rename = "emgData")]
    Emg,
}

impl SampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Landmark => "landmarkData",
            SampleKind::Emg => "emgData",
        }
    }
}

/// One timestamped unit of landmark or EMG data.
///
/// `time` is producer-local on arrival and session-relative once buffered.
/// The payload is opaque to the session: landmark geometry and EMG channel
/// readings pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Session state machine errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A sample or save signal arrived before any start signal.
    #[error("no recording in progress: epoch is unset")]
    EpochUnset,

    /// A second start signal arrived while already recording. Overwriting
    /// the epoch would silently mis-base every sample already buffered, so
    /// the start is rejected instead.
    #[error("a recording is already in progress (epoch {epoch})")]
    AlreadyRecording { epoch: f64 },
}

/// Snapshot of a closed session, ready for persistence.
///
/// Structurally identical to the session buffer with the epoch omitted;
/// field names match the persisted record file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub landmark_data: Vec<Sample>,
    pub emg_data: Vec<Sample>,
}

impl Record {
    pub fn is_empty(&self) -> bool {
        self.landmark_data.is_empty() && self.emg_data.is_empty()
    }
}

/// The process-wide recording session: epoch plus the two sample buffers.
///
/// Buffers are append-only and insertion-ordered; arrival order is the
/// recorded temporal order. Growth is unbounded by design - a session is
/// bounded by a human start/stop workflow, not a production stream.
#[derive(Debug, Default)]
pub struct RecordingSession {
    epoch: Option<f64>,
    landmark_data: Vec<Sample>,
    emg_data: Vec<Sample>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session epoch and enter the `Recording` state.
    ///
    /// Fails with [`SessionError::AlreadyRecording`] if an epoch is already
    /// set; re-entering `Recording` requires passing through `Idle` first.
    pub fn start(&mut self, epoch: f64) -> Result<(), SessionError> {
        if let Some(current) = self.epoch {
            return Err(SessionError::AlreadyRecording { epoch: current });
        }
        self.epoch = Some(epoch);
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.epoch.is_some()
    }

    pub fn epoch(&self) -> Option<f64> {
        self.epoch
    }

    /// Rebase a producer-local timestamp to session-relative time.
    pub fn rebase(&self, time: f64) -> Result<f64, SessionError> {
        let epoch = self.epoch.ok_or(SessionError::EpochUnset)?;
        Ok(time - epoch)
    }

    /// Rebase a sample's timestamp and append it to the buffer for `kind`.
    ///
    /// Rejected samples (epoch unset) are not retained; there is no
    /// retroactive reconciliation once a start signal does arrive.
    pub fn ingest(&mut self, kind: SampleKind, mut sample: Sample) -> Result<(), SessionError> {
        sample.time = self.rebase(sample.time)?;
        match kind {
            SampleKind::Landmark => self.landmark_data.push(sample),
            SampleKind::Emg => self.emg_data.push(sample),
        }
        Ok(())
    }

    /// Buffered sample counts as (landmark, emg).
    pub fn sample_counts(&self) -> (usize, usize) {
        (self.landmark_data.len(), self.emg_data.len())
    }

    /// Clone the current buffer contents into a [`Record`].
    pub fn snapshot(&self) -> Record {
        Record {
            landmark_data: self.landmark_data.clone(),
            emg_data: self.emg_data.clone(),
        }
    }

    /// Return the session to its empty `Idle` state for reuse.
    pub fn reset(&mut self) {
        self.epoch = None;
        self.landmark_data.clear();
        self.emg_data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64) -> Sample {
        Sample {
            time,
            payload: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_rebase_is_exact() {
        let mut session = RecordingSession::new();
        session.start(100.0).unwrap();

        session.ingest(SampleKind::Landmark, sample(100.5)).unwrap();
        session.ingest(SampleKind::Emg, sample(101.0)).unwrap();

        let record = session.snapshot();
        assert_eq!(record.landmark_data[0].time, 0.5);
        assert_eq!(record.emg_data[0].time, 1.0);
    }

    #[test]
    fn test_ingest_before_start_is_rejected() {
        let mut session = RecordingSession::new();

        let err = session.ingest(SampleKind::Emg, sample(5.0)).unwrap_err();
        assert!(matches!(err, SessionError::EpochUnset));

        // The rejected sample must not appear in any later snapshot.
        session.start(0.0).unwrap();
        assert!(session.snapshot().is_empty());
    }

    #[test]
    fn test_interleaved_arrival_preserves_per_kind_order() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();

        session.ingest(SampleKind::Landmark, sample(1.0)).unwrap();
        session.ingest(SampleKind::Emg, sample(2.0)).unwrap();
        session.ingest(SampleKind::Landmark, sample(3.0)).unwrap();
        session.ingest(SampleKind::Emg, sample(4.0)).unwrap();

        let record = session.snapshot();
        let landmark_times: Vec<f64> = record.landmark_data.iter().map(|s| s.time).collect();
        let emg_times: Vec<f64> = record.emg_data.iter().map(|s| s.time).collect();
        assert_eq!(landmark_times, vec![1.0, 3.0]);
        assert_eq!(emg_times, vec![2.0, 4.0]);
    }

    #[test]
    fn test_double_start_is_rejected() {
        let mut session = RecordingSession::new();
        session.start(100.0).unwrap();
        session.ingest(SampleKind::Landmark, sample(101.0)).unwrap();

        // A second start while recording must not overwrite the epoch or
        // disturb already-buffered samples.
        let err = session.start(200.0).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyRecording { epoch } if epoch == 100.0));
        assert_eq!(session.epoch(), Some(100.0));
        assert_eq!(session.sample_counts(), (1, 0));
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut session = RecordingSession::new();
        session.start(10.0).unwrap();
        session.ingest(SampleKind::Emg, sample(11.0)).unwrap();

        session.reset();
        assert!(!session.is_recording());
        assert!(session.snapshot().is_empty());

        // Reusable for the next session.
        session.start(50.0).unwrap();
        session.ingest(SampleKind::Emg, sample(51.0)).unwrap();
        assert_eq!(session.snapshot().emg_data[0].time, 1.0);
    }

    #[test]
    fn test_payload_passes_through_opaque() {
        let mut session = RecordingSession::new();
        session.start(1.0).unwrap();

        let raw = serde_json::json!({ "time": 2.5, "channels": [1, 2, 3, 4], "device": "myo" });
        let sample: Sample = serde_json::from_value(raw).unwrap();
        session.ingest(SampleKind::Emg, sample).unwrap();

        let record = session.snapshot();
        assert_eq!(record.emg_data[0].time, 1.5);
        assert_eq!(
            record.emg_data[0].payload.get("channels"),
            Some(&serde_json::json!([1, 2, 3, 4]))
        );
        assert_eq!(
            record.emg_data[0].payload.get("device"),
            Some(&serde_json::json!("myo"))
        );
    }

    #[test]
    fn test_record_serializes_with_wire_field_names() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();
        session.ingest(SampleKind::Landmark, sample(1.0)).unwrap();

        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert!(json.get("landmarkData").is_some());
        assert!(json.get("emgData").is_some());
        assert!(json.get("epoch").is_none());
    }
}
