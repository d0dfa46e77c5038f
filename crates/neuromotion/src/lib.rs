//! Neuromotion Capture - synchronized EMG and hand-landmark recording.
//!
//! Library exposing core modules for testing and reuse.

pub mod ingest;
pub mod persist;
pub mod session;
pub mod web;
