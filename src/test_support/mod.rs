//! Test utilities shared across the crate's unit tests.

pub mod recording;

pub use recording::{calls, CallLog, RecordingProvider, Widget};
