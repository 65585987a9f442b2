use crate::Topic;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Failed to connect to the event stream at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Failed to decode event: {0}")]
    Decode(String),

    #[error("Expected {expected} '{topic}' events, captured {actual}")]
    CountMismatch {
        topic: Topic,
        expected: usize,
        actual: usize,
    },

    #[error("The capture task failed: {0}")]
    CaptureTask(String),
}
