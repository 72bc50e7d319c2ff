//! Wire protocol types for slicewire sender/receiver communication.
//!
//! The signaling channel carries flat field maps; the types here give those
//! maps a schema and keep the field names stable across implementations.

pub mod constants;
pub mod messages;
pub mod signaling;

pub use constants::{
    ANNOUNCE_DELAY, COMMUNICATION_PORT, FILE_SLICE_MAX_LENGTH, QUEUE_FINISH_KEY_LENGTH,
    TRANSFER_KEY_LENGTH,
};
pub use messages::{FileAnnounce, QueueInitAnnounce};
pub use signaling::{FieldMap, SendOutcome, SendStatus, SignalFuture, SignalingChannel};

/// Errors produced while building protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
