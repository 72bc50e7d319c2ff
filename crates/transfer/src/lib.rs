//! Chunked-transfer orchestrator: the sending side of a slicewire transfer.
//!
//! Files are sliced into fixed-size pieces and published at unguessable URLs
//! on an ephemeral HTTP responder; an already-established signaling channel
//! announces the metadata the paired peer needs to pull them. [`FileSender`]
//! sequences the whole handshake → serve → announce → completion-wait flow
//! for single files, file lists and folder trees.

mod completion;
mod folder;
mod progress;
mod routes;
mod sender;
mod slicing;
mod table;

pub use completion::CompletionSignal;
pub use folder::flatten_folder;
pub use progress::{ProgressCallback, ProgressEvent, ProgressRelay, TransferState};
pub use sender::{FileSender, SenderConfig};
pub use slicing::{SliceLayout, compute_slice_layout, random_alphanumeric};
pub use table::{FileDetails, KeyTable};

/// Errors produced by the transfer orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reachable local address found")]
    HandshakeFailed,

    #[error("protocol error: {0}")]
    Protocol(#[from] slicewire_protocol::ProtocolError),

    #[error("announce not acknowledged: {0}")]
    AnnounceFailed(String),

    #[error("receiver reported failure: {0}")]
    ReceiverReported(String),

    #[error("responder error: {0}")]
    Responder(#[from] slicewire_responder::ResponderError),

    #[error("unknown transfer key: {0}")]
    UnknownKey(String),
}
