//! Signaling-channel seam.
//!
//! The channel that tells the paired peer what to download is established
//! elsewhere (device pairing is out of scope here); the orchestrator only
//! needs a way to push a flat field map and learn whether delivery was
//! acknowledged.

use std::future::Future;
use std::pin::Pin;

/// Flat field map carried by one signaling message.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// A boxed future returned by [`SignalingChannel::send`].
pub type SignalFuture<'a> = Pin<Box<dyn Future<Output = SendOutcome> + Send + 'a>>;

/// Delivery status of a signaling send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Success,
    Failure,
}

/// Result of delivering one signaling message.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub status: SendStatus,
    /// Transport-specific diagnostic, empty on success.
    pub detail: String,
}

impl SendOutcome {
    pub fn success() -> Self {
        Self {
            status: SendStatus::Success,
            detail: String::new(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Failure,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }
}

/// An established control-plane channel to the receiving peer.
///
/// Implementations wrap whatever transport the host application pairs
/// devices over. Delivery must be acknowledged end to end: returning
/// [`SendStatus::Success`] means the peer accepted the message, not merely
/// that bytes left the socket.
pub trait SignalingChannel: Send + Sync {
    fn send(&self, fields: FieldMap) -> SignalFuture<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_success() {
        let outcome = SendOutcome::success();
        assert!(outcome.is_success());
        assert!(outcome.detail.is_empty());
    }

    #[test]
    fn outcome_failure_carries_detail() {
        let outcome = SendOutcome::failure("peer unreachable");
        assert!(!outcome.is_success());
        assert_eq!(outcome.detail, "peer unreachable");
    }
}
