//! Shared protocol constants.

use std::time::Duration;

/// Well-known port the slice responder binds for a sending session.
pub const COMMUNICATION_PORT: u16 = 8081;

/// Maximum length of one file slice in bytes (512 KiB).
///
/// Every slice except possibly the last is exactly this long. A file whose
/// size is an exact multiple of this length still ends with a full-size
/// slice, never a zero-byte one.
pub const FILE_SLICE_MAX_LENGTH: u64 = 512 * 1024;

/// Length of a per-file transfer key (alphanumeric characters).
pub const TRANSFER_KEY_LENGTH: usize = 24;

/// Length of the shared queue-finish key (alphanumeric characters).
pub const QUEUE_FINISH_KEY_LENGTH: usize = 15;

/// Pause around per-file metadata announces, giving the receiver time to
/// prepare before slices may be requested.
pub const ANNOUNCE_DELAY: Duration = Duration::from_secs(1);

/// Value of the `Receiver` field on every announce message.
pub const RECEIVER_FILE: &str = "FileReceiver";
