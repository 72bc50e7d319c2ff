//! Slice layout arithmetic and transfer-key generation.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// How a file of a given size divides into slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceLayout {
    /// Number of slices, `ceil(file_size / slice_max_len)`.
    pub slices_count: u64,
    /// `file_size % slice_max_len`. Zero means the final slice is a full
    /// `slice_max_len` bytes, never an empty one.
    pub last_slice_size: u64,
}

/// Computes the slice layout for a file.
pub fn compute_slice_layout(file_size: u64, slice_max_len: u64) -> SliceLayout {
    SliceLayout {
        slices_count: file_size.div_ceil(slice_max_len),
        last_slice_size: file_size % slice_max_len,
    }
}

/// Draws `len` random characters from `[0-9A-Za-z]`.
///
/// Callers enforcing uniqueness (the key table) must retry under the same
/// lock that guards insertion.
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
