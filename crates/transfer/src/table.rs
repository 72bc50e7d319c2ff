//! Per-transfer file state and the key table mapping transfer keys to it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use slicewire_protocol::TRANSFER_KEY_LENGTH;

use crate::slicing::{SliceLayout, random_alphanumeric};

/// State of one file being served, owned by the sending session.
///
/// The layout fields are immutable; `last_piece_accessed` is the progress
/// high-water mark, advanced from concurrent slice requests.
pub struct FileDetails {
    path: PathBuf,
    slices_count: u64,
    last_slice_size: u64,
    last_piece_accessed: Mutex<Option<u64>>,
}

impl FileDetails {
    pub fn new(path: PathBuf, layout: SliceLayout) -> Self {
        Self {
            path,
            slices_count: layout.slices_count,
            last_slice_size: layout.last_slice_size,
            last_piece_accessed: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slices_count(&self) -> u64 {
        self.slices_count
    }

    /// Served length of the slice at `index`: `slice_max_len` except for a
    /// final slice with a non-zero remainder.
    pub fn piece_length(&self, index: u64, slice_max_len: u64) -> u64 {
        if index + 1 == self.slices_count && self.last_slice_size != 0 {
            self.last_slice_size
        } else {
            slice_max_len
        }
    }

    /// Advances the high-water mark if `index` has not been reached before.
    ///
    /// Returns `true` exactly once per distinct first-time-reached index, so
    /// receiver-side retries never replay progress.
    pub fn advance_high_water(&self, index: u64) -> bool {
        let mut mark = self.last_piece_accessed.lock().unwrap();
        match *mark {
            Some(high) if index <= high => false,
            _ => {
                *mark = Some(index);
                true
            }
        }
    }

    /// Highest slice index observed so far, if any.
    pub fn high_water(&self) -> Option<u64> {
        *self.last_piece_accessed.lock().unwrap()
    }
}

/// Maps transfer keys to [`FileDetails`], shared between the orchestrator
/// and concurrent slice-request handlers.
#[derive(Default)]
pub struct KeyTable {
    inner: RwLock<HashMap<String, Arc<FileDetails>>>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `details` under a freshly generated unique key.
    ///
    /// Generation and insertion happen under one write lock, so concurrent
    /// registrations can never allocate the same key.
    pub fn register(&self, details: FileDetails) -> String {
        let mut map = self.inner.write().unwrap();
        let key = loop {
            let candidate = random_alphanumeric(TRANSFER_KEY_LENGTH);
            if !map.contains_key(&candidate) {
                break candidate;
            }
        };
        map.insert(key.clone(), Arc::new(details));
        key
    }

    pub fn get(&self, key: &str) -> Option<Arc<FileDetails>> {
        self.inner.read().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    /// Drops all registered transfers (session teardown).
    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicing::compute_slice_layout;

    fn details(size: u64, slice_len: u64) -> FileDetails {
        FileDetails::new("test.bin".into(), compute_slice_layout(size, slice_len))
    }

    #[test]
    fn piece_length_full_and_partial() {
        let d = details(10, 4); // slices of 4, 4, 2
        assert_eq!(d.slices_count(), 3);
        assert_eq!(d.piece_length(0, 4), 4);
        assert_eq!(d.piece_length(1, 4), 4);
        assert_eq!(d.piece_length(2, 4), 2);
    }

    #[test]
    fn piece_length_exact_multiple_stays_full() {
        let d = details(8, 4);
        assert_eq!(d.slices_count(), 2);
        assert_eq!(d.piece_length(1, 4), 4);
    }

    #[test]
    fn high_water_emits_once_per_index() {
        let d = details(12, 4);
        assert!(d.advance_high_water(0));
        assert!(!d.advance_high_water(0));
        assert!(d.advance_high_water(1));
        assert!(!d.advance_high_water(0));
        assert!(!d.advance_high_water(1));
        assert!(d.advance_high_water(2));
        assert_eq!(d.high_water(), Some(2));
    }

    #[test]
    fn high_water_is_monotonic_on_out_of_order_requests() {
        let d = details(12, 4);
        assert!(d.advance_high_water(2));
        assert!(!d.advance_high_water(1));
        assert_eq!(d.high_water(), Some(2));
    }

    #[test]
    fn register_returns_unique_keys() {
        let table = KeyTable::new();
        let a = table.register(details(4, 4));
        let b = table.register(details(4, 4));
        assert_ne!(a, b);
        assert_eq!(a.len(), TRANSFER_KEY_LENGTH);
        assert!(table.contains(&a));
        assert!(table.contains(&b));
    }

    #[test]
    fn concurrent_registration_never_collides() {
        use std::collections::HashSet;
        use std::thread;

        let table = Arc::new(KeyTable::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let t = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                (0..50).map(|_| t.register(details(4, 4))).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for h in handles {
            for key in h.join().unwrap() {
                assert!(seen.insert(key), "duplicate live key");
            }
        }
        assert_eq!(table.len(), 400);
    }

    #[test]
    fn clear_empties_table() {
        let table = KeyTable::new();
        let key = table.register(details(4, 4));
        table.clear();
        assert!(table.is_empty());
        assert!(table.get(&key).is_none());
    }
}
