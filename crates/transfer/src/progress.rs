//! Typed progress notifications for the host application.

use std::sync::Mutex;

/// Phase of a progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    DataTransfer,
    Finished,
    Error,
}

/// One progress notification. Emitted, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub state: TransferState,
    pub current_part: u64,
    pub total: u64,
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn data_transfer(current_part: u64, total: u64) -> Self {
        Self {
            state: TransferState::DataTransfer,
            current_part,
            total,
            message: None,
        }
    }

    pub fn finished(total: u64) -> Self {
        Self {
            state: TransferState::Finished,
            current_part: total,
            total,
            message: None,
        }
    }

    pub fn error(total: u64, message: impl Into<String>) -> Self {
        Self {
            state: TransferState::Error,
            current_part: total,
            total,
            message: Some(message.into()),
        }
    }
}

/// Callback invoked with progress events.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Holds at most one listener, replaced wholesale at the start of each
/// top-level send so exactly one aggregation policy is active at a time.
#[derive(Default)]
pub struct ProgressRelay {
    listener: Mutex<Option<ProgressCallback>>,
}

impl ProgressRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current listener.
    pub fn replace(&self, callback: ProgressCallback) {
        *self.listener.lock().unwrap() = Some(callback);
    }

    pub fn clear(&self) {
        *self.listener.lock().unwrap() = None;
    }

    /// Delivers an event to the listener, if any.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(listener) = self.listener.lock().unwrap().as_ref() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<ProgressEvent>>>, ProgressCallback) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |e| sink.lock().unwrap().push(e));
        (events, callback)
    }

    #[test]
    fn emit_without_listener_is_silent() {
        let relay = ProgressRelay::new();
        relay.emit(ProgressEvent::data_transfer(1, 3));
    }

    #[test]
    fn emit_reaches_listener() {
        let relay = ProgressRelay::new();
        let (events, callback) = collector();
        relay.replace(callback);

        relay.emit(ProgressEvent::data_transfer(1, 3));
        relay.emit(ProgressEvent::finished(3));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].state, TransferState::DataTransfer);
        assert_eq!(events[1], ProgressEvent::finished(3));
    }

    #[test]
    fn replace_swaps_listener_wholesale() {
        let relay = ProgressRelay::new();
        let (first_events, first) = collector();
        let (second_events, second) = collector();

        relay.replace(first);
        relay.emit(ProgressEvent::data_transfer(1, 2));
        relay.replace(second);
        relay.emit(ProgressEvent::data_transfer(2, 2));

        assert_eq!(first_events.lock().unwrap().len(), 1);
        assert_eq!(second_events.lock().unwrap().len(), 1);
    }

    #[test]
    fn error_event_carries_message() {
        let e = ProgressEvent::error(5, "receiver out of space");
        assert_eq!(e.state, TransferState::Error);
        assert_eq!(e.current_part, 5);
        assert_eq!(e.message.as_deref(), Some("receiver out of space"));
    }
}
