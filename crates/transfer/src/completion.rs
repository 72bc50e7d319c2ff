//! Single-resolution completion signal.
//!
//! Carries an empty string for success or a non-empty diagnostic for
//! failure. Finish callbacks may race (duplicate requests, parse-error
//! paths); resolution is first-writer-wins and later attempts are ignored.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

pub struct CompletionSignal {
    tx: Mutex<Option<oneshot::Sender<String>>>,
}

impl CompletionSignal {
    /// Creates a signal and the receiver the orchestrator awaits.
    pub fn channel() -> (Arc<Self>, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Resolves the signal. Subsequent calls are no-ops, as is resolving
    /// after the waiting side has gone away.
    pub fn resolve(&self, message: impl Into<String>) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(message.into());
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_with_message() {
        let (signal, rx) = CompletionSignal::channel();
        signal.resolve("disk full");
        assert_eq!(rx.await.unwrap(), "disk full");
        assert!(signal.is_resolved());
    }

    #[tokio::test]
    async fn first_resolution_wins() {
        let (signal, rx) = CompletionSignal::channel();
        signal.resolve("");
        signal.resolve("late failure");
        assert_eq!(rx.await.unwrap(), "");
    }

    #[tokio::test]
    async fn resolve_after_receiver_dropped_is_ignored() {
        let (signal, rx) = CompletionSignal::channel();
        drop(rx);
        signal.resolve("nobody listening");
        assert!(signal.is_resolved());
    }

    #[tokio::test]
    async fn concurrent_resolutions_produce_one_value() {
        let (signal, rx) = CompletionSignal::channel();

        let mut handles = vec![];
        for i in 0..8 {
            let s = Arc::clone(&signal);
            handles.push(tokio::spawn(async move {
                s.resolve(format!("result-{i}"));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let value = rx.await.unwrap();
        assert!(value.starts_with("result-"));
    }
}
