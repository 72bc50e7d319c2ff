use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

use tokio::sync::Mutex;

/// Outcome of one handshake. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    pub success: bool,
    /// The local address the peer confirmed it can reach. Empty on failure.
    pub my_ip: String,
}

impl HandshakeResult {
    pub fn reached(my_ip: impl Into<String>) -> Self {
        Self {
            success: true,
            my_ip: my_ip.into(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            success: false,
            my_ip: String::new(),
        }
    }
}

/// A boxed future returned by [`IpProbe::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = HandshakeResult> + Send + 'a>>;

/// External collaborator that determines which candidate local address the
/// target peer can reach. The returned future resolves exactly once.
pub trait IpProbe: Send + Sync {
    fn probe(&self, candidates: &[IpAddr]) -> ProbeFuture<'_>;
}

/// Runs the handshake once per sending session and caches a successful
/// result; a failed handshake is retried on the next call.
pub struct HandshakeClient {
    probe: std::sync::Arc<dyn IpProbe>,
    candidates: Vec<IpAddr>,
    result: Mutex<Option<HandshakeResult>>,
}

impl HandshakeClient {
    pub fn new(probe: std::sync::Arc<dyn IpProbe>, candidates: Vec<IpAddr>) -> Self {
        Self {
            probe,
            candidates,
            result: Mutex::new(None),
        }
    }

    /// Returns the session's handshake result, probing if no successful
    /// result is cached yet.
    pub async fn handshake(&self) -> HandshakeResult {
        let mut cached = self.result.lock().await;
        if let Some(result) = cached.as_ref() {
            if result.success {
                return result.clone();
            }
        }

        let result = self.probe.probe(&self.candidates).await;
        if result.success {
            tracing::debug!(ip = %result.my_ip, "handshake resolved local address");
        } else {
            tracing::warn!("handshake found no reachable local address");
        }
        *cached = Some(result.clone());
        result
    }

    /// Clears the cached result, forcing the next call to re-probe.
    pub async fn reset(&self) {
        *self.result.lock().await = None;
    }
}
