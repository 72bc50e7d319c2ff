//! Ephemeral HTTP responder for slicewire transfers.
//!
//! The orchestrator publishes each file slice at a unique path on a small
//! per-session web server. This crate defines the responder capability the
//! orchestrator consumes ([`Responder`] / [`ResponderFactory`]) and provides
//! the default implementation ([`HttpResponder`]): a route-table HTTP/1.1 GET
//! responder over `tokio::net::TcpListener`, handling requests concurrently
//! and shut down via cancellation.

mod http;
mod route;

pub use http::{HttpResponder, HttpResponderFactory};
pub use route::{Reply, Request, Responder, ResponderFactory, RouteFuture, RouteHandler, StartFuture};

/// Errors produced by the responder.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("responder already started")]
    AlreadyStarted,
}
