//! Local-IP handshake for slicewire sending sessions.
//!
//! Before any data-plane activity, the sender must learn which of its local
//! addresses the receiving peer can actually reach. That probing is done by
//! an external collaborator (it owns the pairing channel and can ask the peer
//! to try each candidate); this crate enumerates the candidates and runs the
//! handshake exactly once per session.

mod handshake;
mod ips;

pub use handshake::{HandshakeClient, HandshakeResult, IpProbe, ProbeFuture};
pub use ips::local_candidate_ips;
