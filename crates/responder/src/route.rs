//! Route capability consumed by the transfer orchestrator.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use crate::ResponderError;

/// One inbound request, reduced to what route handlers need.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request path, exactly as registered (e.g. `/{key}/3/`).
    pub path: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: HashMap::new(),
        }
    }

    /// Returns a decoded query parameter by name.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Body returned by a route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Bytes(Vec<u8>),
}

impl Reply {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Reply::Text(s) => s.into_bytes(),
            Reply::Bytes(b) => b,
        }
    }

    /// MIME type for the HTTP `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        match self {
            Reply::Text(_) => "text/plain; charset=utf-8",
            Reply::Bytes(_) => "application/octet-stream",
        }
    }
}

/// A boxed future returned by a route handler.
pub type RouteFuture = Pin<Box<dyn Future<Output = Reply> + Send + 'static>>;

/// Handler registered for one exact path.
pub type RouteHandler = Arc<dyn Fn(Request) -> RouteFuture + Send + Sync>;

/// A boxed future returned by [`Responder::start`].
pub type StartFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ResponderError>> + Send + 'a>>;

/// Register-route/start/dispose capability of an embedded web server.
///
/// Routes may be added before or after `start`; requests for unregistered
/// paths get a 404. `dispose` stops accepting connections and drops all
/// routes; a disposed responder is never restarted (sessions create a fresh
/// instance through the factory instead).
pub trait Responder: Send + Sync {
    fn add_route(&self, path: &str, handler: RouteHandler);
    fn start(&self, ip: IpAddr, port: u16) -> StartFuture<'_>;
    /// Bound address, available once `start` has returned.
    fn local_addr(&self) -> Option<SocketAddr>;
    fn dispose(&self);
}

/// Produces fresh responder instances, one per sending session.
pub trait ResponderFactory: Send + Sync {
    fn generate(&self) -> Arc<dyn Responder>;
}

/// Decodes an URL-encoded query string into a parameter map.
///
/// `+` decodes to a space; malformed percent escapes are kept literally
/// rather than rejected, since finish callbacks must never error out at the
/// transport layer.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = match pair.split_once('=') {
            Some((n, v)) => (n, v),
            None => (pair, ""),
        };
        params.insert(percent_decode(name), percent_decode(value));
    }
    params
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: Option<&u8>) -> Option<u8> {
    match b? {
        c @ b'0'..=b'9' => Some(c - b'0'),
        c @ b'a'..=b'f' => Some(c - b'a' + 10),
        c @ b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_basic() {
        let q = parse_query("success=true&message=done");
        assert_eq!(q.get("success").map(String::as_str), Some("true"));
        assert_eq!(q.get("message").map(String::as_str), Some("done"));
    }

    #[test]
    fn parse_query_percent_and_plus() {
        let q = parse_query("message=disk%20full+again");
        assert_eq!(q.get("message").map(String::as_str), Some("disk full again"));
    }

    #[test]
    fn parse_query_valueless_param() {
        let q = parse_query("flag");
        assert_eq!(q.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn parse_query_empty() {
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn percent_decode_malformed_kept_literal() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("a%zz"), "a%zz");
    }

    #[test]
    fn reply_content_types() {
        assert_eq!(Reply::Text("OK".into()).content_type(), "text/plain; charset=utf-8");
        assert_eq!(Reply::Bytes(vec![1]).content_type(), "application/octet-stream");
    }

    #[test]
    fn reply_into_bytes() {
        assert_eq!(Reply::Text("OK".into()).into_bytes(), b"OK");
        assert_eq!(Reply::Bytes(vec![1, 2]).into_bytes(), vec![1, 2]);
    }
}
