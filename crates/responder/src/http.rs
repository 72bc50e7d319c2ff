//! Default responder implementation over a raw TCP listener.
//!
//! One listener per sending session, one short-lived connection per request.
//! Only `GET` is understood; that is the entire wire surface slice receivers
//! use.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, RwLock};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::ResponderError;
use crate::route::{
    Reply, Request, Responder, ResponderFactory, RouteHandler, StartFuture, parse_query,
};

/// Route-table HTTP responder.
pub struct HttpResponder {
    routes: Arc<RwLock<HashMap<String, RouteHandler>>>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    async fn run(
        listener: TcpListener,
        routes: Arc<RwLock<HashMap<String, RouteHandler>>>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("responder shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let routes = Arc::clone(&routes);
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, routes).await {
                                    tracing::debug!(%peer_addr, "request error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }
}

impl Responder for HttpResponder {
    fn add_route(&self, path: &str, handler: RouteHandler) {
        self.routes
            .write()
            .unwrap()
            .insert(path.to_string(), handler);
    }

    fn start(&self, ip: IpAddr, port: u16) -> StartFuture<'_> {
        Box::pin(async move {
            if self.local_addr.lock().unwrap().is_some() {
                return Err(ResponderError::AlreadyStarted);
            }

            let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
            let local_addr = listener.local_addr()?;
            *self.local_addr.lock().unwrap() = Some(local_addr);
            tracing::info!("responder listening on {local_addr}");

            let routes = Arc::clone(&self.routes);
            let cancel = self.cancel.clone();
            tokio::spawn(Self::run(listener, routes, cancel));
            Ok(())
        })
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap()
    }

    fn dispose(&self) {
        self.cancel.cancel();
        self.routes.write().unwrap().clear();
    }
}

impl Drop for HttpResponder {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Factory handing each sending session a fresh [`HttpResponder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpResponderFactory;

impl ResponderFactory for HttpResponderFactory {
    fn generate(&self) -> Arc<dyn Responder> {
        HttpResponder::new()
    }
}

async fn serve_connection(
    stream: TcpStream,
    routes: Arc<RwLock<HashMap<String, RouteHandler>>>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers; the slice protocol carries everything in the URL.
    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    let (status, reply) = match parse_request_line(&request_line) {
        Some(request) => {
            let handler = routes.read().unwrap().get(&request.path).cloned();
            match handler {
                Some(handler) => ("200 OK", handler(request).await),
                None => ("404 Not Found", Reply::Text("Not Found".into())),
            }
        }
        None => (
            "405 Method Not Allowed",
            Reply::Text("Method Not Allowed".into()),
        ),
    };

    let content_type = reply.content_type();
    let body = reply.into_bytes();
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    write_half.write_all(head.as_bytes()).await?;
    write_half.write_all(&body).await?;
    write_half.shutdown().await?;
    Ok(())
}

/// Parses `GET /path?query HTTP/1.x` into a [`Request`]. Returns `None` for
/// anything that is not a well-formed GET.
fn parse_request_line(line: &str) -> Option<Request> {
    let mut parts = line.trim_end().split(' ');
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    parts.next()?; // HTTP version must be present.

    let (path, raw_query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };
    Some(Request {
        path: path.to_string(),
        query: parse_query(raw_query),
    })
}
