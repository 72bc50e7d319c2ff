//! Responder route wiring for one registered file and for queue completion.
//!
//! Slice routes serve raw bytes; the transport never reports an error to the
//! receiver. A slice that cannot be produced (missing key, truncated file)
//! answers with a fallback body so the receiver's integrity check fails and
//! it retries or aborts on its own terms.

use std::io::SeekFrom;
use std::sync::Arc;

use slicewire_responder::{Reply, Request, Responder};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::TransferError;
use crate::completion::CompletionSignal;
use crate::progress::{ProgressEvent, ProgressRelay};
use crate::table::KeyTable;

const INVALID_REQUEST: &[u8] = b"Invalid Request";

/// Registers `/{key}/{i}/` for every slice of the file plus `/{key}/finish/`.
///
/// Must run before the file is announced, so that no route the receiver may
/// request is ever missing.
pub fn register_file_routes(
    responder: &Arc<dyn Responder>,
    key: &str,
    table: &Arc<KeyTable>,
    relay: &Arc<ProgressRelay>,
    completion: &Arc<CompletionSignal>,
    slice_max_len: u64,
) {
    let slices_count = match table.get(key) {
        Some(details) => details.slices_count(),
        None => 0,
    };
    tracing::debug!(%key, slices_count, "registering file routes");

    for index in 0..slices_count {
        let key = key.to_string();
        let table = Arc::clone(table);
        let relay = Arc::clone(relay);
        responder.add_route(
            &format!("/{key}/{index}/"),
            Arc::new(move |_req: Request| {
                let key = key.clone();
                let table = Arc::clone(&table);
                let relay = Arc::clone(&relay);
                Box::pin(async move {
                    match serve_slice(&table, &key, index, slice_max_len, &relay).await {
                        Ok(bytes) => Reply::Bytes(bytes),
                        Err(e) => {
                            tracing::warn!(%key, index, "slice request failed: {e}");
                            Reply::Bytes(INVALID_REQUEST.to_vec())
                        }
                    }
                })
            }),
        );
    }

    let finish_key = key.to_string();
    let table = Arc::clone(table);
    let relay = Arc::clone(relay);
    let completion = Arc::clone(completion);
    responder.add_route(
        &format!("/{key}/finish/"),
        Arc::new(move |req: Request| {
            let finish_key = finish_key.clone();
            let table = Arc::clone(&table);
            let relay = Arc::clone(&relay);
            let completion = Arc::clone(&completion);
            Box::pin(async move {
                let total = table
                    .get(&finish_key)
                    .map(|d| d.slices_count())
                    .unwrap_or(0);
                handle_finish(&req, Some((&relay, total)), &completion);
                Reply::Text("OK".into())
            })
        }),
    );
}

/// Registers `/{queue_finish_key}/finishQueue/` resolving the queue-level
/// completion signal. No progress is emitted here; per-file finish callbacks
/// already account for every slice.
pub fn register_queue_finish_route(
    responder: &Arc<dyn Responder>,
    queue_finish_key: &str,
    completion: &Arc<CompletionSignal>,
) {
    let completion = Arc::clone(completion);
    responder.add_route(
        &format!("/{queue_finish_key}/finishQueue/"),
        Arc::new(move |req: Request| {
            let completion = Arc::clone(&completion);
            Box::pin(async move {
                handle_finish(&req, None, &completion);
                Reply::Text("OK".into())
            })
        }),
    );
}

/// Parses a finish callback's query and resolves `completion` accordingly.
///
/// A missing or unparsable parameter resolves as failure with a diagnostic;
/// the HTTP reply is "OK" either way, the receiver is not the party that
/// needs to hear about a malformed callback.
fn handle_finish(
    req: &Request,
    progress: Option<(&ProgressRelay, u64)>,
    completion: &Arc<CompletionSignal>,
) {
    let success = match req.query("success") {
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) if v.eq_ignore_ascii_case("false") => false,
        Some(other) => {
            completion.resolve(format!("unrecognized success value: {other}"));
            return;
        }
        None => {
            completion.resolve("missing success parameter");
            return;
        }
    };

    if success {
        if let Some((relay, total)) = progress {
            relay.emit(ProgressEvent::finished(total));
        }
        completion.resolve("");
    } else {
        let message = match req.query("message") {
            Some(m) => m.to_string(),
            None => {
                completion.resolve("missing message parameter");
                return;
            }
        };
        if let Some((relay, total)) = progress {
            relay.emit(ProgressEvent::error(total, message.clone()));
        }
        completion.resolve(message);
    }
}

/// Reads the slice at `index` of the file registered under `key`.
///
/// Progress is emitted when the request advances the high-water mark, before
/// the read, so a slow disk never delays the notification past a faster
/// subsequent request.
async fn serve_slice(
    table: &Arc<KeyTable>,
    key: &str,
    index: u64,
    slice_max_len: u64,
    relay: &Arc<ProgressRelay>,
) -> Result<Vec<u8>, TransferError> {
    let details = table
        .get(key)
        .ok_or_else(|| TransferError::UnknownKey(key.to_string()))?;

    if details.advance_high_water(index) {
        relay.emit(ProgressEvent::data_transfer(
            index + 1,
            details.slices_count(),
        ));
    }

    let length = details.piece_length(index, slice_max_len);
    let mut file = tokio::fs::File::open(details.path()).await?;
    file.seek(SeekFrom::Start(index * slice_max_len)).await?;

    let mut buffer = vec![0u8; length as usize];
    file.read_exact(&mut buffer).await?;
    Ok(buffer)
}
