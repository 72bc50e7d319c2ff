//! Sending-session orchestrator.
//!
//! Sequences a complete send: local-IP handshake, fresh responder per
//! session, route registration, metadata announce over the signaling channel
//! and the wait for the receiver's finish callback. Queued sends (file lists,
//! folder trees) register everything up front, announce one queue-init
//! message plus one announce per file, and wait on a single queue-level
//! completion.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use slicewire_discovery::{HandshakeClient, IpProbe, local_candidate_ips};
use slicewire_protocol::{
    ANNOUNCE_DELAY, COMMUNICATION_PORT, FILE_SLICE_MAX_LENGTH, FieldMap, FileAnnounce,
    QUEUE_FINISH_KEY_LENGTH, QueueInitAnnounce, SignalingChannel,
};
use slicewire_responder::{Responder, ResponderFactory};
use tokio::sync::oneshot;

use crate::TransferError;
use crate::completion::CompletionSignal;
use crate::folder::flatten_folder;
use crate::progress::{ProgressEvent, ProgressRelay, TransferState};
use crate::routes::{register_file_routes, register_queue_finish_route};
use crate::slicing::{compute_slice_layout, random_alphanumeric};
use crate::table::{FileDetails, KeyTable};

/// Tunables for a [`FileSender`]. The defaults are the wire contract; tests
/// shrink them to exercise multi-slice flows with small files.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Port the responder binds. Zero lets the OS pick.
    pub port: u16,
    /// Maximum slice length in bytes.
    pub slice_max_len: u64,
    /// Pause before each announce, giving the receiver time to get ready.
    pub announce_delay: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            port: COMMUNICATION_PORT,
            slice_max_len: FILE_SLICE_MAX_LENGTH,
            announce_delay: ANNOUNCE_DELAY,
        }
    }
}

type SharedListener = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// The sending side of a slicewire transfer.
///
/// One value per paired peer; each top-level send runs on a fresh responder
/// and a cleared key table, so keys from an earlier send are dead the moment
/// a new one starts.
pub struct FileSender {
    signaling: Arc<dyn SignalingChannel>,
    factory: Arc<dyn ResponderFactory>,
    handshake: HandshakeClient,
    config: SenderConfig,
    server: tokio::sync::Mutex<Option<Arc<dyn Responder>>>,
    table: Arc<KeyTable>,
    relay: Arc<ProgressRelay>,
    listener: Arc<Mutex<Option<SharedListener>>>,
}

impl FileSender {
    pub fn new(
        signaling: Arc<dyn SignalingChannel>,
        factory: Arc<dyn ResponderFactory>,
        probe: Arc<dyn IpProbe>,
    ) -> Self {
        Self::with_config(signaling, factory, probe, SenderConfig::default())
    }

    pub fn with_config(
        signaling: Arc<dyn SignalingChannel>,
        factory: Arc<dyn ResponderFactory>,
        probe: Arc<dyn IpProbe>,
        config: SenderConfig,
    ) -> Self {
        Self {
            signaling,
            factory,
            handshake: HandshakeClient::new(probe, local_candidate_ips()),
            config,
            server: tokio::sync::Mutex::new(None),
            table: Arc::new(KeyTable::new()),
            relay: Arc::new(ProgressRelay::new()),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Installs the progress listener. Replaces any previous one.
    pub fn on_progress(&self, callback: impl Fn(ProgressEvent) + Send + Sync + 'static) {
        *self.listener.lock().unwrap() = Some(Arc::new(callback));
    }

    /// Sends a single file into `directory` on the receiver (empty for the
    /// receiver's default location) and waits for its finish callback.
    pub async fn send_file(&self, path: &Path, directory: &str) -> Result<(), TransferError> {
        let my_ip = self.ensure_handshake().await?;
        let responder = self.init_server(&my_ip).await?;
        self.install_passthrough_listener();

        let (announce, rx) = self.prepare_file(&responder, path, directory, &my_ip).await?;
        tracing::info!(file = %path.display(), key = %announce.download_key, "announcing file");
        self.announce(announce.to_fields()?).await?;
        wait_for_finish(rx).await
    }

    /// Sends a list of files as one queue, all placed in `directory` on the
    /// receiver.
    pub async fn send_files(
        &self,
        paths: &[PathBuf],
        directory: &str,
    ) -> Result<(), TransferError> {
        let entries: Vec<(String, PathBuf)> = paths
            .iter()
            .map(|p| (directory.to_string(), p.clone()))
            .collect();
        self.send_queue(entries).await
    }

    /// Sends a folder tree as one queue, preserving relative placement.
    pub async fn send_folder(&self, folder: &Path) -> Result<(), TransferError> {
        let entries = flatten_folder(folder).await?;
        self.send_queue(entries).await
    }

    async fn send_queue(&self, entries: Vec<(String, PathBuf)>) -> Result<(), TransferError> {
        if entries.is_empty() {
            return Ok(());
        }

        let my_ip = self.ensure_handshake().await?;
        let responder = self.init_server(&my_ip).await?;

        // Register every file before anything is announced, so no route the
        // receiver may request is ever missing.
        let mut announces = Vec::with_capacity(entries.len());
        let mut total_slices = 0u64;
        for (directory, path) in &entries {
            let (announce, _rx) = self.prepare_file(&responder, path, directory, &my_ip).await?;
            total_slices += announce.slices_count;
            announces.push(announce);
        }

        let queue_finish_key = random_alphanumeric(QUEUE_FINISH_KEY_LENGTH);
        let (queue_completion, queue_rx) = CompletionSignal::channel();
        register_queue_finish_route(&responder, &queue_finish_key, &queue_completion);

        self.install_queue_listener(total_slices);

        tracing::info!(
            files = entries.len(),
            total_slices,
            "announcing queued send"
        );
        let init = QueueInitAnnounce::new(total_slices, &queue_finish_key, &my_ip);
        self.announce(init.to_fields()?).await?;
        for announce in &announces {
            self.announce(announce.to_fields()?).await?;
        }

        let result = wait_for_finish(queue_rx).await;
        if result.is_ok() {
            self.notify(ProgressEvent::finished(total_slices));
        }
        result
    }

    async fn ensure_handshake(&self) -> Result<String, TransferError> {
        let result = self.handshake.handshake().await;
        if result.success {
            Ok(result.my_ip)
        } else {
            Err(TransferError::HandshakeFailed)
        }
    }

    /// Tears down any previous session and starts a fresh responder.
    async fn init_server(&self, my_ip: &str) -> Result<Arc<dyn Responder>, TransferError> {
        let mut server = self.server.lock().await;
        if let Some(old) = server.take() {
            old.dispose();
        }
        self.table.clear();

        let responder = self.factory.generate();
        let ip: IpAddr = my_ip.parse().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        responder.start(ip, self.config.port).await?;
        *server = Some(Arc::clone(&responder));
        Ok(responder)
    }

    /// Registers a file's slices and finish route, returning its announce and
    /// the completion receiver for its finish callback.
    async fn prepare_file(
        &self,
        responder: &Arc<dyn Responder>,
        path: &Path,
        directory: &str,
        server_ip: &str,
    ) -> Result<(FileAnnounce, oneshot::Receiver<String>), TransferError> {
        let metadata = tokio::fs::metadata(path).await?;
        let file_size = metadata.len();
        let layout = compute_slice_layout(file_size, self.config.slice_max_len);

        let key = self
            .table
            .register(FileDetails::new(path.to_path_buf(), layout));
        let (completion, rx) = CompletionSignal::channel();
        register_file_routes(
            responder,
            &key,
            &self.table,
            &self.relay,
            &completion,
            self.config.slice_max_len,
        );

        let date_modified = unix_millis(metadata.modified())
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        // Not every filesystem records a creation time.
        let date_created = unix_millis(metadata.created()).unwrap_or(date_modified);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let announce = FileAnnounce::new(
            key,
            layout.slices_count,
            file_name,
            date_modified,
            date_created,
            file_size,
            directory,
            server_ip,
        );
        Ok((announce, rx))
    }

    /// Delivers one announce after the configured delay, requiring an
    /// end-to-end acknowledgement.
    async fn announce(&self, fields: FieldMap) -> Result<(), TransferError> {
        tokio::time::sleep(self.config.announce_delay).await;
        let outcome = self.signaling.send(fields).await;
        if outcome.is_success() {
            Ok(())
        } else {
            Err(TransferError::AnnounceFailed(outcome.detail))
        }
    }

    /// Single-file mode: events pass through to the listener unchanged.
    fn install_passthrough_listener(&self) {
        let listener = Arc::clone(&self.listener);
        self.relay.replace(Box::new(move |event| {
            let current = listener.lock().unwrap().as_ref().map(Arc::clone);
            if let Some(listener) = current {
                listener(event);
            }
        }));
    }

    /// Queue mode: per-file events are re-based onto the queue-wide slice
    /// total. Each file's `Finished` advances the offset instead of reaching
    /// the listener; the queue emits its own terminal event.
    fn install_queue_listener(&self, total_slices: u64) {
        let listener = Arc::clone(&self.listener);
        let finished_offset = Arc::new(Mutex::new(0u64));
        self.relay.replace(Box::new(move |event| {
            let rebased = match event.state {
                TransferState::DataTransfer => {
                    let offset = *finished_offset.lock().unwrap();
                    Some(ProgressEvent::data_transfer(
                        offset + event.current_part,
                        total_slices,
                    ))
                }
                TransferState::Finished => {
                    *finished_offset.lock().unwrap() += event.total;
                    None
                }
                TransferState::Error => Some(ProgressEvent {
                    state: TransferState::Error,
                    current_part: event.current_part,
                    total: total_slices,
                    message: event.message,
                }),
            };
            if let Some(rebased) = rebased {
                let current = listener.lock().unwrap().as_ref().map(Arc::clone);
                if let Some(listener) = current {
                    listener(rebased);
                }
            }
        }));
    }

    fn notify(&self, event: ProgressEvent) {
        let current = self.listener.lock().unwrap().as_ref().map(Arc::clone);
        if let Some(listener) = current {
            listener(event);
        }
    }
}

impl Drop for FileSender {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.server.try_lock() {
            if let Some(server) = guard.take() {
                server.dispose();
            }
        }
    }
}

/// Maps a finish-callback resolution to the send's result. An empty message
/// is success; anything else is the receiver's diagnostic.
async fn wait_for_finish(rx: oneshot::Receiver<String>) -> Result<(), TransferError> {
    match rx.await {
        Ok(message) if message.is_empty() => Ok(()),
        Ok(message) => Err(TransferError::ReceiverReported(message)),
        Err(_) => Err(TransferError::ReceiverReported(
            "completion channel closed".into(),
        )),
    }
}

fn unix_millis(time: std::io::Result<SystemTime>) -> Option<i64> {
    time.ok()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_wire_constants() {
        let config = SenderConfig::default();
        assert_eq!(config.port, COMMUNICATION_PORT);
        assert_eq!(config.slice_max_len, FILE_SLICE_MAX_LENGTH);
        assert_eq!(config.announce_delay, ANNOUNCE_DELAY);
    }

    #[test]
    fn unix_millis_maps_epoch() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(unix_millis(Ok(t)), Some(1_700_000_000_123));
        let err: std::io::Result<SystemTime> =
            Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no"));
        assert_eq!(unix_millis(err), None);
    }
}
