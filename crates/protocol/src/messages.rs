//! Announce messages delivered over the signaling channel.
//!
//! Field names are the wire contract: receivers dispatch on `Receiver` and
//! `Type`, and pull the download key, slice count and server address out of
//! the flat map. Renames here must never change without a protocol bump.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::constants::RECEIVER_FILE;
use crate::signaling::FieldMap;

/// Per-file metadata announce.
///
/// Sent once per file, after all of the file's slice and finish routes are
/// registered on the responder. The receiver uses `DownloadKey` and
/// `SlicesCount` to pull `/{key}/{0..SlicesCount}/` from `ServerIP`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileAnnounce {
    pub receiver: String,
    pub download_key: String,
    pub slices_count: u64,
    pub file_name: String,
    pub date_modified: i64,
    pub date_created: i64,
    pub file_size: u64,
    pub directory: String,
    #[serde(rename = "ServerIP")]
    pub server_ip: String,
}

impl FileAnnounce {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        download_key: impl Into<String>,
        slices_count: u64,
        file_name: impl Into<String>,
        date_modified: i64,
        date_created: i64,
        file_size: u64,
        directory: impl Into<String>,
        server_ip: impl Into<String>,
    ) -> Self {
        Self {
            receiver: RECEIVER_FILE.into(),
            download_key: download_key.into(),
            slices_count,
            file_name: file_name.into(),
            date_modified,
            date_created,
            file_size,
            directory: directory.into(),
            server_ip: server_ip.into(),
        }
    }

    /// Flattens the announce into a signaling field map.
    pub fn to_fields(&self) -> Result<FieldMap, ProtocolError> {
        to_field_map(self)
    }
}

/// Queue-level announce, sent once before the first per-file announce of a
/// queued send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueInitAnnounce {
    pub receiver: String,
    #[serde(rename = "Type")]
    pub message_type: String,
    pub total_slices: u64,
    pub queue_finish_key: String,
    #[serde(rename = "ServerIP")]
    pub server_ip: String,
}

impl QueueInitAnnounce {
    pub fn new(
        total_slices: u64,
        queue_finish_key: impl Into<String>,
        server_ip: impl Into<String>,
    ) -> Self {
        Self {
            receiver: RECEIVER_FILE.into(),
            message_type: "QueueInit".into(),
            total_slices,
            queue_finish_key: queue_finish_key.into(),
            server_ip: server_ip.into(),
        }
    }

    /// Flattens the announce into a signaling field map.
    pub fn to_fields(&self) -> Result<FieldMap, ProtocolError> {
        to_field_map(self)
    }
}

fn to_field_map<T: Serialize>(value: &T) -> Result<FieldMap, ProtocolError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ProtocolError::Json(serde::ser::Error::custom(format!(
            "announce serialized to non-object: {other}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_announce_wire_field_names() {
        let msg = FileAnnounce::new(
            "k123",
            3,
            "photo.jpg",
            1700000000000,
            1690000000000,
            1536,
            "Camera",
            "192.168.1.5",
        );
        let json = serde_json::to_string(&msg).unwrap();
        for field in [
            "\"Receiver\":\"FileReceiver\"",
            "\"DownloadKey\":\"k123\"",
            "\"SlicesCount\":3",
            "\"FileName\":\"photo.jpg\"",
            "\"DateModified\":1700000000000",
            "\"DateCreated\":1690000000000",
            "\"FileSize\":1536",
            "\"Directory\":\"Camera\"",
            "\"ServerIP\":\"192.168.1.5\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn queue_init_wire_field_names() {
        let msg = QueueInitAnnounce::new(10, "qkey", "10.0.0.2");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"Receiver\":\"FileReceiver\""));
        assert!(json.contains("\"Type\":\"QueueInit\""));
        assert!(json.contains("\"TotalSlices\":10"));
        assert!(json.contains("\"QueueFinishKey\":\"qkey\""));
        assert!(json.contains("\"ServerIP\":\"10.0.0.2\""));
    }

    #[test]
    fn file_announce_to_fields() {
        let msg = FileAnnounce::new("k", 1, "a.txt", 0, 0, 10, "", "127.0.0.1");
        let fields = msg.to_fields().unwrap();
        assert_eq!(fields.len(), 9);
        assert_eq!(fields["DownloadKey"], "k");
        assert_eq!(fields["FileSize"], 10);
    }

    #[test]
    fn file_announce_roundtrip() {
        let msg = FileAnnounce::new("k", 2, "b.bin", 5, 4, 99, "Docs", "192.168.0.9");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: FileAnnounce = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, parsed);
    }

    #[test]
    fn queue_init_roundtrip() {
        let msg = QueueInitAnnounce::new(7, "q", "10.1.1.1");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: QueueInitAnnounce = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, parsed);
    }
}
