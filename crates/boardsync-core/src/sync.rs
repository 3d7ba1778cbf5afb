//! Sync event contract and channels.
//!
//! Every local mutation is announced as a [`SyncEvent`] wrapped in a
//! [`SyncEnvelope`] that carries the sender's origin. Envelopes travel as JSON
//! text frames through a [`SyncChannel`]; the transport behind the channel is
//! up to the host (the relay server, an in-process hub, or nothing at all).

use crate::element::{Element, ElementId, PageNumber, Pages};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// A document change, as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SyncEvent {
    /// Element appended to a page.
    Add { page: PageNumber, element: Element },
    /// Element replaced (matched by id).
    Update { page: PageNumber, element: Element },
    /// Element removed.
    Delete { page: PageNumber, element_id: ElementId },
    /// Page emptied.
    Clear { page: PageNumber },
    /// Page removed.
    PageDelete { page_number: PageNumber },
    /// Full page mapping, merged key by key on receipt.
    PageChange {
        #[serde(with = "page_keys")]
        pages: Pages,
    },
}

impl SyncEvent {
    /// The single page an event addresses. `None` for `page-change`, which
    /// carries a whole page map.
    pub fn page(&self) -> Option<PageNumber> {
        match self {
            SyncEvent::Add { page, .. }
            | SyncEvent::Update { page, .. }
            | SyncEvent::Delete { page, .. }
            | SyncEvent::Clear { page } => Some(*page),
            SyncEvent::PageDelete { page_number } => Some(*page_number),
            SyncEvent::PageChange { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::Add { .. } => "add",
            SyncEvent::Update { .. } => "update",
            SyncEvent::Delete { .. } => "delete",
            SyncEvent::Clear { .. } => "clear",
            SyncEvent::PageDelete { .. } => "page-delete",
            SyncEvent::PageChange { .. } => "page-change",
        }
    }
}

/// An event plus the origin of the replica that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    #[serde(flatten)]
    pub event: SyncEvent,
    pub origin: String,
}

impl SyncEnvelope {
    pub fn new(event: SyncEvent, origin: impl Into<String>) -> Self {
        Self {
            event,
            origin: origin.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Page maps keyed by page number. Keys are read back through `String` so
/// the map also decodes when buffered inside tagged or flattened enums.
mod page_keys {
    use crate::element::{Element, PageNumber, Pages};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(pages: &Pages, serializer: S) -> Result<S::Ok, S::Error> {
        pages.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pages, D::Error> {
        let raw = BTreeMap::<String, Vec<Element>>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, elements)| {
                key.parse::<PageNumber>()
                    .map(|page| (page, elements))
                    .map_err(|_| D::Error::custom(format!("invalid page number {key:?}")))
            })
            .collect()
    }
}

/// Errors from sending through a [`SyncChannel`].
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is disconnected")]
    Disconnected,
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bidirectional, non-blocking pipe for sync envelopes.
pub trait SyncChannel: Send {
    /// Hand an envelope to the transport.
    fn send(&mut self, envelope: &SyncEnvelope) -> Result<(), ChannelError>;

    /// Take every envelope that arrived since the last poll.
    fn poll(&mut self) -> Vec<SyncEnvelope>;
}

/// Channel for an offline replica: sends go nowhere, nothing arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChannel;

impl SyncChannel for NullChannel {
    fn send(&mut self, _envelope: &SyncEnvelope) -> Result<(), ChannelError> {
        Ok(())
    }

    fn poll(&mut self) -> Vec<SyncEnvelope> {
        Vec::new()
    }
}

/// In-process broadcast hub. Every frame reaches every connected channel,
/// the sender included, like a real broadcast transport.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    peers: Arc<Mutex<Vec<Sender<String>>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new channel to the hub.
    pub fn connect(&self) -> MemoryChannel {
        let (tx, rx) = channel();
        if let Ok(mut peers) = self.peers.lock() {
            peers.push(tx);
        }
        MemoryChannel {
            hub: self.clone(),
            inbox: rx,
        }
    }

    /// Deliver a raw text frame to every connected channel.
    pub fn broadcast_raw(&self, frame: &str) -> Result<(), ChannelError> {
        let mut peers = self.peers.lock().map_err(|_| ChannelError::Disconnected)?;
        peers.retain(|peer| peer.send(frame.to_string()).is_ok());
        Ok(())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().map(|p| p.len()).unwrap_or(0)
    }
}

/// One replica's connection to a [`MemoryHub`].
#[derive(Debug)]
pub struct MemoryChannel {
    hub: MemoryHub,
    inbox: Receiver<String>,
}

impl SyncChannel for MemoryChannel {
    fn send(&mut self, envelope: &SyncEnvelope) -> Result<(), ChannelError> {
        let frame = envelope.to_json()?;
        self.hub.broadcast_raw(&frame)
    }

    fn poll(&mut self) -> Vec<SyncEnvelope> {
        let mut received = Vec::new();
        while let Ok(frame) = self.inbox.try_recv() {
            match SyncEnvelope::from_json(&frame) {
                Ok(envelope) => received.push(envelope),
                Err(e) => log::warn!("Dropping malformed sync frame: {e}"),
            }
        }
        received
    }
}

/// Room commands a client sends to the relay server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomCommand {
    /// Join a room (leaving any current one).
    Join { room: String },
    /// Leave the current room.
    Leave,
}

/// Any frame a client may send to the relay server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientFrame {
    Command(RoomCommand),
    Envelope(SyncEnvelope),
}

/// Room bookkeeping frames sent by the relay server. Sync envelopes from
/// peers are forwarded unchanged alongside these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Joined { room: String, peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Color, ElementStyle};

    fn rect() -> Element {
        Element::rectangle(40.0, 40.0, 10.0, 10.0)
            .with_id("r1")
            .with_style(ElementStyle::stroke(Color::black(), 5.0))
    }

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = SyncEnvelope::new(
            SyncEvent::Delete {
                page: 2,
                element_id: "r1".into(),
            },
            "peer-a",
        );
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "delete", "page": 2, "elementId": "r1", "origin": "peer-a"})
        );
    }

    #[test]
    fn test_page_delete_tag() {
        let envelope = SyncEnvelope::new(SyncEvent::PageDelete { page_number: 3 }, "o");
        let json = envelope.to_json().unwrap();
        assert!(json.contains(r#""type":"page-delete""#));
        assert!(json.contains(r#""pageNumber":3"#));
    }

    #[test]
    fn test_decode_add_with_nested_element() {
        let json = r##"{
            "type": "add",
            "page": 1,
            "element": {"id":"r1","type":"rectangle","x":40,"y":40,"width":10,"height":10,
                        "rotation":0,"stroke":"#000000","strokeWidth":5},
            "origin": "peer-b"
        }"##;
        let envelope = SyncEnvelope::from_json(json).unwrap();
        assert_eq!(envelope.origin, "peer-b");
        assert_eq!(envelope.event, SyncEvent::Add { page: 1, element: rect() });
    }

    #[test]
    fn test_decode_page_change() {
        let json = r#"{"type":"page-change","pages":{"1":[],"4":[{"id":"c","type":"circle","x":1,"y":2,"radius":3}]},"origin":"x"}"#;
        let envelope = SyncEnvelope::from_json(json).unwrap();
        let SyncEvent::PageChange { pages } = envelope.event else {
            panic!("expected page-change");
        };
        assert_eq!(pages.keys().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(pages[&4][0].id, "c");
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(SyncEnvelope::from_json(r#"{"type":"explode","origin":"x"}"#).is_err());
        assert!(SyncEnvelope::from_json("not json").is_err());
    }

    #[test]
    fn test_memory_hub_echoes_to_everyone() {
        let hub = MemoryHub::new();
        let mut a = hub.connect();
        let mut b = hub.connect();
        assert_eq!(hub.peer_count(), 2);

        let envelope = SyncEnvelope::new(SyncEvent::Clear { page: 1 }, "a");
        a.send(&envelope).unwrap();

        assert_eq!(a.poll(), vec![envelope.clone()]);
        assert_eq!(b.poll(), vec![envelope]);
        assert!(b.poll().is_empty());
    }

    #[test]
    fn test_memory_channel_skips_malformed_frames() {
        let hub = MemoryHub::new();
        let mut a = hub.connect();
        hub.broadcast_raw("{garbage").unwrap();
        hub.broadcast_raw(r#"{"type":"clear","page":1,"origin":"z"}"#).unwrap();
        let received = a.poll();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].origin, "z");
    }

    #[test]
    fn test_dropped_channel_is_pruned() {
        let hub = MemoryHub::new();
        let mut a = hub.connect();
        drop(hub.connect());
        a.send(&SyncEnvelope::new(SyncEvent::Clear { page: 1 }, "a")).unwrap();
        assert_eq!(hub.peer_count(), 1);
    }

    #[test]
    fn test_client_frames() {
        let join: ClientFrame = serde_json::from_str(r#"{"type":"join","room":"lobby"}"#).unwrap();
        assert_eq!(
            join,
            ClientFrame::Command(RoomCommand::Join {
                room: "lobby".into()
            })
        );

        let clear: ClientFrame =
            serde_json::from_str(r#"{"type":"clear","page":2,"origin":"a"}"#).unwrap();
        assert!(matches!(clear, ClientFrame::Envelope(_)));
    }

    #[test]
    fn test_server_frame_shape() {
        let frame = ServerFrame::Joined {
            room: "lobby".into(),
            peer_count: 2,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"joined","room":"lobby","peerCount":2}"#);
    }
}
