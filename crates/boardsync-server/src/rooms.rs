//! Room registry.
//!
//! Each room has a broadcast channel that fans text frames out to its peers
//! and a replica board that follows every envelope relayed through the room,
//! so late joiners can be brought up to date.

use boardsync_core::{Board, BoardConfig, NullChannel, SyncEnvelope, SyncEvent};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Origin stamped on envelopes the relay produces itself.
pub const RELAY_ORIGIN: &str = "relay";

/// A frame on a room's broadcast channel: sender peer id and text payload.
pub type RoomFrame = (String, String);

struct Room {
    tx: broadcast::Sender<RoomFrame>,
    peers: HashSet<String>,
    replica: Mutex<Board>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let config = BoardConfig {
            history_limit: 1,
            ..BoardConfig::default()
        }
        .with_origin(RELAY_ORIGIN);
        Self {
            tx,
            peers: HashSet::new(),
            replica: Mutex::new(Board::new(config, Box::new(NullChannel))),
        }
    }
}

/// What a peer gets back when joining a room.
pub struct Joined {
    pub rx: broadcast::Receiver<RoomFrame>,
    pub peer_count: usize,
    /// The room's current pages, when it has any content.
    pub resync: Option<SyncEnvelope>,
}

pub struct Rooms {
    rooms: DashMap<String, Room>,
    capacity: usize,
}

impl Rooms {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    pub fn join(&self, room_id: &str, peer_id: &str) -> Joined {
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(self.capacity));
        room.peers.insert(peer_id.to_string());
        let resync = room.replica.get_mut().ok().and_then(|board| {
            let document = board.document();
            let has_content = document.pages.len() > 1 || document.element_count() > 0;
            has_content.then(|| {
                SyncEnvelope::new(
                    SyncEvent::PageChange {
                        pages: document.pages.clone(),
                    },
                    RELAY_ORIGIN,
                )
            })
        });
        Joined {
            rx: room.tx.subscribe(),
            peer_count: room.peers.len(),
            resync,
        }
    }

    /// Remove a peer. Empty rooms are dropped along with their replica.
    pub fn leave(&self, room_id: &str, peer_id: &str) {
        let now_empty = match self.rooms.get_mut(room_id) {
            Some(mut room) => {
                room.peers.remove(peer_id);
                room.peers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(room_id, |_, room| room.peers.is_empty());
        }
    }

    /// Fold an envelope into the room replica.
    pub fn apply(&self, room_id: &str, envelope: &SyncEnvelope) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            match room.replica.get_mut() {
                Ok(board) => {
                    board.apply_remote(envelope);
                }
                Err(_) => tracing::warn!("Replica for room {room_id} is poisoned"),
            }
        }
    }

    /// Send a text frame to every peer of a room.
    pub fn broadcast(&self, room_id: &str, from: &str, text: String) {
        if let Some(room) = self.rooms.get(room_id) {
            // No receivers is fine: the room may only hold the sender.
            let _ = room.tx.send((from.to_string(), text));
        }
    }

    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
