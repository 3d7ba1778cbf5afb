//! WebSocket connection handling.

use crate::rooms::{RoomFrame, Rooms};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use boardsync_core::{ClientFrame, RoomCommand, ServerFrame};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Sender = SplitSink<WebSocket, Message>;

pub async fn ws_handler(ws: WebSocketUpgrade, State(rooms): State<Arc<Rooms>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, rooms))
}

/// Serialize and send one frame. Returns false once the socket is gone.
async fn send_json<T: Serialize>(sender: &mut Sender, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode frame: {}", e);
            true
        }
    }
}

fn to_text<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value)
        .inspect_err(|e| warn!("Failed to encode frame: {}", e))
        .ok()
}

struct Session {
    peer_id: String,
    room: Option<String>,
    rx: Option<broadcast::Receiver<RoomFrame>>,
}

impl Session {
    fn leave(&mut self, rooms: &Rooms) {
        if let Some(room) = self.room.take() {
            rooms.leave(&room, &self.peer_id);
            if let Some(text) = to_text(&ServerFrame::PeerLeft {
                peer_id: self.peer_id.clone(),
            }) {
                rooms.broadcast(&room, &self.peer_id, text);
            }
            info!("Peer {} left room {}", self.peer_id, room);
        }
        self.rx = None;
    }
}

async fn handle_socket(socket: WebSocket, rooms: Arc<Rooms>) {
    let mut session = Session {
        peer_id: Uuid::new_v4().to_string(),
        room: None,
        rx: None,
    };
    info!("New connection: {}", session.peer_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_text(&text, &mut session, &rooms, &mut sender).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", session.peer_id, e);
                        break;
                    }
                }
            }

            frame = async {
                match &mut session.rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match frame {
                    Ok((from, text)) => {
                        if from != session.peer_id
                            && sender.send(Message::Text(text.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Peer {} lagged, {} frames skipped", session.peer_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => session.rx = None,
                }
            }
        }
    }

    session.leave(&rooms);
    info!("Connection closed: {}", session.peer_id);
}

/// Handle one text frame from the client. Returns false when the connection
/// should close.
async fn handle_text(text: &str, session: &mut Session, rooms: &Rooms, sender: &mut Sender) -> bool {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Invalid frame from {}: {}", session.peer_id, e);
            return send_json(
                sender,
                &ServerFrame::Error {
                    message: format!("Invalid frame: {e}"),
                },
            )
            .await;
        }
    };

    match frame {
        ClientFrame::Command(RoomCommand::Join { room }) => {
            session.leave(rooms);
            let joined = rooms.join(&room, &session.peer_id);
            session.rx = Some(joined.rx);
            session.room = Some(room.clone());

            let ack = ServerFrame::Joined {
                room: room.clone(),
                peer_count: joined.peer_count,
            };
            if !send_json(sender, &ack).await {
                return false;
            }
            if let Some(resync) = joined.resync {
                if !send_json(sender, &resync).await {
                    return false;
                }
            }
            if let Some(text) = to_text(&ServerFrame::PeerJoined {
                peer_id: session.peer_id.clone(),
            }) {
                rooms.broadcast(&room, &session.peer_id, text);
            }
            info!("Peer {} joined room {}", session.peer_id, room);
            true
        }
        ClientFrame::Command(RoomCommand::Leave) => {
            session.leave(rooms);
            true
        }
        ClientFrame::Envelope(envelope) => {
            let Some(room) = session.room.as_deref() else {
                return send_json(
                    sender,
                    &ServerFrame::Error {
                        message: "Join a room before sending sync events".to_string(),
                    },
                )
                .await;
            };
            debug!("{} event from {} in {}", envelope.event.name(), session.peer_id, room);
            rooms.apply(room, &envelope);
            rooms.broadcast(room, &session.peer_id, text.to_string());
            true
        }
    }
}
