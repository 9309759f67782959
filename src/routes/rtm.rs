//! Realtime Session: the WS upgrade endpoint and its per-connection loop.
//!
//! `core::session` owns the phase/heartbeat *state*; this module owns the
//! socket itself, since `core` has no business knowing about `rocket_ws`.
//! The loop shape, one `tokio::select!` racing inbound frames, outbound
//! hub events and a heartbeat tick, generalizes the teacher's
//! `EventStream!` SSE loop in `routes/stream.rs` from a broadcast receiver
//! filtered by room to a hub-attached `mpsc` channel filtered by subscription.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::{get, State};
use rocket_ws as ws;
use serde::Deserialize;

use crate::core::session::Heartbeat;
use crate::core::types::{Event, StreamKey, User};
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::ids;

/// The handshake headers a ticket/bearer auth and an Origin check both need.
/// Captured as a request guard so the route itself stays a thin dispatcher.
pub struct WsHandshake {
    origin: Option<String>,
    protocol: Option<String>,
    authorization: Option<String>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for WsHandshake {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(WsHandshake {
            origin: req.headers().get_one("Origin").map(String::from),
            protocol: req.headers().get_one("Sec-WebSocket-Protocol").map(String::from),
            authorization: req.headers().get_one("Authorization").map(String::from),
        })
    }
}

/// Resolves the authenticated user for an upgrade from, in order: the
/// `?ticket=` query parameter, a `ticket.<t>` or `bearer.<token>` entry in
/// `Sec-WebSocket-Protocol`, and finally `Authorization: Bearer <token>`.
fn resolve_upgrade_auth(core: &Core, ticket: Option<&str>, handshake: &WsHandshake) -> CoreResult<User> {
    if let Some(ticket) = ticket {
        return core.consume_ticket(ticket);
    }
    if let Some(protocol) = &handshake.protocol {
        for entry in protocol.split(',').map(str::trim) {
            if let Some(t) = entry.strip_prefix("ticket.") {
                return core.consume_ticket(t);
            }
            if let Some(token) = entry.strip_prefix("bearer.") {
                return core.authenticate(token);
            }
        }
    }
    if let Some(auth) = &handshake.authorization
        && let Some(token) = auth.strip_prefix("Bearer ")
    {
        return core.authenticate(token);
    }
    Err(CoreError::Unauthorized)
}

#[get("/rtm?<ticket>")]
pub fn rtm_connect(
    core: &State<Arc<Core>>,
    ws: ws::WebSocket,
    handshake: WsHandshake,
    ticket: Option<&str>,
) -> CoreResult<ws::Channel<'static>> {
    let user = resolve_upgrade_auth(core, ticket, &handshake)?;
    if !core.config.origin_allowed(handshake.origin.as_deref()) {
        return Err(CoreError::Forbidden);
    }

    let core = Arc::clone(core.inner());
    Ok(ws.channel(move |stream| Box::pin(run_session(core, user, stream))))
}

#[derive(Debug, Default, Deserialize)]
struct HelloSubscriptions {
    #[serde(default)]
    rooms: Vec<String>,
    #[serde(default)]
    dms: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Hello {
        #[serde(default)]
        subscriptions: HelloSubscriptions,
        #[serde(default)]
        cursors: HashMap<String, u64>,
        /// Accepted per the wire protocol but not assigned any semantics by
        /// the spec beyond its presence in the `hello` frame; recorded for
        /// forward compatibility, otherwise ignored.
        #[serde(default)]
        #[allow(dead_code)]
        want: Option<serde_json::Value>,
    },
    Ack {
        #[serde(default)]
        cursors: HashMap<String, u64>,
    },
    Pong {
        #[serde(default)]
        #[allow(dead_code)]
        ts: Option<i64>,
    },
    Typing {
        #[serde(default)]
        room_id: Option<String>,
        #[serde(default)]
        dm_peer_id: Option<String>,
        state: String,
    },
}

/// Parses an `ack`/`hello` cursor key (`room:<id-or-name>` or
/// `dm:<user_id>`) into the `StreamKey` it addresses, from the perspective
/// of `self_user`.
fn parse_cursor_key(core: &Core, self_user: &str, key: &str) -> Option<StreamKey> {
    if let Some(room) = key.strip_prefix("room:") {
        core.resolve_room(room).ok().map(|r| StreamKey::Room(r.room_id))
    } else {
        key.strip_prefix("dm:").map(|peer| StreamKey::dm(self_user, peer))
    }
}

fn apply_cursors(core: &Core, self_user: &str, cursors: &HashMap<String, u64>) {
    for (key, seq) in cursors {
        if let Some(stream_key) = parse_cursor_key(core, self_user, key) {
            core.set_cursor(&stream_key, self_user, *seq);
        }
    }
}

/// Resolves each room-id-or-name to its canonical `room_id`, silently
/// dropping names that don't resolve: an unknown room in a `hello` is not
/// fatal to the session, it simply isn't subscribed.
fn resolve_room_ids(core: &Core, rooms: &[String]) -> Vec<String> {
    rooms.iter().filter_map(|r| core.resolve_room(r).ok().map(|room| room.room_id)).collect()
}

fn ready_frame(session_id: &str, core: &Core) -> String {
    serde_json::json!({
        "type": "ready",
        "session_id": session_id,
        "heartbeat_ms": core.config.heartbeat_period.as_millis() as u64,
        "server_time": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "capabilities": ["rooms", "dms", "reactions", "pins", "typing", "presence"],
    })
    .to_string()
}

/// Per-connection task: `upgrading -> open` drives the rest of the state
/// table in `core::session` directly inline, since every transition here
/// either reads the next inbound frame, the next outbound hub event, or the
/// next heartbeat tick, there is no separate state to hand off.
async fn run_session(core: Arc<Core>, user: User, mut stream: ws::stream::DuplexStream) -> ws::result::Result<()> {
    let (tx, mut outbound) = tokio::sync::mpsc::channel::<Event>(core.config.outbound_buffer);
    let session_id = ids::new_id();
    let mut heartbeat = Heartbeat::new(core.config.heartbeat_period, core.config.missed_pings_before_close);
    let mut ticker = tokio::time::interval(core.config.heartbeat_period);
    ticker.tick().await; // first tick fires immediately; consume it so the real cadence starts at `heartbeat_period`

    let mut subscription = None;
    let mut subscribed_rooms: Vec<String> = Vec::new();
    let (_never_killed_tx, mut killed) = tokio::sync::watch::channel(false);

    stream.send(ws::Message::Text(ready_frame(&session_id, &core))).await?;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(incoming) = incoming else { break };
                let message = incoming?;
                if !message.is_text() {
                    continue;
                }
                let text = message.into_text()?;
                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Hello { subscriptions, cursors, .. }) => {
                        apply_cursors(&core, &user.user_id, &cursors);
                        let room_ids = resolve_room_ids(&core, &subscriptions.rooms);
                        let dm_user = subscriptions.dms.then_some(user.user_id.as_str());
                        // Attach the new set before dropping the old one so
                        // a reconnecting `hello` never produces a spurious
                        // offline-then-online presence flicker in between.
                        let (sub, kill_rx) = core.hub.attach_opt(tx.clone(), &room_ids, dm_user);
                        subscription = Some(sub);
                        killed = kill_rx;
                        for room_id in &room_ids {
                            core.hub.publish_room(room_id, Event::Presence { user_id: user.user_id.clone(), state: "online".into() });
                        }
                        subscribed_rooms = room_ids;
                        stream.send(ws::Message::Text(ready_frame(&session_id, &core))).await?;
                    }
                    Ok(ClientFrame::Ack { cursors }) => {
                        apply_cursors(&core, &user.user_id, &cursors);
                    }
                    Ok(ClientFrame::Pong { .. }) => {
                        heartbeat.on_pong();
                    }
                    Ok(ClientFrame::Typing { room_id, dm_peer_id, state }) => {
                        let event = Event::Typing {
                            room_id: room_id.clone(),
                            dm_peer_id: dm_peer_id.clone(),
                            user_id: user.user_id.clone(),
                            state,
                        };
                        if let Some(room_id) = room_id {
                            core.hub.publish_room(&room_id, event);
                        } else if let Some(peer) = dm_peer_id {
                            core.hub.publish_dm(&user.user_id, &peer, event);
                        }
                    }
                    Err(_) => {
                        let err = CoreError::BadRequest("malformed frame".into());
                        stream.send(ws::Message::Text(err.ws_error_frame().to_string())).await?;
                    }
                }
            }
            Some(event) = outbound.recv() => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                if stream.send(ws::Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Ok(()) = killed.changed() => {
                // Hub::send_all flips this when our outbound buffer overflowed:
                // we fell behind and the backlog was dropped, not delivered.
                if *killed.borrow() {
                    let err = CoreError::BadRequest("slow consumer".into());
                    let _ = stream.send(ws::Message::Text(err.ws_error_frame().to_string())).await;
                    let _ = stream.send(ws::Message::Close(None)).await;
                    break;
                }
            }
            _ = ticker.tick() => {
                if heartbeat.tick() {
                    break;
                }
                let ping = serde_json::json!({"type": "ping", "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)});
                if stream.send(ws::Message::Text(ping.to_string())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(subscription);
    for room_id in &subscribed_rooms {
        core.hub.publish_room(room_id, Event::Presence { user_id: user.user_id.clone(), state: "offline".into() });
    }
    Ok(())
}
