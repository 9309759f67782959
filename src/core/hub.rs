//! Subscription Hub: routes published events to every attached session
//! that cares, without ever holding its index lock during socket I/O.
//! Generalizes the `PresenceTracker`/`PresenceGuard` pattern used
//! elsewhere in this crate (`Arc<RwLock<HashMap<...>>>` plus an RAII
//! detach guard) from presence-only fan-out to full event routing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::Sender;
use tokio::sync::watch;

use super::types::{Event, RoomId, UserId};

pub type OutboundHandle = Sender<Event>;

/// A registered session: its outbound channel, plus a kill switch the hub
/// flips when that channel overflows. `routes::rtm` races `killed.changed()`
/// in its select loop so a slow consumer is torn down instead of silently
/// losing events forever.
struct SessionEntry {
    sender: OutboundHandle,
    killed: watch::Sender<bool>,
}

struct Inner {
    by_room: HashMap<RoomId, HashMap<u64, OutboundHandle>>,
    by_dm_user: HashMap<UserId, HashMap<u64, OutboundHandle>>,
    all_sessions: HashMap<u64, SessionEntry>,
    next_session_id: u64,
}

pub struct Hub {
    inner: Mutex<Inner>,
}

/// RAII handle returned by `attach`. Dropping it, or calling `detach`
/// explicitly, removes the session from every index it was placed in.
pub struct Subscription {
    hub: Arc<Hub>,
    session_id: u64,
}

impl Subscription {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn detach(self) {
        // Drop runs `Subscription::drop`, which does the actual removal.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.detach(self.session_id);
    }
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                by_room: HashMap::new(),
                by_dm_user: HashMap::new(),
                all_sessions: HashMap::new(),
                next_session_id: 1,
            }),
        })
    }

    /// Registers a new session's outbound channel and attaches it to the
    /// given rooms and DM peer. Returns a `Subscription` that detaches the
    /// session from every index when dropped, and a `watch::Receiver` the
    /// session should race in its select loop: it flips to `true` if the
    /// session's outbound buffer ever overflows.
    pub fn attach(
        self: &Arc<Self>,
        sender: OutboundHandle,
        rooms: &[RoomId],
        user_id: &str,
    ) -> (Subscription, watch::Receiver<bool>) {
        self.attach_opt(sender, rooms, Some(user_id))
    }

    /// As `attach`, but DM enrollment is optional: a session whose `hello`
    /// set `subscriptions.dms=false` passes `None` and is never placed in
    /// `by_dm_user`.
    pub fn attach_opt(
        self: &Arc<Self>,
        sender: OutboundHandle,
        rooms: &[RoomId],
        dm_user: Option<&str>,
    ) -> (Subscription, watch::Receiver<bool>) {
        let mut inner = self.inner.lock().unwrap();
        let session_id = inner.next_session_id;
        inner.next_session_id += 1;

        let (killed_tx, killed_rx) = watch::channel(false);
        inner.all_sessions.insert(
            session_id,
            SessionEntry { sender: sender.clone(), killed: killed_tx },
        );
        for room_id in rooms {
            inner
                .by_room
                .entry(room_id.clone())
                .or_default()
                .insert(session_id, sender.clone());
        }
        if let Some(user_id) = dm_user {
            inner
                .by_dm_user
                .entry(user_id.to_string())
                .or_default()
                .insert(session_id, sender);
        }

        (
            Subscription {
                hub: self.clone(),
                session_id,
            },
            killed_rx,
        )
    }

    pub fn join_room(&self, session_id: u64, room_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let Some(sender) = inner.all_sessions.get(&session_id).map(|e| e.sender.clone()) else {
            return;
        };
        inner.by_room.entry(room_id.to_string()).or_default().insert(session_id, sender);
    }

    pub fn leave_room(&self, session_id: u64, room_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(sessions) = inner.by_room.get_mut(room_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                inner.by_room.remove(room_id);
            }
        }
    }

    fn detach(&self, session_id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.all_sessions.remove(&session_id);
        inner.by_room.retain(|_, sessions| {
            sessions.remove(&session_id);
            !sessions.is_empty()
        });
        inner.by_dm_user.retain(|_, sessions| {
            sessions.remove(&session_id);
            !sessions.is_empty()
        });
    }

    /// Snapshots the room's attached senders, releases the lock, then sends,
    /// so a slow or dead receiver never blocks the index or other sessions.
    /// Returns the number of sessions the event was handed to.
    pub fn publish_room(&self, room_id: &str, event: Event) -> usize {
        let recipients: Vec<(u64, OutboundHandle)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .by_room
                .get(room_id)
                .map(|m| m.iter().map(|(id, s)| (*id, s.clone())).collect())
                .unwrap_or_default()
        };
        let count = recipients.len();
        self.send_all(recipients, event);
        count
    }

    /// Publishes to every session belonging to either side of a DM pair.
    pub fn publish_dm(&self, user_a: &str, user_b: &str, event: Event) -> usize {
        let recipients: Vec<(u64, OutboundHandle)> = {
            let inner = self.inner.lock().unwrap();
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for user_id in [user_a, user_b] {
                if let Some(sessions) = inner.by_dm_user.get(user_id) {
                    for (session_id, sender) in sessions {
                        if seen.insert(*session_id) {
                            out.push((*session_id, sender.clone()));
                        }
                    }
                }
            }
            out
        };
        let count = recipients.len();
        self.send_all(recipients, event);
        count
    }

    /// Sends to every recipient; a full outbound buffer marks that session's
    /// kill switch instead of blocking or dropping the event forever, so its
    /// session loop tears it down as a slow consumer on its next poll.
    fn send_all(&self, recipients: Vec<(u64, OutboundHandle)>, event: Event) {
        for (session_id, sender) in recipients {
            if sender.try_send(event.clone()).is_err() {
                let inner = self.inner.lock().unwrap();
                if let Some(entry) = inner.all_sessions.get(&session_id) {
                    let _ = entry.killed.send(true);
                }
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().all_sessions.len()
    }
}
