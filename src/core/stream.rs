//! Stream Engine: append-only ordered message history per room or DM pair.
//! One lock per stream instead of one global lock: a post in `#general`
//! never blocks a post in a DM, only posts to the same stream serialize
//! against each other.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::ids;

use super::types::{Message, MessageId, ReactionState, ReactionSummary, RoomId, StreamKey};

#[derive(Debug, Clone, Copy)]
pub struct Retention {
    pub max_messages: Option<usize>,
    pub max_age_secs: Option<i64>,
}

struct StreamState {
    messages: Vec<Message>,
    reactions: HashMap<MessageId, ReactionState>,
    cursors: HashMap<String, u64>,
    next_seq: u64,
    last_ts_millis: i64,
    /// Lowest `seq` still present after a retention sweep. `0` means nothing
    /// has ever been pruned.
    floor_seq: u64,
    retention: Option<Retention>,
}

impl StreamState {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            reactions: HashMap::new(),
            cursors: HashMap::new(),
            next_seq: 1,
            last_ts_millis: 0,
            floor_seq: 0,
            retention: None,
        }
    }

    fn next_ts(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let ts = now.max(self.last_ts_millis + 1);
        self.last_ts_millis = ts;
        chrono::DateTime::from_timestamp_millis(ts)
            .unwrap()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    fn find_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.message_id == message_id)
    }
}

pub struct StreamEngine {
    streams: RwLock<HashMap<StreamKey, Arc<Mutex<StreamState>>>>,
    /// Reverse index so `/messages/<id>` can resolve a message without the
    /// caller naming its containing room or DM pair.
    locations: RwLock<HashMap<MessageId, StreamKey>>,
}

impl StreamEngine {
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
        }
    }

    pub fn locate(&self, message_id: &str) -> Option<StreamKey> {
        self.locations.read().unwrap().get(message_id).cloned()
    }

    fn stream_for(&self, key: &StreamKey) -> Arc<Mutex<StreamState>> {
        if let Some(s) = self.streams.read().unwrap().get(key) {
            return s.clone();
        }
        let mut streams = self.streams.write().unwrap();
        streams
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(StreamState::new())))
            .clone()
    }

    pub fn configure_retention(&self, key: &StreamKey, retention: Retention) {
        let stream = self.stream_for(key);
        stream.lock().unwrap().retention = Some(retention);
    }

    /// Appends a new message, assigning the next monotonic `seq` and a
    /// `ts` that never moves backwards even across clock adjustments.
    pub fn post(
        &self,
        key: &StreamKey,
        author_id: &str,
        content_type: &str,
        text: &str,
        parent_id: Option<&str>,
        attachments: Option<Vec<super::types::Attachment>>,
    ) -> Message {
        let stream = self.stream_for(key);
        let mut state = stream.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        let ts = state.next_ts();

        // `dm_peer_id` carries the canonical "a:b" pair id rather than a
        // single user id: the stream is shared by both participants, so
        // "peer" is relative to whoever's reading; each client derives the
        // actual counterpart by excluding its own user id from the pair.
        let (room_id, dm_peer_id) = match key {
            StreamKey::Room(r) => (Some(r.clone()), None),
            StreamKey::Dm(a, b) => (None, Some(format!("{a}:{b}"))),
        };

        let message_id = ids::new_id();
        self.locations.write().unwrap().insert(message_id.clone(), key.clone());

        let message = Message {
            message_id,
            room_id,
            dm_peer_id,
            author_id: author_id.to_string(),
            seq,
            ts,
            parent_id: parent_id.map(String::from),
            content_type: content_type.to_string(),
            text: text.to_string(),
            attachments,
            reactions: None,
            tombstone: false,
            edited_at: None,
            moderation_reason: None,
        };
        state.messages.push(message.clone());
        message
    }

    /// Replaces a non-tombstoned message's text and records `edited_at`.
    /// Returns `NotFound` for an unknown or tombstoned message.
    pub fn edit(&self, key: &StreamKey, message_id: &str, new_text: &str) -> CoreResult<Message> {
        let stream = self.stream_for(key);
        let mut state = stream.lock().unwrap();
        let ts = state.next_ts();
        let message = state.find_mut(message_id).ok_or(CoreError::NotFound)?;
        if message.tombstone {
            return Err(CoreError::NotFound);
        }
        message.text = new_text.to_string();
        message.edited_at = Some(ts);
        Ok(message.clone())
    }

    /// Marks a message deleted and wipes its text and attachments: a
    /// tombstone hides content, it does not merely flag it. Readers must
    /// never be able to recover a deleted message's body from the store.
    pub fn tombstone(&self, key: &StreamKey, message_id: &str, reason: Option<&str>) -> CoreResult<Message> {
        let stream = self.stream_for(key);
        let mut state = stream.lock().unwrap();
        let message = state.find_mut(message_id).ok_or(CoreError::NotFound)?;
        message.tombstone = true;
        message.text = String::new();
        message.attachments = None;
        message.moderation_reason = reason.map(String::from);
        let result = message.clone();
        state.reactions.remove(message_id);
        Ok(result)
    }

    /// Toggles a user's reaction contribution for `emoji` on `message_id`.
    /// Returns the updated summary and whether the call added (`true`) or
    /// removed (`false`) the contribution.
    pub fn react(
        &self,
        key: &StreamKey,
        message_id: &str,
        user_id: &str,
        emoji: &str,
        add: bool,
        max_distinct_emoji: usize,
    ) -> CoreResult<(Vec<ReactionSummary>, bool)> {
        let stream = self.stream_for(key);
        let mut state = stream.lock().unwrap();
        if state.find_mut(message_id).is_none() {
            return Err(CoreError::NotFound);
        }
        let reactions = state.reactions.entry(message_id.to_string()).or_default();
        let changed = if add {
            if reactions.emoji_count() >= max_distinct_emoji && !reactions.by_emoji.contains_key(emoji) {
                return Err(CoreError::BadRequest("too many distinct reactions on this message".into()));
            }
            reactions.add(emoji, user_id)
        } else {
            reactions.remove(emoji, user_id)
        };
        let summary = reactions.summary(user_id);
        Ok((summary, changed))
    }

    pub fn reactions_for(&self, key: &StreamKey, message_id: &str, for_user: &str) -> Vec<ReactionSummary> {
        let stream = self.stream_for(key);
        let state = stream.lock().unwrap();
        state
            .reactions
            .get(message_id)
            .map(|r| r.summary(for_user))
            .unwrap_or_default()
    }

    /// Returns messages with `seq >= from_seq`, oldest first, capped at
    /// `limit`. `forward_read(stream, 1, N)` after N posts returns all of
    /// them in order: the bound is inclusive of `from_seq`, not exclusive.
    pub fn forward_read(&self, key: &StreamKey, from_seq: u64, limit: usize) -> CoreResult<Vec<Message>> {
        let stream = self.stream_for(key);
        let state = stream.lock().unwrap();
        if state.floor_seq > 0 && from_seq <= state.floor_seq {
            return Err(CoreError::HistoryPruned);
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| m.seq >= from_seq)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Returns the last `limit` messages with `seq < before`, in ascending
    /// seq order (nearest to `before` first picked, then re-sorted so the
    /// page reads top-to-bottom like the rest of the stream).
    pub fn backfill_read(&self, key: &StreamKey, before: u64, limit: usize) -> CoreResult<Vec<Message>> {
        let stream = self.stream_for(key);
        let state = stream.lock().unwrap();
        if before > 0 && before <= state.floor_seq {
            return Err(CoreError::HistoryPruned);
        }
        let mut out: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| before == 0 || m.seq < before)
            .cloned()
            .collect();
        out.reverse();
        out.truncate(limit);
        out.reverse();
        Ok(out)
    }

    pub fn set_cursor(&self, key: &StreamKey, user_id: &str, seq: u64) {
        let stream = self.stream_for(key);
        let mut state = stream.lock().unwrap();
        let entry = state.cursors.entry(user_id.to_string()).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }

    pub fn get_cursor(&self, key: &StreamKey, user_id: &str) -> u64 {
        let stream = self.stream_for(key);
        let state = stream.lock().unwrap();
        state.cursors.get(user_id).copied().unwrap_or(0)
    }

    pub fn get_message(&self, key: &StreamKey, message_id: &str) -> Option<Message> {
        let stream = self.stream_for(key);
        let state = stream.lock().unwrap();
        state.messages.iter().find(|m| m.message_id == message_id).cloned()
    }

    /// Background sweep entry point: prunes every configured stream once.
    /// `pinned_by_room` names, per room stream, the message ids a sweep must
    /// never remove (`Room.pinned_message_ids`, read fresh by the caller
    /// before each sweep since pins change between sweeps). DM streams have
    /// no pin concept and are swept unconditionally.
    /// Returns the total number of messages removed, for logging.
    pub fn sweep_retention(&self, pinned_by_room: &HashMap<RoomId, HashSet<MessageId>>) -> usize {
        let keys: Vec<StreamKey> = self.streams.read().unwrap().keys().cloned().collect();
        let mut pruned = 0;
        let empty = HashSet::new();
        for key in keys {
            let pinned = match &key {
                StreamKey::Room(room_id) => pinned_by_room.get(room_id).unwrap_or(&empty),
                StreamKey::Dm(_, _) => &empty,
            };
            let stream = self.stream_for(&key);
            let mut state = stream.lock().unwrap();
            pruned += self.maybe_prune(&mut state, pinned);
        }
        pruned
    }

    fn maybe_prune(&self, state: &mut StreamState, pinned: &HashSet<MessageId>) -> usize {
        let Some(retention) = state.retention else {
            return 0;
        };
        let prunable = |m: &Message| !pinned.contains(&m.message_id);
        let mut removed = 0;
        if let Some(max_age) = retention.max_age_secs {
            let cutoff = Utc::now().timestamp() - max_age;
            let before_len = state.messages.len();
            state.messages.retain(|m| {
                m.tombstone
                    || !state_msg_older_than(m, cutoff)
                    || !prunable(m)
            });
            removed += before_len - state.messages.len();
        }
        if let Some(max_messages) = retention.max_messages
            && state.messages.len() > max_messages
        {
            let excess = state.messages.len() - max_messages;
            let prunable_count = state.messages.iter().take(excess).filter(|m| prunable(m)).count();
            if prunable_count > 0 {
                let mut kept = 0;
                state.messages.retain(|m| {
                    if kept < excess && prunable(m) {
                        kept += 1;
                        false
                    } else {
                        true
                    }
                });
                removed += kept;
            }
        }
        if removed > 0 && let Some(lowest) = state.messages.first().map(|m| m.seq) {
            state.floor_seq = state.floor_seq.max(lowest.saturating_sub(1));
        }
        removed
    }
}

fn state_msg_older_than(m: &Message, cutoff_unix_secs: i64) -> bool {
    chrono::DateTime::parse_from_rfc3339(&m.ts)
        .map(|dt| dt.timestamp() < cutoff_unix_secs)
        .unwrap_or(false)
}

impl Default for StreamEngine {
    fn default() -> Self {
        Self::new()
    }
}
