//! Canonical entity and event types, shared by every `core::*` module and
//! serialized directly to WS/HTTP clients, the same "one struct, no
//! separate DTO layer" shape used elsewhere in this crate for `Message`/`Room`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type UserId = String;
pub type RoomId = String;
pub type MessageId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Moderator,
    Member,
    Guest,
}

impl Role {
    /// `owner > admin > moderator > member > guest`.
    pub fn rank(self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Moderator => 2,
            Role::Member => 1,
            Role::Guest => 0,
        }
    }

    pub fn at_least(self, min: Role) -> bool {
        self.rank() >= min.rank()
    }

    pub fn can_purge_messages(self) -> bool {
        self.at_least(Role::Moderator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Member => "member",
            Role::Guest => "guest",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Role {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "member" => Ok(Role::Member),
            "guest" => Ok(Role::Guest),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_emoji: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub name: String,
    pub topic: String,
    pub visibility: Visibility,
    pub owner_id: UserId,
    pub created_at: String,
    pub member_count: usize,
    pub pinned_message_ids: Vec<MessageId>,
}

/// Identifies the logical ordered container a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKey {
    Room(RoomId),
    Dm(UserId, UserId),
}

impl StreamKey {
    /// Canonical unordered pair `(min(a,b), max(a,b))`.
    pub fn dm(a: &str, b: &str) -> StreamKey {
        if a <= b {
            StreamKey::Dm(a.to_string(), b.to_string())
        } else {
            StreamKey::Dm(b.to_string(), a.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: usize,
    /// Whether the requesting user has contributed to this emoji, filled in
    /// by the orchestrator per-reader, `false` by default in the stored copy.
    #[serde(default)]
    pub me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub cid: String,
    pub mime: String,
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dm_peer_id: Option<UserId>,
    pub author_id: UserId,
    pub seq: u64,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,
    pub content_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<ReactionSummary>>,
    pub tombstone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation_reason: Option<String>,
}

/// Per-message reaction state owned by the Stream Engine: a first-class
/// field rather than an ad-hoc dynamic attribute.
#[derive(Debug, Clone, Default)]
pub struct ReactionState {
    /// emoji -> set of user ids who contributed it, in insertion order so
    /// the emitted summary is stable for tests and clients alike.
    pub by_emoji: BTreeMap<String, Vec<UserId>>,
}

impl ReactionState {
    pub fn add(&mut self, emoji: &str, user: &str) -> bool {
        let users = self.by_emoji.entry(emoji.to_string()).or_default();
        if users.iter().any(|u| u == user) {
            false
        } else {
            users.push(user.to_string());
            true
        }
    }

    pub fn remove(&mut self, emoji: &str, user: &str) -> bool {
        let Some(users) = self.by_emoji.get_mut(emoji) else {
            return false;
        };
        let before = users.len();
        users.retain(|u| u != user);
        let removed = users.len() != before;
        if users.is_empty() {
            self.by_emoji.remove(emoji);
        }
        removed
    }

    pub fn emoji_count(&self) -> usize {
        self.by_emoji.len()
    }

    pub fn summary(&self, for_user: &str) -> Vec<ReactionSummary> {
        self.by_emoji
            .iter()
            .map(|(emoji, users)| ReactionSummary {
                emoji: emoji.clone(),
                count: users.len(),
                me: users.iter().any(|u| u == for_user),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "event.message.create")]
    MessageCreate { message: Message },
    #[serde(rename = "event.message.edit")]
    MessageEdit { message: Message },
    #[serde(rename = "event.message.delete")]
    MessageDelete {
        message_id: MessageId,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dm_peer_id: Option<UserId>,
        ts: String,
    },
    #[serde(rename = "event.reaction.add")]
    ReactionAdd {
        message_id: MessageId,
        emoji: String,
        counts: Vec<ReactionSummary>,
    },
    #[serde(rename = "event.reaction.remove")]
    ReactionRemove {
        message_id: MessageId,
        emoji: String,
        counts: Vec<ReactionSummary>,
    },
    #[serde(rename = "event.pin.add")]
    PinAdd {
        room_id: RoomId,
        message_id: MessageId,
    },
    #[serde(rename = "event.pin.remove")]
    PinRemove {
        room_id: RoomId,
        message_id: MessageId,
    },
    #[serde(rename = "event.typing")]
    Typing {
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dm_peer_id: Option<UserId>,
        user_id: UserId,
        state: String,
    },
    #[serde(rename = "event.presence")]
    Presence { user_id: UserId, state: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMeta {
    pub cid: String,
    pub mime: String,
    pub bytes: u64,
    pub sha256: String,
}

pub type Cursors = HashMap<UserId, u64>;
