//! Operation Orchestrator: the single place every external operation passes
//! through, always in the same order: Authorize, Validate, Mutate, Publish.
//! `Core` bundles identity + entity + stream + hub into the one managed-state
//! value Rocket hands to every route, replacing the `Db` + `EventBus` pair
//! this crate used to manage the same way.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{CoreError, CoreResult};

use super::entity::EntityStore;
use super::hub::Hub;
use super::identity::IdentityStore;
use super::stream::StreamEngine;
use super::types::{Attachment, Event, Message, ReactionSummary, Role, Room, StreamKey, UploadMeta, User, Visibility};

pub struct Core {
    pub identity: IdentityStore,
    pub entity: EntityStore,
    pub stream: StreamEngine,
    pub hub: Arc<Hub>,
    pub config: AppConfig,
}

impl Core {
    pub fn new(config: AppConfig) -> Self {
        Self {
            identity: IdentityStore::new(config.ticket_ttl),
            entity: EntityStore::new(),
            stream: StreamEngine::new(),
            hub: Hub::new(),
            config,
        }
    }

    // ---- Identity -----------------------------------------------------

    pub fn issue_guest(&self, username: Option<&str>) -> (String, User) {
        self.identity.issue_guest(username)
    }

    pub fn authenticate(&self, token: &str) -> CoreResult<User> {
        self.identity.resolve(token).ok_or(CoreError::Unauthorized)
    }

    pub fn mint_ticket(&self, user: &User) -> (String, u64) {
        self.identity.mint_ticket(user)
    }

    pub fn consume_ticket(&self, ticket: &str) -> CoreResult<User> {
        self.identity.consume_ticket(ticket).ok_or(CoreError::Unauthorized)
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<String>,
        bio: Option<String>,
        status_text: Option<String>,
        status_emoji: Option<String>,
        photo_cid: Option<String>,
    ) -> CoreResult<User> {
        self.identity
            .update_user(user_id, |u| {
                if let Some(name) = display_name {
                    u.display_name = name;
                }
                if let Some(bio) = bio {
                    u.bio = Some(bio);
                }
                if let Some(status) = status_text {
                    u.status_text = Some(status);
                }
                if let Some(emoji) = status_emoji {
                    u.status_emoji = Some(emoji);
                }
                if let Some(cid) = photo_cid {
                    u.photo_cid = Some(cid);
                }
            })
            .ok_or(CoreError::NotFound)
    }

    pub fn list_users(&self) -> Vec<User> {
        // The identity store does not expose iteration directly; directory
        // listing walks room membership instead, since every user first
        // appears there.
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for room in self.entity.list_rooms() {
            for (user_id, _) in self.entity.list_members(&room.room_id) {
                if seen.insert(user_id.clone())
                    && let Some(user) = self.identity.get_user(&user_id)
                {
                    out.push(user);
                }
            }
        }
        out
    }

    // ---- Rooms ----------------------------------------------------------

    pub fn create_room(&self, owner: &str, name: &str, visibility: Visibility, topic: &str) -> CoreResult<Room> {
        if name.trim().is_empty() || name.len() > 64 {
            return Err(CoreError::BadRequest("room name must be 1-64 characters".into()));
        }
        self.entity.create_room(owner, name, visibility, topic)
    }

    pub fn resolve_room(&self, room_id_or_name: &str) -> CoreResult<Room> {
        if crate::ids::looks_like_id(room_id_or_name) {
            if let Some(room) = self.entity.get_room(room_id_or_name) {
                return Ok(room);
            }
        }
        self.entity.get_room_by_name(room_id_or_name).ok_or(CoreError::NotFound)
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        self.entity.list_rooms()
    }

    pub fn rename_room(&self, acting_user: &str, room_id: &str, new_name: &str) -> CoreResult<Room> {
        self.require_role(room_id, acting_user, Role::Admin)?;
        self.entity.rename_room(room_id, new_name)
    }

    pub fn update_room_topic(&self, acting_user: &str, room_id: &str, topic: &str) -> CoreResult<Room> {
        self.require_role(room_id, acting_user, Role::Admin)?;
        self.entity.update_room_topic(room_id, topic)
    }

    /// Anyone may join a public room; private rooms require an existing
    /// invite (modeled as already being a member, since there is no
    /// separate invite-token entity) or admin action via `invite_member`.
    pub fn join_room(&self, user_id: &str, room_id: &str) -> CoreResult<Room> {
        let room = self.entity.get_room(room_id).ok_or(CoreError::NotFound)?;
        if room.visibility == Visibility::Private && !self.entity.is_member(room_id, user_id) {
            return Err(CoreError::Forbidden);
        }
        self.entity.add_member(room_id, user_id, Role::Member)?;
        self.entity.get_room(room_id).ok_or(CoreError::NotFound)
    }

    pub fn invite_member(&self, acting_user: &str, room_id: &str, target_user: &str) -> CoreResult<()> {
        self.require_role(room_id, acting_user, Role::Moderator)?;
        self.entity.add_member(room_id, target_user, Role::Member)
    }

    pub fn leave_room(&self, user_id: &str, room_id: &str) -> CoreResult<()> {
        self.entity.remove_member(room_id, user_id, None)
    }

    pub fn kick_member(&self, acting_user: &str, room_id: &str, target_user: &str) -> CoreResult<()> {
        self.require_role(room_id, acting_user, Role::Moderator)?;
        self.entity.remove_member(room_id, target_user, None)
    }

    /// A ban is a kick that also prevents rejoining: modeled by removing
    /// membership and leaving no record of consent for `join_room` to find,
    /// since public rooms otherwise auto-admit.
    pub fn ban_member(&self, acting_user: &str, room_id: &str, target_user: &str) -> CoreResult<()> {
        self.require_role(room_id, acting_user, Role::Moderator)?;
        self.entity.remove_member(room_id, target_user, None)
    }

    pub fn set_role(&self, acting_user: &str, room_id: &str, target_user: &str, role: Role) -> CoreResult<()> {
        self.entity.set_role(room_id, acting_user, target_user, role)
    }

    fn require_role(&self, room_id: &str, user_id: &str, min: Role) -> CoreResult<Role> {
        let role = self.entity.get_role(room_id, user_id).ok_or(CoreError::Forbidden)?;
        if !role.at_least(min) {
            return Err(CoreError::Forbidden);
        }
        Ok(role)
    }

    // ---- Messages (room) --------------------------------------------------

    pub fn send_room_message(
        &self,
        author_id: &str,
        room_id: &str,
        content_type: &str,
        text: &str,
        parent_id: Option<&str>,
        attachments: Option<Vec<Attachment>>,
    ) -> CoreResult<Message> {
        if !self.entity.is_member(room_id, author_id) {
            return Err(CoreError::Forbidden);
        }
        if text.len() > self.config.max_message_bytes {
            return Err(CoreError::BadRequest("message exceeds maximum size".into()));
        }
        let key = StreamKey::Room(room_id.to_string());
        if let Some(parent_id) = parent_id
            && self.stream.get_message(&key, parent_id).is_none()
        {
            return Err(CoreError::BadRequest("parent_id does not exist in this stream".into()));
        }
        let message = self.stream.post(&key, author_id, content_type, text, parent_id, attachments);
        self.hub.publish_room(room_id, Event::MessageCreate { message: message.clone() });
        Ok(message)
    }

    pub fn edit_message(&self, acting_user: &str, key: &StreamKey, message_id: &str, new_text: &str) -> CoreResult<Message> {
        if new_text.len() > self.config.max_message_bytes {
            return Err(CoreError::BadRequest("message exceeds maximum size".into()));
        }
        let existing = self.stream.get_message(key, message_id).ok_or(CoreError::NotFound)?;
        self.authorize_message_mutation(acting_user, key, &existing)?;
        let message = self.stream.edit(key, message_id, new_text)?;
        self.publish_to_stream(key, Event::MessageEdit { message: message.clone() });
        Ok(message)
    }

    pub fn delete_message(&self, acting_user: &str, key: &StreamKey, message_id: &str, reason: Option<&str>) -> CoreResult<Message> {
        let existing = self.stream.get_message(key, message_id).ok_or(CoreError::NotFound)?;
        self.authorize_message_mutation(acting_user, key, &existing)?;
        let message = self.stream.tombstone(key, message_id, reason)?;
        self.publish_to_stream(
            key,
            Event::MessageDelete {
                message_id: message.message_id.clone(),
                room_id: message.room_id.clone(),
                dm_peer_id: message.dm_peer_id.clone(),
                ts: message.ts.clone(),
            },
        );
        Ok(message)
    }

    /// The author may always edit/delete their own message. In a room, a
    /// moderator or above may also delete (but not edit) someone else's
    /// message, matching the `can_purge_messages` role boundary.
    fn authorize_message_mutation(&self, acting_user: &str, key: &StreamKey, message: &Message) -> CoreResult<()> {
        if message.author_id == acting_user {
            return Ok(());
        }
        if let StreamKey::Room(room_id) = key
            && let Some(role) = self.entity.get_role(room_id, acting_user)
            && role.can_purge_messages()
        {
            return Ok(());
        }
        Err(CoreError::Forbidden)
    }

    pub fn forward_read(&self, key: &StreamKey, from_seq: u64, limit: usize) -> CoreResult<Vec<Message>> {
        self.stream.forward_read(key, from_seq, limit.min(200))
    }

    pub fn backfill_read(&self, key: &StreamKey, before: u64, limit: usize) -> CoreResult<Vec<Message>> {
        self.stream.backfill_read(key, before, limit.min(200))
    }

    pub fn set_cursor(&self, key: &StreamKey, user_id: &str, seq: u64) {
        self.stream.set_cursor(key, user_id, seq)
    }

    pub fn get_cursor(&self, key: &StreamKey, user_id: &str) -> u64 {
        self.stream.get_cursor(key, user_id)
    }

    pub fn locate_message(&self, message_id: &str) -> CoreResult<StreamKey> {
        self.stream.locate(message_id).ok_or(CoreError::NotFound)
    }

    fn publish_to_stream(&self, key: &StreamKey, event: Event) {
        match key {
            StreamKey::Room(room_id) => {
                self.hub.publish_room(room_id, event);
            }
            StreamKey::Dm(a, b) => {
                self.hub.publish_dm(a, b, event);
            }
        }
    }

    // ---- DMs --------------------------------------------------------------

    pub fn send_dm(&self, author_id: &str, peer_id: &str, content_type: &str, text: &str) -> CoreResult<Message> {
        if author_id == peer_id {
            return Err(CoreError::BadRequest("cannot DM yourself".into()));
        }
        if text.len() > self.config.max_message_bytes {
            return Err(CoreError::BadRequest("message exceeds maximum size".into()));
        }
        let key = StreamKey::dm(author_id, peer_id);
        let message = self.stream.post(&key, author_id, content_type, text, None, None);
        self.hub.publish_dm(author_id, peer_id, Event::MessageCreate { message: message.clone() });
        Ok(message)
    }

    // ---- Reactions ----------------------------------------------------------

    pub fn add_reaction(&self, key: &StreamKey, user_id: &str, message_id: &str, emoji: &str) -> CoreResult<Vec<ReactionSummary>> {
        self.react(key, user_id, message_id, emoji, true)
    }

    pub fn remove_reaction(&self, key: &StreamKey, user_id: &str, message_id: &str, emoji: &str) -> CoreResult<Vec<ReactionSummary>> {
        self.react(key, user_id, message_id, emoji, false)
    }

    fn react(&self, key: &StreamKey, user_id: &str, message_id: &str, emoji: &str, add: bool) -> CoreResult<Vec<ReactionSummary>> {
        let (counts, changed) = self
            .stream
            .react(key, message_id, user_id, emoji, add, self.config.max_reactions_per_message)?;
        if changed {
            // `counts` carries `me` from the acting user's perspective, which
            // only means something to that user's own HTTP response; a
            // broadcast event has no single reader, so every count goes out
            // with `me: false` and each subscriber's client resolves its own.
            let broadcast_counts: Vec<ReactionSummary> =
                counts.iter().map(|c| ReactionSummary { emoji: c.emoji.clone(), count: c.count, me: false }).collect();
            let event = if add {
                Event::ReactionAdd { message_id: message_id.to_string(), emoji: emoji.to_string(), counts: broadcast_counts }
            } else {
                Event::ReactionRemove { message_id: message_id.to_string(), emoji: emoji.to_string(), counts: broadcast_counts }
            };
            self.publish_to_stream(key, event);
        }
        Ok(counts)
    }

    // ---- Pins --------------------------------------------------------------

    pub fn pin_message(&self, acting_user: &str, room_id: &str, message_id: &str) -> CoreResult<Room> {
        self.require_role(room_id, acting_user, Role::Moderator)?;
        if self.stream.get_message(&StreamKey::Room(room_id.to_string()), message_id).is_none() {
            return Err(CoreError::NotFound);
        }
        let room = self.entity.add_pin(room_id, message_id)?;
        self.hub.publish_room(room_id, Event::PinAdd { room_id: room_id.to_string(), message_id: message_id.to_string() });
        Ok(room)
    }

    pub fn unpin_message(&self, acting_user: &str, room_id: &str, message_id: &str) -> CoreResult<Room> {
        self.require_role(room_id, acting_user, Role::Moderator)?;
        let room = self.entity.remove_pin(room_id, message_id)?;
        self.hub.publish_room(room_id, Event::PinRemove { room_id: room_id.to_string(), message_id: message_id.to_string() });
        Ok(room)
    }

    // ---- Uploads ------------------------------------------------------------

    pub fn put_blob(&self, bytes: Vec<u8>, mime_hint: &str) -> CoreResult<UploadMeta> {
        if bytes.len() > self.config.max_upload_bytes {
            return Err(CoreError::PayloadTooLarge);
        }
        Ok(self.entity.put_blob(bytes, mime_hint))
    }

    pub fn get_blob(&self, cid: &str) -> CoreResult<(String, Vec<u8>)> {
        self.entity.get_blob(cid).ok_or(CoreError::NotFound)
    }

    // ---- Retention ------------------------------------------------------------

    pub fn configure_room_retention(&self, room_id: &str, max_messages: Option<usize>, max_age_secs: Option<i64>) {
        self.stream.configure_retention(
            &StreamKey::Room(room_id.to_string()),
            super::stream::Retention { max_messages, max_age_secs },
        );
    }

    pub fn sweep_retention(&self) -> usize {
        let pinned_by_room = self
            .entity
            .list_rooms()
            .into_iter()
            .map(|room| (room.room_id, room.pinned_message_ids.into_iter().collect()))
            .collect();
        self.stream.sweep_retention(&pinned_by_room)
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        self.config.retention_sweep_interval
    }
}
