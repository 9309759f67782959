//! Entity Store: authoritative room/membership/upload indexes. Readers
//! receive cloned snapshots safe to serialize without holding any lock,
//! the same contract rows fetched from a `rusqlite::Connection` already
//! give for free, reproduced here with `RwLock` since reads vastly
//! dominate writes.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::ids;

use super::types::{Role, Room, RoomId, UploadMeta, UserId, Visibility};

struct RoomsIndex {
    by_id: HashMap<RoomId, Room>,
    by_name_lower: HashMap<String, RoomId>,
}

pub struct EntityStore {
    rooms: RwLock<RoomsIndex>,
    members: RwLock<HashMap<RoomId, HashMap<UserId, Role>>>,
    uploads: RwLock<HashMap<String, (UploadMeta, Vec<u8>)>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(RoomsIndex {
                by_id: HashMap::new(),
                by_name_lower: HashMap::new(),
            }),
            members: RwLock::new(HashMap::new()),
            uploads: RwLock::new(HashMap::new()),
        }
    }

    pub fn create_room(
        &self,
        owner: &str,
        name: &str,
        visibility: Visibility,
        topic: &str,
    ) -> CoreResult<Room> {
        let name_lower = name.to_lowercase();
        let mut rooms = self.rooms.write().unwrap();
        if rooms.by_name_lower.contains_key(&name_lower) {
            return Err(CoreError::Conflict(format!("room '{name}' already exists")));
        }

        let room_id = ids::new_id();
        let room = Room {
            room_id: room_id.clone(),
            name: name.to_string(),
            topic: topic.to_string(),
            visibility,
            owner_id: owner.to_string(),
            created_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            member_count: 1,
            pinned_message_ids: Vec::new(),
        };
        rooms.by_name_lower.insert(name_lower, room_id.clone());
        rooms.by_id.insert(room_id.clone(), room.clone());
        drop(rooms);

        self.members
            .write()
            .unwrap()
            .entry(room_id)
            .or_default()
            .insert(owner.to_string(), Role::Owner);

        Ok(room)
    }

    pub fn rename_room(&self, room_id: &str, new_name: &str) -> CoreResult<Room> {
        let new_name_lower = new_name.to_lowercase();
        let mut rooms = self.rooms.write().unwrap();
        if let Some(existing) = rooms.by_name_lower.get(&new_name_lower)
            && existing != room_id
        {
            return Err(CoreError::Conflict(format!("room '{new_name}' already exists")));
        }
        let old_name_lower = {
            let room = rooms.by_id.get(room_id).ok_or(CoreError::NotFound)?;
            room.name.to_lowercase()
        };
        rooms.by_name_lower.remove(&old_name_lower);
        rooms.by_name_lower.insert(new_name_lower, room_id.to_string());
        let room = rooms.by_id.get_mut(room_id).ok_or(CoreError::NotFound)?;
        room.name = new_name.to_string();
        Ok(room.clone())
    }

    pub fn update_room_topic(&self, room_id: &str, topic: &str) -> CoreResult<Room> {
        let mut rooms = self.rooms.write().unwrap();
        let room = rooms.by_id.get_mut(room_id).ok_or(CoreError::NotFound)?;
        room.topic = topic.to_string();
        Ok(room.clone())
    }

    pub fn add_pin(&self, room_id: &str, message_id: &str) -> CoreResult<Room> {
        let mut rooms = self.rooms.write().unwrap();
        let room = rooms.by_id.get_mut(room_id).ok_or(CoreError::NotFound)?;
        if !room.pinned_message_ids.iter().any(|id| id == message_id) {
            room.pinned_message_ids.push(message_id.to_string());
        }
        Ok(room.clone())
    }

    pub fn remove_pin(&self, room_id: &str, message_id: &str) -> CoreResult<Room> {
        let mut rooms = self.rooms.write().unwrap();
        let room = rooms.by_id.get_mut(room_id).ok_or(CoreError::NotFound)?;
        room.pinned_message_ids.retain(|id| id != message_id);
        Ok(room.clone())
    }

    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.read().unwrap().by_id.get(room_id).cloned()
    }

    pub fn get_room_by_name(&self, name: &str) -> Option<Room> {
        let rooms = self.rooms.read().unwrap();
        let room_id = rooms.by_name_lower.get(&name.to_lowercase())?;
        rooms.by_id.get(room_id).cloned()
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.read().unwrap().by_id.values().cloned().collect();
        rooms.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        rooms
    }

    /// Idempotent: re-adding a present member is a no-op that preserves the
    /// existing role.
    pub fn add_member(&self, room_id: &str, user_id: &str, role: Role) -> CoreResult<()> {
        let mut members = self.members.write().unwrap();
        let room_members = members.entry(room_id.to_string()).or_default();
        let is_new = !room_members.contains_key(user_id);
        room_members.entry(user_id.to_string()).or_insert(role);
        drop(members);
        if is_new {
            self.sync_member_count(room_id);
        }
        Ok(())
    }

    /// Idempotent. Forbids removing the room's current owner unless
    /// `transfer_to` names another existing member, who becomes the new
    /// owner atomically.
    pub fn remove_member(
        &self,
        room_id: &str,
        user_id: &str,
        transfer_to: Option<&str>,
    ) -> CoreResult<()> {
        let mut members = self.members.write().unwrap();
        let Some(room_members) = members.get_mut(room_id) else {
            return Ok(());
        };
        if room_members.get(user_id) == Some(&Role::Owner) {
            match transfer_to {
                Some(successor) if room_members.contains_key(successor) => {
                    room_members.insert(successor.to_string(), Role::Owner);
                }
                _ => return Err(CoreError::Forbidden),
            }
        }
        let present = room_members.remove(user_id).is_some();
        drop(members);
        if present {
            if transfer_to.is_some() {
                self.set_room_owner(room_id, transfer_to.unwrap());
            }
            self.sync_member_count(room_id);
        }
        Ok(())
    }

    fn set_room_owner(&self, room_id: &str, owner_id: &str) {
        if let Some(room) = self.rooms.write().unwrap().by_id.get_mut(room_id) {
            room.owner_id = owner_id.to_string();
        }
    }

    fn sync_member_count(&self, room_id: &str) {
        let count = self
            .members
            .read()
            .unwrap()
            .get(room_id)
            .map(|m| m.len())
            .unwrap_or(0);
        if let Some(room) = self.rooms.write().unwrap().by_id.get_mut(room_id) {
            room.member_count = count;
        }
    }

    /// Only the owner may assign the `owner` role; reassigning away from
    /// the sole owner without a successor is rejected the same way
    /// `remove_member` rejects an un-transferred owner departure.
    pub fn set_role(&self, room_id: &str, acting_user: &str, target: &str, role: Role) -> CoreResult<()> {
        let mut members = self.members.write().unwrap();
        let room_members = members.get_mut(room_id).ok_or(CoreError::NotFound)?;
        let acting_role = room_members.get(acting_user).copied().ok_or(CoreError::Forbidden)?;
        if role == Role::Owner && acting_role != Role::Owner {
            return Err(CoreError::Forbidden);
        }
        if !room_members.contains_key(target) {
            return Err(CoreError::NotFound);
        }
        if role == Role::Owner {
            if let Some(prev_owner) = room_members
                .iter()
                .find(|(_, r)| **r == Role::Owner)
                .map(|(u, _)| u.clone())
                && prev_owner != target
            {
                room_members.insert(prev_owner, Role::Admin);
            }
        }
        room_members.insert(target.to_string(), role);
        Ok(())
    }

    pub fn get_role(&self, room_id: &str, user_id: &str) -> Option<Role> {
        self.members.read().unwrap().get(room_id)?.get(user_id).copied()
    }

    pub fn is_member(&self, room_id: &str, user_id: &str) -> bool {
        self.get_role(room_id, user_id).is_some()
    }

    pub fn list_members(&self, room_id: &str) -> Vec<(UserId, Role)> {
        self.members
            .read()
            .unwrap()
            .get(room_id)
            .map(|m| m.iter().map(|(u, r)| (u.clone(), *r)).collect())
            .unwrap_or_default()
    }

    /// Computes `sha256`, dedups by `cid`.
    pub fn put_blob(&self, bytes: Vec<u8>, mime_hint: &str) -> UploadMeta {
        let (cid, sha256) = ids::content_id_and_digest(&bytes);
        let mut uploads = self.uploads.write().unwrap();
        if let Some((meta, _)) = uploads.get(&cid) {
            return meta.clone();
        }
        let meta = UploadMeta {
            cid: cid.clone(),
            mime: mime_hint.to_string(),
            bytes: bytes.len() as u64,
            sha256,
        };
        uploads.insert(cid, (meta.clone(), bytes));
        meta
    }

    pub fn get_blob(&self, cid: &str) -> Option<(String, Vec<u8>)> {
        let uploads = self.uploads.read().unwrap();
        uploads.get(cid).map(|(meta, bytes)| (meta.mime.clone(), bytes.clone()))
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
