//! Identity & Token Store: opaque access tokens, single-use RTM tickets,
//! token → user resolution. One `Mutex` guarding the whole subsystem, the
//! same way this crate guards its `rusqlite::Connection` elsewhere, and
//! this store is small enough that finer-grained locking would add
//! complexity without a measurable win.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::ids;

use super::types::{User, UserId};

#[derive(Debug, Clone)]
struct Ticket {
    user_id: UserId,
    expires_at: Instant,
    used: bool,
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    users_by_name: HashMap<String, UserId>,
    tokens: HashMap<String, UserId>,
    sessions: HashMap<UserId, Vec<String>>,
    tickets: HashMap<String, Ticket>,
}

pub struct IdentityStore {
    inner: Mutex<Inner>,
    ticket_ttl: Duration,
}

impl IdentityStore {
    pub fn new(ticket_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ticket_ttl,
        }
    }

    /// Creates or looks up a user by username, and associates a fresh
    /// opaque access token with that user.
    pub fn issue_guest(&self, username: Option<&str>) -> (String, User) {
        let mut inner = self.inner.lock().unwrap();

        let user_id = match username.and_then(|name| inner.users_by_name.get(name).cloned()) {
            Some(existing) => existing,
            None => {
                let user_id = ids::new_id();
                let display_name = username.map(String::from).unwrap_or_else(|| format!("guest-{}", &user_id[..6]));
                if let Some(name) = username {
                    inner.users_by_name.insert(name.to_string(), user_id.clone());
                }
                inner.users.insert(
                    user_id.clone(),
                    User {
                        user_id: user_id.clone(),
                        display_name,
                        photo_cid: None,
                        bio: None,
                        status_text: None,
                        status_emoji: None,
                    },
                );
                user_id
            }
        };

        let token = ids::new_id();
        inner.tokens.insert(token.clone(), user_id.clone());
        inner
            .sessions
            .entry(user_id.clone())
            .or_default()
            .push(token.clone());

        let user = inner.users.get(&user_id).cloned().expect("just inserted");
        (token, user)
    }

    /// Constant-time-ish lookup (a `HashMap` probe, same cost regardless of
    /// which token is queried; there is no early-exit string comparison
    /// over secret data here, unlike a linear scan would be).
    pub fn resolve(&self, token: &str) -> Option<User> {
        let inner = self.inner.lock().unwrap();
        let user_id = inner.tokens.get(token)?;
        inner.users.get(user_id).cloned()
    }

    pub fn mint_ticket(&self, user: &User) -> (String, u64) {
        let mut inner = self.inner.lock().unwrap();
        let ticket = ids::new_id();
        let expires_at = Instant::now() + self.ticket_ttl;
        inner.tickets.insert(
            ticket.clone(),
            Ticket {
                user_id: user.user_id.clone(),
                expires_at,
                used: false,
            },
        );
        (ticket, self.ticket_ttl.as_millis() as u64)
    }

    /// Returns the user iff the ticket exists, is unused and unexpired;
    /// atomically marks it used so a second call always returns `None`.
    /// At most one `consume_ticket` call for a given ticket ever returns
    /// a user.
    pub fn consume_ticket(&self, ticket: &str) -> Option<User> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.tickets.get_mut(ticket)?;
        if entry.used || Instant::now() >= entry.expires_at {
            return None;
        }
        entry.used = true;
        let user_id = entry.user_id.clone();
        inner.users.get(&user_id).cloned()
    }

    pub fn revoke(&self, token: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user_id) = inner.tokens.remove(token)
            && let Some(tokens) = inner.sessions.get_mut(&user_id)
        {
            tokens.retain(|t| t != token);
        }
    }

    pub fn list_sessions(&self, user_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.get(user_id).cloned().unwrap_or_default()
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.inner.lock().unwrap().users.get(user_id).cloned()
    }

    pub fn update_user<F: FnOnce(&mut User)>(&self, user_id: &str, patch: F) -> Option<User> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner.users.get_mut(user_id)?;
        patch(user);
        Some(user.clone())
    }
}
