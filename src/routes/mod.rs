// Route module decomposition: each domain area in its own file.
// Shared request guards live here; route functions in submodules.

mod auth;
mod directory;
mod dm;
mod messages;
mod pins;
mod reactions;
mod rooms;
mod rtm;
mod system;
mod uploads;

pub use auth::{guest_auth, issue_ticket, get_me, update_me};
pub use directory::{directory_rooms, directory_users};
pub use dm::{dm_ack, dm_cursor, list_dm_messages, send_dm};
pub use messages::{
    backfill_room_messages, delete_message, edit_message, list_room_messages, room_ack,
    room_cursor, send_room_message,
};
pub use pins::{list_pins, pin_message, unpin_message};
pub use reactions::{add_reaction, remove_reaction};
pub use rooms::{
    ban_member, create_room, get_room, invite_member, join_room, kick_member, leave_room,
    list_rooms, set_role, update_room,
};
pub use rtm::rtm_connect;
pub use system::{capabilities, health, not_found, too_many_requests};
pub use uploads::{download_upload, upload_file};

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use std::sync::Arc;

use crate::core::types::User;
use crate::core::Core;
use crate::error::CoreError;

pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| req.remote().map(|r| r.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

/// Resolves the bearer token from `Authorization: Bearer <token>` against
/// the Identity Store and yields the authenticated user. Errors (missing
/// header, unknown/revoked token) always fail the request; there is no
/// anonymous-access path through this guard.
pub struct BearerAuth(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerAuth {
    type Error = CoreError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(core) = req.guard::<&State<Arc<Core>>>().await.succeeded() else {
            return Outcome::Error((Status::InternalServerError, CoreError::Internal("core not managed".into())));
        };
        let Some(token) = req
            .headers()
            .get_one("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
        else {
            return Outcome::Error((Status::Unauthorized, CoreError::Unauthorized));
        };
        match core.authenticate(token) {
            Ok(user) => Outcome::Success(BearerAuth(user)),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}
