use std::sync::Arc;

use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, State};

use crate::core::types::{Role, Room};
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::models::{CreateRoomRequest, InviteRequest, SetRoleRequest, UpdateRoomRequest};
use crate::rate_limit::{RateLimitConfig, RateLimiter};

use super::{BearerAuth, ClientIp};

#[post("/rooms", format = "json", data = "<body>")]
pub fn create_room(
    core: &State<Arc<Core>>,
    rate_limiter: &State<RateLimiter>,
    rate_config: &State<RateLimitConfig>,
    ip: ClientIp,
    auth: BearerAuth,
    body: Json<CreateRoomRequest>,
) -> CoreResult<Created<Json<Room>>> {
    let rl = rate_limiter.check_with_info(&format!("create_room:{}", ip.0), rate_config.rooms_max, rate_config.rooms_window_secs);
    if !rl.allowed {
        return Err(CoreError::RateLimited { retry_after_secs: rl.retry_after_secs });
    }
    let body = body.into_inner();
    let room = core.create_room(&auth.0.user_id, &body.name, body.visibility, &body.topic)?;
    let location = format!("/rooms/{}", room.room_id);
    Ok(Created::new(location).body(Json(room)))
}

#[get("/rooms")]
pub fn list_rooms(core: &State<Arc<Core>>, _auth: BearerAuth) -> Json<Vec<Room>> {
    Json(core.list_rooms())
}

#[get("/rooms/<room_id_or_name>")]
pub fn get_room(core: &State<Arc<Core>>, _auth: BearerAuth, room_id_or_name: &str) -> CoreResult<Json<Room>> {
    Ok(Json(core.resolve_room(room_id_or_name)?))
}

#[patch("/rooms/<room_id_or_name>", format = "json", data = "<body>")]
pub fn update_room(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<UpdateRoomRequest>,
) -> CoreResult<Json<Room>> {
    let room = core.resolve_room(room_id_or_name)?;
    let body = body.into_inner();
    if let Some(name) = body.name {
        core.rename_room(&auth.0.user_id, &room.room_id, &name)?;
    }
    let room = if let Some(topic) = body.topic {
        core.update_room_topic(&auth.0.user_id, &room.room_id, &topic)?
    } else {
        core.resolve_room(&room.room_id)?
    };
    Ok(Json(room))
}

#[post("/rooms/<room_id_or_name>/join")]
pub fn join_room(core: &State<Arc<Core>>, auth: BearerAuth, room_id_or_name: &str) -> CoreResult<Json<Room>> {
    let room = core.resolve_room(room_id_or_name)?;
    Ok(Json(core.join_room(&auth.0.user_id, &room.room_id)?))
}

#[post("/rooms/<room_id_or_name>/leave")]
pub fn leave_room(core: &State<Arc<Core>>, auth: BearerAuth, room_id_or_name: &str) -> CoreResult<Json<serde_json::Value>> {
    let room = core.resolve_room(room_id_or_name)?;
    core.leave_room(&auth.0.user_id, &room.room_id)?;
    Ok(Json(serde_json::json!({"left": true})))
}

#[post("/rooms/<room_id_or_name>/invite", format = "json", data = "<body>")]
pub fn invite_member(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<InviteRequest>,
) -> CoreResult<Json<serde_json::Value>> {
    let room = core.resolve_room(room_id_or_name)?;
    core.invite_member(&auth.0.user_id, &room.room_id, &body.user_id)?;
    Ok(Json(serde_json::json!({"invited": true})))
}

#[post("/rooms/<room_id_or_name>/kick", format = "json", data = "<body>")]
pub fn kick_member(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<InviteRequest>,
) -> CoreResult<Json<serde_json::Value>> {
    let room = core.resolve_room(room_id_or_name)?;
    core.kick_member(&auth.0.user_id, &room.room_id, &body.user_id)?;
    Ok(Json(serde_json::json!({"kicked": true})))
}

#[delete("/rooms/<room_id_or_name>/bans", format = "json", data = "<body>")]
pub fn ban_member(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<InviteRequest>,
) -> CoreResult<Json<serde_json::Value>> {
    let room = core.resolve_room(room_id_or_name)?;
    core.ban_member(&auth.0.user_id, &room.room_id, &body.user_id)?;
    Ok(Json(serde_json::json!({"banned": true})))
}

#[post("/rooms/<room_id_or_name>/roles", format = "json", data = "<body>")]
pub fn set_role(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<SetRoleRequest>,
) -> CoreResult<Json<serde_json::Value>> {
    let room = core.resolve_room(room_id_or_name)?;
    let role = parse_role(&body.role)?;
    core.set_role(&auth.0.user_id, &room.room_id, &body.user_id, role)?;
    Ok(Json(serde_json::json!({"role": body.role})))
}

fn parse_role(s: &str) -> CoreResult<Role> {
    s.parse().map_err(|_| CoreError::BadRequest(format!("unknown role '{s}'")))
}
