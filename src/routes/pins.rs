use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{delete, get, post, State};

use crate::core::types::Room;
use crate::core::Core;
use crate::error::CoreResult;

use super::BearerAuth;

#[get("/rooms/<room_id_or_name>/pins")]
pub fn list_pins(core: &State<Arc<Core>>, _auth: BearerAuth, room_id_or_name: &str) -> CoreResult<Json<Room>> {
    Ok(Json(core.resolve_room(room_id_or_name)?))
}

#[post("/rooms/<room_id_or_name>/pins/<message_id>")]
pub fn pin_message(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    message_id: &str,
) -> CoreResult<Json<Room>> {
    let room = core.resolve_room(room_id_or_name)?;
    Ok(Json(core.pin_message(&auth.0.user_id, &room.room_id, message_id)?))
}

#[delete("/rooms/<room_id_or_name>/pins/<message_id>")]
pub fn unpin_message(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    message_id: &str,
) -> CoreResult<Json<Room>> {
    let room = core.resolve_room(room_id_or_name)?;
    Ok(Json(core.unpin_message(&auth.0.user_id, &room.room_id, message_id)?))
}
