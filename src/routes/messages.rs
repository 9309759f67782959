use std::sync::Arc;

use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, State};

use crate::core::types::{Message, StreamKey};
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    CursorRequest, CursorResponse, DeleteMessageRequest, EditMessageRequest, MessagePage,
    SendMessageRequest,
};
use crate::rate_limit::{RateLimitConfig, RateLimiter};

use super::{BearerAuth, ClientIp};

fn room_key(core: &Core, room_id_or_name: &str) -> CoreResult<StreamKey> {
    let room = core.resolve_room(room_id_or_name)?;
    Ok(StreamKey::Room(room.room_id))
}

#[post("/rooms/<room_id_or_name>/messages", format = "json", data = "<body>")]
pub fn send_room_message(
    core: &State<Arc<Core>>,
    rate_limiter: &State<RateLimiter>,
    rate_config: &State<RateLimitConfig>,
    ip: ClientIp,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<SendMessageRequest>,
) -> CoreResult<Created<Json<Message>>> {
    let rl = rate_limiter.check_with_info(
        &format!("send_message:{}", ip.0),
        rate_config.messages_max,
        rate_config.messages_window_secs,
    );
    if !rl.allowed {
        return Err(CoreError::RateLimited { retry_after_secs: rl.retry_after_secs });
    }
    let room = core.resolve_room(room_id_or_name)?;
    let body = body.into_inner();
    let message = core.send_room_message(
        &auth.0.user_id,
        &room.room_id,
        &body.content_type,
        &body.text,
        body.parent_id.as_deref(),
        body.attachments,
    )?;
    let location = format!("/messages/{}", message.message_id);
    Ok(Created::new(location).body(Json(message)))
}

#[get("/rooms/<room_id_or_name>/messages?<cursor>&<limit>")]
pub fn list_room_messages(
    core: &State<Arc<Core>>,
    _auth: BearerAuth,
    room_id_or_name: &str,
    cursor: Option<u64>,
    limit: Option<usize>,
) -> CoreResult<Json<MessagePage>> {
    let key = room_key(core, room_id_or_name)?;
    // `cursor` is the last seq the caller has already seen; forward_read
    // wants the first seq it hasn't, so shift it forward by one.
    let from_seq = cursor.map(|c| c + 1).unwrap_or(1);
    let messages = core.forward_read(&key, from_seq, limit.unwrap_or(50))?;
    Ok(Json(MessagePage { messages }))
}

#[get("/rooms/<room_id_or_name>/messages/backfill?<before>&<limit>")]
pub fn backfill_room_messages(
    core: &State<Arc<Core>>,
    _auth: BearerAuth,
    room_id_or_name: &str,
    before: Option<u64>,
    limit: Option<usize>,
) -> CoreResult<Json<MessagePage>> {
    let key = room_key(core, room_id_or_name)?;
    let messages = core.backfill_read(&key, before.unwrap_or(0), limit.unwrap_or(50))?;
    Ok(Json(MessagePage { messages }))
}

#[post("/rooms/<room_id_or_name>/ack", format = "json", data = "<body>")]
pub fn room_ack(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
    body: Json<CursorRequest>,
) -> CoreResult<Json<CursorResponse>> {
    let key = room_key(core, room_id_or_name)?;
    core.set_cursor(&key, &auth.0.user_id, body.seq);
    Ok(Json(CursorResponse { seq: body.seq }))
}

#[get("/rooms/<room_id_or_name>/cursor")]
pub fn room_cursor(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    room_id_or_name: &str,
) -> CoreResult<Json<CursorResponse>> {
    let key = room_key(core, room_id_or_name)?;
    Ok(Json(CursorResponse { seq: core.get_cursor(&key, &auth.0.user_id) }))
}

#[patch("/messages/<message_id>", format = "json", data = "<body>")]
pub fn edit_message(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    message_id: &str,
    body: Json<EditMessageRequest>,
) -> CoreResult<Json<Message>> {
    let key = core.locate_message(message_id)?;
    Ok(Json(core.edit_message(&auth.0.user_id, &key, message_id, &body.text)?))
}

#[delete("/messages/<message_id>", format = "json", data = "<body>")]
pub fn delete_message(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    message_id: &str,
    body: Json<DeleteMessageRequest>,
) -> CoreResult<Json<Message>> {
    let key = core.locate_message(message_id)?;
    Ok(Json(core.delete_message(&auth.0.user_id, &key, message_id, body.reason.as_deref())?))
}
