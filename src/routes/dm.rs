use std::sync::Arc;

use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::core::types::{Message, StreamKey};
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::models::{CursorRequest, CursorResponse, MessagePage, SendMessageRequest};
use crate::rate_limit::{RateLimitConfig, RateLimiter};

use super::{BearerAuth, ClientIp};

#[post("/dms/<peer_id>/messages", format = "json", data = "<body>")]
pub fn send_dm(
    core: &State<Arc<Core>>,
    rate_limiter: &State<RateLimiter>,
    rate_config: &State<RateLimitConfig>,
    ip: ClientIp,
    auth: BearerAuth,
    peer_id: &str,
    body: Json<SendMessageRequest>,
) -> CoreResult<Created<Json<Message>>> {
    let rl = rate_limiter.check_with_info(&format!("send_dm:{}", ip.0), rate_config.dms_max, rate_config.dms_window_secs);
    if !rl.allowed {
        return Err(CoreError::RateLimited { retry_after_secs: rl.retry_after_secs });
    }
    let body = body.into_inner();
    let message = core.send_dm(&auth.0.user_id, peer_id, &body.content_type, &body.text)?;
    let location = format!("/messages/{}", message.message_id);
    Ok(Created::new(location).body(Json(message)))
}

#[get("/dms/<peer_id>/messages?<cursor>&<limit>")]
pub fn list_dm_messages(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    peer_id: &str,
    cursor: Option<u64>,
    limit: Option<usize>,
) -> CoreResult<Json<MessagePage>> {
    let key = StreamKey::dm(&auth.0.user_id, peer_id);
    let from_seq = cursor.map(|c| c + 1).unwrap_or(1);
    let messages = core.forward_read(&key, from_seq, limit.unwrap_or(50))?;
    Ok(Json(MessagePage { messages }))
}

#[post("/dms/<peer_id>/ack", format = "json", data = "<body>")]
pub fn dm_ack(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    peer_id: &str,
    body: Json<CursorRequest>,
) -> CoreResult<Json<CursorResponse>> {
    let key = StreamKey::dm(&auth.0.user_id, peer_id);
    core.set_cursor(&key, &auth.0.user_id, body.seq);
    Ok(Json(CursorResponse { seq: body.seq }))
}

#[get("/dms/<peer_id>/cursor")]
pub fn dm_cursor(core: &State<Arc<Core>>, auth: BearerAuth, peer_id: &str) -> Json<CursorResponse> {
    let key = StreamKey::dm(&auth.0.user_id, peer_id);
    Json(CursorResponse { seq: core.get_cursor(&key, &auth.0.user_id) })
}
