use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{delete, post, State};

use crate::core::Core;
use crate::error::CoreResult;
use crate::models::{ReactionRequest, ReactionResponse};

use super::BearerAuth;

#[post("/messages/<message_id>/reactions", format = "json", data = "<body>")]
pub fn add_reaction(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    message_id: &str,
    body: Json<ReactionRequest>,
) -> CoreResult<Json<ReactionResponse>> {
    let key = core.locate_message(message_id)?;
    let reactions = core.add_reaction(&key, &auth.0.user_id, message_id, &body.emoji)?;
    Ok(Json(ReactionResponse { reactions }))
}

#[delete("/messages/<message_id>/reactions", format = "json", data = "<body>")]
pub fn remove_reaction(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    message_id: &str,
    body: Json<ReactionRequest>,
) -> CoreResult<Json<ReactionResponse>> {
    let key = core.locate_message(message_id)?;
    let reactions = core.remove_reaction(&key, &auth.0.user_id, message_id, &body.emoji)?;
    Ok(Json(ReactionResponse { reactions }))
}
