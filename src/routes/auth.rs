use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{get, patch, post, State};

use crate::core::Core;
use crate::error::CoreResult;
use crate::models::{GuestAuthRequest, GuestAuthResponse, TicketResponse, UpdateProfileRequest};

use super::BearerAuth;

#[post("/auth/guest", format = "json", data = "<body>")]
pub fn guest_auth(core: &State<Arc<Core>>, body: Json<GuestAuthRequest>) -> Json<GuestAuthResponse> {
    let (token, user) = core.issue_guest(body.username.as_deref());
    Json(GuestAuthResponse { token, user })
}

#[post("/rtm/ticket")]
pub fn issue_ticket(core: &State<Arc<Core>>, auth: BearerAuth) -> Json<TicketResponse> {
    let (ticket, ttl_ms) = core.mint_ticket(&auth.0);
    Json(TicketResponse { ticket, ttl_ms })
}

#[get("/users/me")]
pub fn get_me(auth: BearerAuth) -> Json<crate::core::types::User> {
    Json(auth.0)
}

#[patch("/users/me", format = "json", data = "<body>")]
pub fn update_me(
    core: &State<Arc<Core>>,
    auth: BearerAuth,
    body: Json<UpdateProfileRequest>,
) -> CoreResult<Json<crate::core::types::User>> {
    let body = body.into_inner();
    let user = core.update_profile(
        &auth.0.user_id,
        body.display_name,
        body.bio,
        body.status_text,
        body.status_emoji,
        body.photo_cid,
    )?;
    Ok(Json(user))
}
