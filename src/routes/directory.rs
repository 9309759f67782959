use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{get, State};

use crate::core::Core;
use crate::models::{DirectoryRoomsResponse, DirectoryUsersResponse};

use super::BearerAuth;

#[get("/directory/users")]
pub fn directory_users(core: &State<Arc<Core>>, _auth: BearerAuth) -> Json<DirectoryUsersResponse> {
    Json(DirectoryUsersResponse { users: core.list_users() })
}

#[get("/directory/rooms")]
pub fn directory_rooms(core: &State<Arc<Core>>, _auth: BearerAuth) -> Json<DirectoryRoomsResponse> {
    Json(DirectoryRoomsResponse {
        rooms: core
            .list_rooms()
            .into_iter()
            .filter(|r| r.visibility == crate::core::types::Visibility::Public)
            .collect(),
    })
}
