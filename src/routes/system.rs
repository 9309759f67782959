use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{get, State};

use crate::core::Core;
use crate::models::{CapabilitiesResponse, HealthResponse};

#[get("/health")]
pub fn health(core: &State<Arc<Core>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: core.hub.session_count(),
    })
}

#[get("/meta/capabilities")]
pub fn capabilities(core: &State<Arc<Core>>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        protocol_version: "1",
        max_message_bytes: core.config.max_message_bytes,
        max_upload_bytes: core.config.max_upload_bytes,
        max_reactions_per_message: core.config.max_reactions_per_message,
        heartbeat_period_secs: core.config.heartbeat_period.as_secs(),
    })
}

#[rocket::catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": {"code": "rate_limited", "message": "too many requests"}}))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": {"code": "not_found", "message": "resource not found"}}))
}
