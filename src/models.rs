//! Wire request/response DTOs. Kept distinct from `core::types` entities:
//! these shapes describe what a client sends or what a capability endpoint
//! reports, not what the broker stores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GuestAuthRequest {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GuestAuthResponse {
    pub token: String,
    pub user: crate::core::types::User,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: String,
    pub ttl_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub status_emoji: Option<String>,
    #[serde(default)]
    pub photo_cid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_visibility")]
    pub visibility: crate::core::types::Visibility,
}

fn default_visibility() -> crate::core::types::Visibility {
    crate::core::types::Visibility::Public
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoomRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<crate::core::types::Attachment>>,
}

fn default_content_type() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub messages: Vec<crate::core::types::Message>,
}

#[derive(Debug, Deserialize)]
pub struct CursorRequest {
    pub seq: u64,
}

#[derive(Debug, Serialize)]
pub struct CursorResponse {
    pub seq: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub reactions: Vec<crate::core::types::ReactionSummary>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub meta: crate::core::types::UploadMeta,
}

#[derive(Debug, Serialize)]
pub struct CapabilitiesResponse {
    pub protocol_version: &'static str,
    pub max_message_bytes: usize,
    pub max_upload_bytes: usize,
    pub max_reactions_per_message: usize,
    pub heartbeat_period_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct DirectoryUsersResponse {
    pub users: Vec<crate::core::types::User>,
}

#[derive(Debug, Serialize)]
pub struct DirectoryRoomsResponse {
    pub rooms: Vec<crate::core::types::Room>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}
