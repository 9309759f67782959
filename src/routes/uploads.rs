use std::sync::Arc;

use rocket::data::{Data, ToByteUnit};
use rocket::http::ContentType;
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::models::UploadResponse;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

use super::{BearerAuth, ClientIp};

/// Accepts a raw request body and stores it as a content-addressed blob.
///
/// The body is read as an opaque byte stream regardless of the declared
/// `Content-Type` (multipart bodies are stored verbatim, boundary and all,
/// rather than parsed into parts; the core only ever deals in bytes plus
/// a mime hint).
#[post("/uploads", data = "<body>")]
pub async fn upload_file(
    core: &State<Arc<Core>>,
    rate_limiter: &State<RateLimiter>,
    rate_config: &State<RateLimitConfig>,
    ip: ClientIp,
    _auth: BearerAuth,
    content_type: Option<&ContentType>,
    body: Data<'_>,
) -> CoreResult<Created<Json<UploadResponse>>> {
    let rl = rate_limiter.check_with_info(&format!("upload:{}", ip.0), rate_config.files_max, rate_config.files_window_secs);
    if !rl.allowed {
        return Err(CoreError::RateLimited { retry_after_secs: rl.retry_after_secs });
    }
    let limit = (core.config.max_upload_bytes as u64).bytes();
    let capped = body
        .open(limit)
        .into_bytes()
        .await
        .map_err(|e| CoreError::Internal(format!("failed to read upload body: {e}")))?;
    if !capped.is_complete() {
        return Err(CoreError::PayloadTooLarge);
    }
    let mime = content_type.map(|ct| ct.to_string()).unwrap_or_else(|| "application/octet-stream".to_string());
    let meta = core.put_blob(capped.into_inner(), &mime)?;
    let location = format!("/media/{}", meta.cid);
    Ok(Created::new(location).body(Json(UploadResponse { meta })))
}

/// `HEAD /media/<cid>` is served automatically by Rocket's default HEAD
/// handling for this GET route (body stripped, headers kept).
#[get("/media/<cid>")]
pub fn download_upload(core: &State<Arc<Core>>, cid: &str) -> CoreResult<(ContentType, Vec<u8>)> {
    let (mime, bytes) = core.get_blob(cid)?;
    let content_type = ContentType::parse_flexible(&mime).unwrap_or(ContentType::Binary);
    Ok((content_type, bytes))
}
