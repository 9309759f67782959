//! Open Rooms Chat (ORC) server: a non-federated JSON-over-HTTP+WebSocket
//! chat broker. `core::Core` bundles the Identity & Token Store, Entity
//! Store, Stream Engine and Subscription Hub behind one
//! Authorize/Validate/Mutate/Publish orchestrator; this crate's top level
//! just wires that value into Rocket as managed state and mounts
//! `routes::*` on top of it, the same "one value instantiated at process
//! start" shape the teacher used for its `Db` + `EventBus` pair.

pub mod config;
pub mod core;
pub mod error;
pub mod ids;
pub mod models;
pub mod rate_limit;
pub mod retention;
pub mod routes;

use std::sync::Arc;

use rocket_cors::CorsOptions;

use config::AppConfig;
use core::Core;
use rate_limit::{RateLimitConfig, RateLimiter};

/// Builds the Rocket instance from environment configuration, the
/// entry point `main.rs` launches.
pub fn rocket() -> rocket::Rocket<rocket::Build> {
    build_rocket(AppConfig::from_env(), RateLimitConfig::from_env())
}

/// As `rocket()`, but with explicit config: what `tests/integration`
/// uses to get a deterministic `AppConfig` per test (short ticket TTLs,
/// tight rate limits) without touching process environment.
pub fn rocket_with_config(config: AppConfig, rate_limit_config: RateLimitConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(config, rate_limit_config)
}

fn build_rocket(config: AppConfig, rate_limit_config: RateLimitConfig) -> rocket::Rocket<rocket::Build> {
    let port = config.port;
    let max_upload_bytes = config.max_upload_bytes;
    let rocket_log_level = match config.log_level.as_str() {
        "debug" => "debug",
        "warn" => "critical",
        "error" => "off",
        _ => "normal",
    };

    let core = Arc::new(Core::new(config));
    let retention_core = core.clone();
    let rate_limiter = RateLimiter::new();

    let cors = CorsOptions::default().to_cors().expect("failed to build CORS fairing");

    // JSON/byte limits raised past Rocket's conservative default so blob
    // uploads up to `max_upload_bytes` (read as a raw byte stream, not
    // multipart-parsed, see `routes::uploads`) aren't rejected upstream of
    // our own 413 mapping. A small margin is added since `upload_file`
    // itself draws the hard line via `Data::open(limit)`; Rocket's own
    // limit only needs to be at least that large to let the request reach it.
    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("log_level", rocket_log_level))
        .merge(("limits.json", 1024 * 1024))
        .merge(("limits.bytes", max_upload_bytes as u64 + 1024));

    rocket::custom(figment)
        .manage(core)
        .manage(rate_limit_config)
        .manage(rate_limiter)
        .attach(cors)
        .register("/", rocket::catchers![routes::too_many_requests, routes::not_found])
        .mount(
            "/",
            rocket::routes![
                routes::capabilities,
                routes::health,
                routes::guest_auth,
                routes::issue_ticket,
                routes::get_me,
                routes::update_me,
                routes::directory_users,
                routes::directory_rooms,
                routes::create_room,
                routes::list_rooms,
                routes::get_room,
                routes::update_room,
                routes::join_room,
                routes::leave_room,
                routes::invite_member,
                routes::kick_member,
                routes::ban_member,
                routes::set_role,
                routes::list_pins,
                routes::pin_message,
                routes::unpin_message,
                routes::send_room_message,
                routes::list_room_messages,
                routes::backfill_room_messages,
                routes::room_ack,
                routes::room_cursor,
                routes::edit_message,
                routes::delete_message,
                routes::add_reaction,
                routes::remove_reaction,
                routes::send_dm,
                routes::list_dm_messages,
                routes::dm_ack,
                routes::dm_cursor,
                routes::upload_file,
                routes::download_upload,
                routes::rtm_connect,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Retention Sweep", |_rocket| {
            Box::pin(async move {
                retention::spawn_retention_task(retention_core);
                log::info!("retention sweep task started");
            })
        }))
}
