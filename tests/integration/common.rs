//! Shared test-client plumbing, mirroring how the teacher's own
//! `tests/integration/common.rs` builds a fresh `Rocket` per test instead of
//! sharing process-global state across the suite.

use rocket::local::blocking::Client;

use orc_server::config::AppConfig;
use orc_server::rate_limit::RateLimitConfig;

/// A config tuned for fast, deterministic tests: short ticket TTL so
/// expiry can be exercised without sleeping for the production default,
/// and a heartbeat cadence tests never actually wait out.
fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.ticket_ttl = std::time::Duration::from_millis(200);
    cfg
}

pub fn test_client() -> Client {
    let rocket = orc_server::rocket_with_config(test_config(), RateLimitConfig::default());
    Client::tracked(rocket).expect("valid rocket instance")
}

pub fn test_client_with_rate_limits(rate_limits: RateLimitConfig) -> Client {
    let rocket = orc_server::rocket_with_config(test_config(), rate_limits);
    Client::tracked(rocket).expect("valid rocket instance")
}

/// Issues a guest session and returns its bearer token plus user id.
pub fn guest(client: &Client, username: &str) -> (String, String) {
    use rocket::http::ContentType;
    let res = client
        .post("/auth/guest")
        .header(ContentType::JSON)
        .body(format!(r#"{{"username":"{username}"}}"#))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["user_id"].as_str().unwrap().to_string(),
    )
}

pub fn auth_header(token: &str) -> rocket::http::Header<'static> {
    rocket::http::Header::new("Authorization", format!("Bearer {token}"))
}

/// Creates a public room owned by `token`'s user and returns its room_id.
pub fn create_room(client: &Client, token: &str, name: &str) -> String {
    use rocket::http::ContentType;
    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(token))
        .body(format!(r#"{{"name":"{name}"}}"#))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    body["room_id"].as_str().unwrap().to_string()
}
