use rocket::http::{ContentType, Status};

use orc_server::rate_limit::RateLimitConfig;

use super::common::{auth_header, create_room, guest, test_client_with_rate_limits};

#[test]
fn custom_message_rate_limit_returns_429_with_retry_after() {
    let mut config = RateLimitConfig::default();
    config.messages_max = 2;
    let client = test_client_with_rate_limits(config);

    let (token, _) = guest(&client, "agent");
    let room_id = create_room(&client, &token, "rl-test");

    for i in 0..2 {
        let res = client
            .post(format!("/rooms/{room_id}/messages"))
            .header(ContentType::JSON)
            .header(auth_header(&token))
            .body(format!(r#"{{"text":"msg {i}"}}"#))
            .dispatch();
        assert_eq!(res.status(), Status::Created, "message {i} should be allowed");
    }

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"text":"too many"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::TooManyRequests);
    assert!(res.headers().get_one("Retry-After").is_some());
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["error"]["code"], "rate_limited");
}

#[test]
fn custom_room_creation_rate_limit() {
    let mut config = RateLimitConfig::default();
    config.rooms_max = 1;
    let client = test_client_with_rate_limits(config);
    let (token, _) = guest(&client, "agent");

    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"first"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);

    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"second"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::TooManyRequests);
}

#[test]
fn default_rate_limits_match_documented_values() {
    let config = RateLimitConfig::default();
    assert_eq!(config.messages_max, 60);
    assert_eq!(config.messages_window_secs, 60);
    assert_eq!(config.rooms_max, 10);
    assert_eq!(config.rooms_window_secs, 3600);
    assert_eq!(config.files_max, 10);
    assert_eq!(config.dms_max, 60);
}
