use rocket::http::Status;

use super::common::test_client;

#[test]
fn health_reports_zero_sessions_with_no_open_connections() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 0);
}

#[test]
fn capabilities_reflects_configured_limits() {
    let client = test_client();
    let res = client.get("/meta/capabilities").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["protocol_version"], "1");
    assert_eq!(body["max_message_bytes"], 4000);
    assert_eq!(body["max_reactions_per_message"], 64);
}

#[test]
fn unknown_route_maps_to_structured_404() {
    let client = test_client();
    let res = client.get("/does/not/exist").dispatch();
    assert_eq!(res.status(), Status::NotFound);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}
