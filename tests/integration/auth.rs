use rocket::http::{ContentType, Status};

use super::common::{auth_header, guest, test_client};

#[test]
fn guest_auth_issues_a_usable_token() {
    let client = test_client();
    let res = client
        .post("/auth/guest")
        .header(ContentType::JSON)
        .body(r#"{"username":"nanook"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["display_name"], "nanook");

    let res = client.get("/users/me").header(auth_header(token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let me: serde_json::Value = res.into_json().unwrap();
    assert_eq!(me["display_name"], "nanook");
}

#[test]
fn guest_auth_is_idempotent_by_username() {
    let client = test_client();
    let (_, user_a) = guest(&client, "nanook");
    let (_, user_b) = guest(&client, "nanook");
    assert_eq!(user_a, user_b);
}

#[test]
fn request_without_bearer_token_is_unauthorized() {
    let client = test_client();
    let res = client.get("/users/me").dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
}

#[test]
fn ticket_is_single_use_over_http() {
    let client = test_client();
    let (token, _) = guest(&client, "bob");

    let res = client.post("/rtm/ticket").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["ticket"].as_str().is_some());
    assert!(body["ttl_ms"].as_u64().unwrap() > 0);
}

#[test]
fn update_me_patches_only_provided_fields() {
    let client = test_client();
    let (token, _) = guest(&client, "alice");

    let res = client
        .patch("/users/me")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"bio":"hello there"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let user: serde_json::Value = res.into_json().unwrap();
    assert_eq!(user["bio"], "hello there");
    assert_eq!(user["display_name"], "alice");
}
