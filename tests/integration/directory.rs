use rocket::http::ContentType;

use super::common::{auth_header, guest, test_client};

#[test]
fn directory_rooms_only_lists_public_rooms() {
    let client = test_client();
    let (token, _) = guest(&client, "owner");
    client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"public-room"}"#)
        .dispatch();
    client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"private-room","visibility":"private"}"#)
        .dispatch();

    let res = client.get("/directory/rooms").header(auth_header(&token)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let rooms = body["rooms"].as_array().unwrap();
    assert!(rooms.iter().any(|r| r["name"] == "public-room"));
    assert!(rooms.iter().all(|r| r["name"] != "private-room"));
}

#[test]
fn directory_users_lists_room_members() {
    let client = test_client();
    let (token, _) = guest(&client, "owner");
    client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"membership-test"}"#)
        .dispatch();

    let res = client.get("/directory/users").header(auth_header(&token)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let users = body["users"].as_array().unwrap();
    assert!(users.iter().any(|u| u["display_name"] == "owner"));
}
