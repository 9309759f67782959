use rocket::http::{ContentType, Status};

use super::common::{auth_header, create_room, guest, test_client};

#[test]
fn owner_can_pin_and_unpin_a_message() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let room_id = create_room(&client, &token, "pin-test");

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"text":"pin me"}"#)
        .dispatch();
    let msg: serde_json::Value = res.into_json().unwrap();
    let message_id = msg["message_id"].as_str().unwrap();

    let res = client
        .post(format!("/rooms/{room_id}/pins/{message_id}"))
        .header(auth_header(&token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let room: serde_json::Value = res.into_json().unwrap();
    assert_eq!(room["pinned_message_ids"].as_array().unwrap().len(), 1);

    let res = client
        .delete(format!("/rooms/{room_id}/pins/{message_id}"))
        .header(auth_header(&token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let room: serde_json::Value = res.into_json().unwrap();
    assert!(room["pinned_message_ids"].as_array().unwrap().is_empty());
}

#[test]
fn plain_member_cannot_pin() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "pin-auth-test");
    let (member_token, _) = guest(&client, "member");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&member_token)).dispatch();

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(r#"{"text":"pin me"}"#)
        .dispatch();
    let msg: serde_json::Value = res.into_json().unwrap();
    let message_id = msg["message_id"].as_str().unwrap();

    let res = client
        .post(format!("/rooms/{room_id}/pins/{message_id}"))
        .header(auth_header(&member_token))
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);
}
