use rocket::http::{ContentType, Status};

use super::common::{auth_header, create_room, guest, test_client};

#[test]
fn send_and_list_room_messages() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let room_id = create_room(&client, &token, "msg-test");

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"text":"hello world"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let msg: serde_json::Value = res.into_json().unwrap();
    assert_eq!(msg["text"], "hello world");
    assert_eq!(msg["seq"], 1);

    let res = client
        .get(format!("/rooms/{room_id}/messages"))
        .header(auth_header(&token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let page: serde_json::Value = res.into_json().unwrap();
    let messages = page["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "hello world");
}

#[test]
fn non_member_cannot_post() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "members-only");
    let (intruder_token, _) = guest(&client, "intruder");

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&intruder_token))
        .body(r#"{"text":"sneaky"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);
}

#[test]
fn forward_read_respects_cursor_and_order() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let room_id = create_room(&client, &token, "order-test");

    for i in 0..3 {
        client
            .post(format!("/rooms/{room_id}/messages"))
            .header(ContentType::JSON)
            .header(auth_header(&token))
            .body(format!(r#"{{"text":"msg {i}"}}"#))
            .dispatch();
    }

    let res = client
        .get(format!("/rooms/{room_id}/messages?cursor=1"))
        .header(auth_header(&token))
        .dispatch();
    let page: serde_json::Value = res.into_json().unwrap();
    let messages = page["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["text"], "msg 1");
    assert_eq!(messages[1]["text"], "msg 2");
}

#[test]
fn author_can_edit_their_own_message_others_cannot() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "edit-test");
    let (alice_token, _) = guest(&client, "alice");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&alice_token)).dispatch();

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"original"}"#)
        .dispatch();
    let msg: serde_json::Value = res.into_json().unwrap();
    let message_id = msg["message_id"].as_str().unwrap();

    let res = client
        .patch(format!("/messages/{message_id}"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"edited"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let edited: serde_json::Value = res.into_json().unwrap();
    assert_eq!(edited["text"], "edited");
    assert!(edited["edited_at"].is_string());

    let res = client
        .patch(format!("/messages/{message_id}"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(r#"{"text":"hijacked"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);
}

#[test]
fn moderator_can_delete_but_not_edit_others_messages() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "mod-delete-test");
    let (alice_token, _) = guest(&client, "alice");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&alice_token)).dispatch();

    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"will be purged"}"#)
        .dispatch();
    let msg: serde_json::Value = res.into_json().unwrap();
    let message_id = msg["message_id"].as_str().unwrap();

    let res = client
        .delete(format!("/messages/{message_id}"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(r#"{"reason":"spam"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let deleted: serde_json::Value = res.into_json().unwrap();
    assert_eq!(deleted["tombstone"], true);
    assert_eq!(deleted["text"], "");
}

#[test]
fn ack_and_cursor_round_trip() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let room_id = create_room(&client, &token, "cursor-test");

    client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"text":"one"}"#)
        .dispatch();

    let res = client
        .post(format!("/rooms/{room_id}/ack"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"seq":1}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client.get(format!("/rooms/{room_id}/cursor")).header(auth_header(&token)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["seq"], 1);
}

#[test]
fn edit_on_missing_message_is_not_found() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let res = client
        .patch("/messages/does-not-exist")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"text":"ghost"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
