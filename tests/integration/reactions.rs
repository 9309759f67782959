use rocket::http::{ContentType, Status};

use super::common::{auth_header, create_room, guest, test_client};

fn post_message(client: &rocket::local::blocking::Client, token: &str, room_id: &str, text: &str) -> String {
    let res = client
        .post(format!("/rooms/{room_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(token))
        .body(format!(r#"{{"text":"{text}"}}"#))
        .dispatch();
    let msg: serde_json::Value = res.into_json().unwrap();
    msg["message_id"].as_str().unwrap().to_string()
}

#[test]
fn adding_the_same_reaction_twice_is_idempotent() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let room_id = create_room(&client, &token, "react-test");
    let message_id = post_message(&client, &token, &room_id, "react to me");

    let res = client
        .post(format!("/messages/{message_id}/reactions"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"emoji":"👍"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["reactions"][0]["count"], 1);

    let res = client
        .post(format!("/messages/{message_id}/reactions"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"emoji":"👍"}"#)
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["reactions"][0]["count"], 1);
}

#[test]
fn removing_a_reaction_drops_it_from_the_summary() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let room_id = create_room(&client, &token, "unreact-test");
    let message_id = post_message(&client, &token, &room_id, "react to me");

    client
        .post(format!("/messages/{message_id}/reactions"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"emoji":"🎉"}"#)
        .dispatch();

    let res = client
        .delete(format!("/messages/{message_id}/reactions"))
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"emoji":"🎉"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["reactions"].as_array().unwrap().is_empty());
}

#[test]
fn reacting_to_an_unknown_message_is_not_found() {
    let client = test_client();
    let (token, _) = guest(&client, "nanook");
    let res = client
        .post("/messages/no-such-message/reactions")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"emoji":"👍"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
