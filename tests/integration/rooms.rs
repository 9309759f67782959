use rocket::http::{ContentType, Status};

use super::common::{auth_header, create_room, guest, test_client};

#[test]
fn create_room_and_get_it_back() {
    let client = test_client();
    let (token, owner_id) = guest(&client, "owner");

    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"general","topic":"day one"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let room: serde_json::Value = res.into_json().unwrap();
    assert_eq!(room["name"], "general");
    assert_eq!(room["owner_id"], owner_id);
    assert_eq!(room["member_count"], 1);

    let res = client.get("/rooms/general").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let fetched: serde_json::Value = res.into_json().unwrap();
    assert_eq!(fetched["room_id"], room["room_id"]);
}

#[test]
fn room_names_collide_case_insensitively() {
    let client = test_client();
    let (token, _) = guest(&client, "owner");
    client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"Lobby"}"#)
        .dispatch();

    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":"lobby"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Conflict);
}

#[test]
fn empty_room_name_is_rejected() {
    let client = test_client();
    let (token, _) = guest(&client, "owner");
    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"name":""}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn joining_a_private_room_requires_an_invite() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(r#"{"name":"secret","visibility":"private"}"#)
        .dispatch();
    let room: serde_json::Value = res.into_json().unwrap();
    let room_id = room["room_id"].as_str().unwrap();

    let (outsider_token, outsider_id) = guest(&client, "outsider");
    let res = client
        .post(format!("/rooms/{room_id}/join"))
        .header(auth_header(&outsider_token))
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);

    let res = client
        .post(format!("/rooms/{room_id}/invite"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(format!(r#"{{"user_id":"{outsider_id}"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client
        .post(format!("/rooms/{room_id}/join"))
        .header(auth_header(&outsider_token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
}

#[test]
fn kick_requires_moderator_or_above() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "kick-test");

    let (member_token, member_id) = guest(&client, "rando");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&member_token)).dispatch();

    let (other_token, other_id) = guest(&client, "other-member");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&other_token)).dispatch();

    // A plain member cannot kick another member.
    let res = client
        .post(format!("/rooms/{room_id}/kick"))
        .header(ContentType::JSON)
        .header(auth_header(&member_token))
        .body(format!(r#"{{"user_id":"{other_id}"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);

    // The owner can.
    let res = client
        .post(format!("/rooms/{room_id}/kick"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(format!(r#"{{"user_id":"{member_id}"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
}

#[test]
fn set_role_promotes_a_member_to_moderator() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "promo-test");

    let (member_token, member_id) = guest(&client, "future-mod");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&member_token)).dispatch();

    let res = client
        .post(format!("/rooms/{room_id}/roles"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(format!(r#"{{"user_id":"{member_id}","role":"moderator"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    // Now the promoted member can kick others.
    let (victim_token, victim_id) = guest(&client, "victim");
    client.post(format!("/rooms/{room_id}/join")).header(auth_header(&victim_token)).dispatch();
    let res = client
        .post(format!("/rooms/{room_id}/kick"))
        .header(ContentType::JSON)
        .header(auth_header(&member_token))
        .body(format!(r#"{{"user_id":"{victim_id}"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
}

#[test]
fn unknown_role_name_is_a_bad_request() {
    let client = test_client();
    let (owner_token, _) = guest(&client, "owner");
    let room_id = create_room(&client, &owner_token, "bad-role-test");
    let res = client
        .post(format!("/rooms/{room_id}/roles"))
        .header(ContentType::JSON)
        .header(auth_header(&owner_token))
        .body(r#"{"user_id":"whoever","role":"wizard"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn get_room_not_found_for_bogus_id() {
    let client = test_client();
    let (token, _) = guest(&client, "owner");
    let res = client.get("/rooms/nonexistent-room").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
