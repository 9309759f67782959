use rocket::http::{ContentType, Status};

use super::common::{auth_header, guest, test_client};

#[test]
fn send_and_list_dm_messages() {
    let client = test_client();
    let (alice_token, _) = guest(&client, "alice");
    let (_, bob_id) = guest(&client, "bob");

    let res = client
        .post(format!("/dms/{bob_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"hi bob"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);

    let res = client
        .get(format!("/dms/{bob_id}/messages"))
        .header(auth_header(&alice_token))
        .dispatch();
    let page: serde_json::Value = res.into_json().unwrap();
    let messages = page["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "hi bob");
}

#[test]
fn cannot_dm_yourself() {
    let client = test_client();
    let (alice_token, alice_id) = guest(&client, "alice");

    let res = client
        .post(format!("/dms/{alice_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"talking to myself"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn dm_stream_is_shared_regardless_of_who_reads_it() {
    let client = test_client();
    let (alice_token, _) = guest(&client, "alice");
    let (bob_token, bob_id) = guest(&client, "bob");
    let (_, alice_id) = guest(&client, "alice");

    client
        .post(format!("/dms/{bob_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"from alice"}"#)
        .dispatch();

    let res = client
        .get(format!("/dms/{alice_id}/messages"))
        .header(auth_header(&bob_token))
        .dispatch();
    let page: serde_json::Value = res.into_json().unwrap();
    let messages = page["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "from alice");
}

#[test]
fn dm_ack_and_cursor_round_trip() {
    let client = test_client();
    let (alice_token, _) = guest(&client, "alice");
    let (_, bob_id) = guest(&client, "bob");

    client
        .post(format!("/dms/{bob_id}/messages"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"text":"one"}"#)
        .dispatch();

    client
        .post(format!("/dms/{bob_id}/ack"))
        .header(ContentType::JSON)
        .header(auth_header(&alice_token))
        .body(r#"{"seq":1}"#)
        .dispatch();

    let res = client.get(format!("/dms/{bob_id}/cursor")).header(auth_header(&alice_token)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["seq"], 1);
}
