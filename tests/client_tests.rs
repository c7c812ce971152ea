use std::time::Duration;

use besmart::{BesmartClient, Error, MessageLogMode, ThermostatMode};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> BesmartClient {
    BesmartClient::builder("user@example.com", "10080")
        .base_url(server.uri())
        .build()
}

fn login_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deviceId": "dev-1"})))
}

fn room_list_body() -> serde_json::Value {
    json!([
        {"id": "1", "name": "Soggiorno", "therId": "2482", "roomMark": "5", "thModel": "195", "unit": "0"},
        {"id": 2, "name": "Bagno", "therId": 2483, "roomMark": 6, "thModel": "195", "unit": "1"},
        {"name": ""}
    ])
}

fn room_list_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/getRoomList.php"))
        .and(query_param("deviceId", "dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_list_body()))
}

#[tokio::test]
async fn login_stores_device_id() {
    let server = MockServer::start().await;
    login_mock().expect(1).mount(&server).await;

    let mut client = test_client(&server);
    assert!(client.device_id().is_none());
    let session = client.login().await.expect("login should succeed");
    assert_eq!(session.device_id, "dev-1");
    assert_eq!(client.device_id(), Some("dev-1"));
}

#[tokio::test]
async fn login_unusable_response_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 5})))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let err = client.login().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "expected Auth, got {err:?}");
}

#[tokio::test]
async fn rooms_filters_placeholder_entries() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;

    let mut client = test_client(&server);
    let rooms = client.rooms().await.expect("rooms should succeed");
    assert_eq!(rooms.len(), 2, "placeholder row must be dropped");

    let room = client
        .room_by_name("SOGGIORNO")
        .await
        .unwrap()
        .expect("lookup is case-insensitive");
    assert_eq!(room.ther_id.as_deref(), Some("2482"));

    assert!(client.room_by_name("cucina").await.unwrap().is_none());
}

#[tokio::test]
async fn directory_cache_fetches_once_within_ttl() {
    let server = MockServer::start().await;
    login_mock().expect(1).mount(&server).await;
    room_list_mock().expect(1).mount(&server).await;

    let mut client = test_client(&server);
    assert!(client.room_by_name("soggiorno").await.unwrap().is_some());
    assert!(client.room_by_name("bagno").await.unwrap().is_some());
}

#[tokio::test]
async fn directory_cache_refetches_after_ttl() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().expect(2).mount(&server).await;

    let mut client = BesmartClient::builder("user@example.com", "10080")
        .base_url(server.uri())
        .room_cache_ttl(Duration::ZERO)
        .build();
    assert!(client.room_by_name("soggiorno").await.unwrap().is_some());
    assert!(client.room_by_name("soggiorno").await.unwrap().is_some());
}

#[tokio::test]
async fn room_data_logs_in_on_every_call() {
    let server = MockServer::start().await;
    // One login for the directory fetch, one per room_data call.
    login_mock().expect(3).mount(&server).await;
    room_list_mock().mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/getRoomData196.php"))
        .and(query_param("therId", "2482"))
        .and(query_param("deviceId", "dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "tempNow": "21.5",
            "heating": "1",
            "mode": 1
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let room = client.room_by_name("soggiorno").await.unwrap().unwrap();
    let data = client.room_data(&room).await.expect("room data");
    assert_eq!(data.temp_now, Some(21.5));
    assert!(data.is_heating());
    client.room_data(&room).await.expect("second room data");
}

#[tokio::test]
async fn transport_error_discards_session() {
    let server = MockServer::start().await;
    login_mock().expect(2).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/getRoomList.php"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let err = client.rooms().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)), "expected Http, got {err:?}");
    assert!(
        client.device_id().is_none(),
        "session must be dropped on HTTP error"
    );

    // Next cycle starts over with a fresh login.
    room_list_mock().mount(&server).await;
    client.rooms().await.expect("retry after error");
    assert_eq!(client.device_id(), Some("dev-1"));
}

#[tokio::test]
async fn set_room_mode_sends_room_mark_and_checks_sentinel() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/setRoomMode.php"))
        .and(body_string_contains("deviceId=dev-1"))
        .and(body_string_contains("therId=5"))
        .and(body_string_contains("mode=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    client
        .set_room_mode("Soggiorno", ThermostatMode::Economy)
        .await
        .expect("error == 1 means accepted");
}

#[tokio::test]
async fn set_room_mode_rejected_on_other_error_values() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/setRoomMode.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 0})))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let err = client
        .set_room_mode("Soggiorno", ThermostatMode::Auto)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Rejected { code: 0 }),
        "expected Rejected, got {err:?}"
    );
}

#[tokio::test]
async fn set_room_mode_malformed_response_fails() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/setRoomMode.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let err = client
        .set_room_mode("Soggiorno", ThermostatMode::Auto)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)), "expected Http, got {err:?}");
}

#[tokio::test]
async fn set_comfort_temp_splits_form_fields() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/setComfTemp.php"))
        .and(body_string_contains("therId=2482"))
        .and(body_string_contains("tempSet=21"))
        .and(body_string_contains("tempSetFloat=5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    client
        .set_comfort_temp("Soggiorno", 21.5)
        .await
        .expect("comfort setpoint write");
}

#[tokio::test]
async fn fahrenheit_room_converts_outbound_to_celsius() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    // Bagno reports unit "1": 68.0F must go out as 20.0C.
    Mock::given(method("POST"))
        .and(path("/setEconTemp.php"))
        .and(body_string_contains("therId=2483"))
        .and(body_string_contains("tempSet=20"))
        .and(body_string_contains("tempSetFloat=0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    client
        .set_economy_temp("Bagno", 68.0)
        .await
        .expect("economy setpoint write");
}

#[tokio::test]
async fn set_frost_temp_uses_frost_endpoint() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/setFrostTemp.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    client
        .set_frost_temp("Soggiorno", 7.0)
        .await
        .expect("frost setpoint write");
}

#[tokio::test]
async fn commands_for_unknown_rooms_fail() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;

    let mut client = test_client(&server);
    let err = client
        .set_room_mode("Cucina", ThermostatMode::Auto)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownRoom(_)));
}

#[tokio::test]
async fn program_returns_validated_grid() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;
    room_list_mock().mount(&server).await;
    let mut rows = vec![vec![0u8; 48]; 7];
    rows[3][24] = 2;
    Mock::given(method("GET"))
        .and(path("/getProgram.php"))
        .and(query_param("roomId", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": 0, "program": rows})),
        )
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let room = client.room_by_name("soggiorno").await.unwrap().unwrap();
    let week = client.program(&room).await.expect("program grid");
    assert_eq!(week.slot(3, 24), Some(2));
    assert_eq!(week.slot(3, 25), Some(0));
}

#[tokio::test]
async fn wire_log_redacts_credentials() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let log_path = tmp.path().to_str().unwrap();
    let mut client = BesmartClient::builder("user@example.com", "10080")
        .base_url(server.uri())
        .message_log(MessageLogMode::Redacted, log_path)
        .build();
    client.login().await.expect("login");

    let contents = std::fs::read_to_string(log_path).unwrap();
    assert!(contents.contains("login.php"));
    assert!(contents.contains("<redacted>"));
    assert!(!contents.contains("10080"));
}
