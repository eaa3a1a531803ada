// Integration tests for `MeetnetClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meetnet_api::{
    Clock, Credentials, Endpoints, Error, MeetnetClient, Position, SchemaVariant, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn at(t: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(t)))
    }

    fn set(&self, t: DateTime<Utc>) {
        *self.0.lock().unwrap() = t;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

async fn setup() -> (MockServer, MeetnetClient) {
    let server = MockServer::start().await;
    let client = MeetnetClient::with_client(
        Credentials::new("user@example.com", "s3cret"),
        reqwest::Client::new(),
    )
    .with_endpoints(Endpoints::new(&server.uri()).unwrap());
    (server, client)
}

async fn mount_token(server: &MockServer, token: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": token, "token_type": "bearer", "expires_in": 3600})),
        )
        .expect(expected)
        .mount(server)
        .await;
}

fn catalog_body() -> serde_json::Value {
    json!({
        "Locations": [
            {"ID": "NPT", "Name": [{"Culture": "nl", "Message": "Nieuwpoort"}, {"Culture": "en", "Message": "Nieuwpoort"}], "PositionWKT": "POINT(2.7 51.15)"},
            {"ID": "OST", "Name": [{"Culture": "en", "Message": "Ostend"}]}
        ],
        "Parameters": [
            {"ID": "WVC", "Name": [{"Culture": "en", "Message": "Wind speed"}], "Unit": "m/s"}
        ],
        "AvailableData": [
            {"ID": "NPTWVC", "Location": "NPT", "Parameter": "WVC", "CurrentInterval": 10},
            {"ID": "OSTWVC", "Location": "OST", "Parameter": "WVC"}
        ]
    })
}

async fn token_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/Token")
        .count()
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_sends_password_grant() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=user%40example.com"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .expect(1)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();
    assert!(client.has_valid_token().await);
}

#[tokio::test]
async fn test_bad_request_carries_error_description() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The user name or password is incorrect."
        })))
        .mount(&server)
        .await;

    let err = client.authenticate().await.unwrap_err();
    assert!(err.is_auth());
    assert!(err.to_string().contains("The user name or password is incorrect."));
}

#[tokio::test]
async fn test_bad_request_without_description_uses_default() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
        .mount(&server)
        .await;

    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { ref message } if message == "Invalid credentials"));
}

#[tokio::test]
async fn test_other_token_status_is_auth_error_with_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.authenticate().await.unwrap_err();
    assert!(err.is_auth());
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_token_body_not_json_is_connection_class() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let client = MeetnetClient::new(Credentials::new("u", "p"), &TransportConfig::default())
        .with_endpoints(Endpoints::new("http://127.0.0.1:1").unwrap());

    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, Error::Connection { status: None, .. }));
}

#[tokio::test]
async fn test_oversized_expires_in_is_tolerated() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "t", "expires_in": 9_000_000_000_000_000_i64})),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();
    assert!(client.has_valid_token().await);
    let token = client.ensure_authenticated().await.unwrap();
    assert_eq!(token.expose_secret(), "t");
}

#[tokio::test]
async fn test_token_reused_until_expiry_margin() {
    let (server, client) = setup().await;
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::at(t0);
    let client = client.with_clock(clock.clone());

    mount_token(&server, "tok", 2).await;

    let token = client.ensure_authenticated().await.unwrap();
    assert_eq!(token.expose_secret(), "tok");
    assert_eq!(token_requests(&server).await, 1);

    clock.set(t0 + TimeDelta::seconds(3539));
    client.ensure_authenticated().await.unwrap();
    assert_eq!(token_requests(&server).await, 1);

    clock.set(t0 + TimeDelta::seconds(3540));
    client.ensure_authenticated().await.unwrap();
    assert_eq!(token_requests(&server).await, 2);
    assert!(client.has_valid_token().await);
}

#[tokio::test]
async fn test_validate_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .mount(&server)
        .await;

    assert!(client.validate_credentials().await.unwrap());

    let wrong = MeetnetClient::with_client(Credentials::new("user", "wrong"), reqwest::Client::new())
        .with_endpoints(Endpoints::new(&server.uri()).unwrap());
    Mock::given(method("POST"))
        .and(path("/Token"))
        .and(body_string_contains("password=wrong"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    assert!(!wrong.validate_credentials().await.unwrap());
}

#[tokio::test]
async fn test_validate_credentials_propagates_connection_errors() {
    let client = MeetnetClient::with_client(Credentials::new("u", "p"), reqwest::Client::new())
        .with_endpoints(Endpoints::new("http://127.0.0.1:1").unwrap());

    let err = client.validate_credentials().await.unwrap_err();
    assert!(err.is_connection());
}

// ── 401 retry ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_401_reauthenticates_and_retries() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_token(&server, "tok-2", 1).await;

    Mock::given(method("GET"))
        .and(path("/V2/currentData"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/V2/currentData"))
        .and(header("Authorization", "Bearer tok-2"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Values": [{"ID": "NPTWVC", "Value": 8.4, "Timestamp": "2024-06-01T10:00:00Z"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client.get_current_data(&["NPTWVC"]).await.unwrap();
    assert_eq!(data["NPTWVC"].value, Some(8.4));
}

#[tokio::test]
async fn test_second_401_is_auth_error_without_third_request() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 2).await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.get_catalog(false).await.unwrap_err();
    assert!(
        matches!(err, Error::Authentication { ref message } if message == "authentication failed after retry")
    );
}

#[tokio::test]
async fn test_server_error_is_connection_error_with_status() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/currentData"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(500)))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get_current_data::<&str>(&[]).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.is_connection());
    assert!(err.to_string().len() < 300);
}

#[tokio::test]
async fn test_invalid_json_is_deserialization_error() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client.get_catalog(false).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body == "{not json"));
}

// ── Catalog ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_catalog_is_cached() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .expect(1)
        .mount(&server)
        .await;

    let first = client.get_catalog(false).await.unwrap();
    let second = client.get_catalog(false).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &client.catalog().unwrap()));

    assert_eq!(first.location_name("NPT"), "Nieuwpoort");
    assert_eq!(first.location_name("OST"), "Ostend");
    assert_eq!(first.parameter_unit("WVC").as_deref(), Some("m/s"));
    assert_eq!(
        first.locations["NPT"].position.as_ref().and_then(Position::coordinates),
        Some((51.15, 2.7))
    );
}

#[tokio::test]
async fn test_force_refresh_swaps_catalog() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Locations": [{"ID": "ZBR", "Name": "Zeebrugge"}],
            "Parameters": [],
            "AvailableData": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let held = client.get_catalog(false).await.unwrap();
    let refreshed = client.get_catalog(true).await.unwrap();

    assert!(!Arc::ptr_eq(&held, &refreshed));
    assert_eq!(held.locations.len(), 2);
    assert_eq!(held.available_data.len(), 2);
    assert_eq!(refreshed.location_name("ZBR"), "Zeebrugge");
    assert!(Arc::ptr_eq(&refreshed, &client.catalog().unwrap()));
}

#[tokio::test]
async fn test_available_data_before_fetch_is_empty() {
    let (server, client) = setup().await;

    assert!(client.get_available_data_for_locations(&["NPT"]).is_empty());
    assert!(client.catalog().is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_available_data_filters_cached_catalog() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .mount(&server)
        .await;

    client.get_catalog(false).await.unwrap();
    let ids: Vec<String> = client
        .get_available_data_for_locations(&["NPT"])
        .into_iter()
        .map(|ad| ad.id)
        .collect();
    assert_eq!(ids, ["NPTWVC"]);
}

#[tokio::test]
async fn test_auto_schema_reads_legacy_catalog() {
    let (server, client) = setup().await;
    let client = client.with_schema(SchemaVariant::Auto);

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Locations": [{"ID": "OST", "Name": "Oostende", "Latitude": 51.23, "Longitude": 2.92}],
            "Parameters": [],
            "AvailableData": [{"ID": "OSTWT", "LocationID": "OST", "ParameterID": "WT"}]
        })))
        .mount(&server)
        .await;

    let catalog = client.get_catalog(false).await.unwrap();
    assert_eq!(catalog.available_data[0].location_id, "OST");
    assert_eq!(
        catalog.locations["OST"].position,
        Some(Position::LatLon { lat: 51.23, lon: 2.92 })
    );
}

// ── Current data ────────────────────────────────────────────────────

#[tokio::test]
async fn test_current_data_sends_joined_ids() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/currentData"))
        .and(query_param("ids", "NPTWVC,OSTWVC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Values": [
                {"ID": "NPTWVC", "Value": "12.3", "Timestamp": "2024-06-01T10:00:00Z"},
                {"ID": "OSTWVC", "Value": null, "Timestamp": "not-a-date"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client.get_current_data(&["NPTWVC", "OSTWVC"]).await.unwrap();
    assert_eq!(data["NPTWVC"].value, Some(12.3));
    assert_eq!(
        data["NPTWVC"].timestamp,
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(data["OSTWVC"].value, None);
    assert_eq!(data["OSTWVC"].timestamp, None);
}

#[tokio::test]
async fn test_current_data_without_ids_is_unfiltered() {
    let (server, client) = setup().await;

    mount_token(&server, "tok", 1).await;
    Mock::given(method("GET"))
        .and(path("/V2/currentData"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Values": []})))
        .expect(1)
        .mount(&server)
        .await;

    let data = client.get_current_data::<String>(&[]).await.unwrap();
    assert!(data.is_empty());

    let requests = server.received_requests().await.unwrap();
    let data_request = requests
        .iter()
        .find(|r| r.url.path() == "/V2/currentData")
        .unwrap();
    assert_eq!(data_request.url.query(), None);
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_closed_owned_session_reopens() {
    let server = MockServer::start().await;
    let client = MeetnetClient::new(Credentials::new("u", "p"), &TransportConfig::default())
        .with_endpoints(Endpoints::new(&server.uri()).unwrap());

    mount_token(&server, "tok", 2).await;

    client.authenticate().await.unwrap();
    client.close();
    client.authenticate().await.unwrap();
    assert!(client.is_session_owned());
}
