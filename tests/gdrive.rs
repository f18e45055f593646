use chrono::{Duration, Utc};
use dsutils::gdrive::{sheet_to_frame, Credentials, DriveError, GoogleDriveClient, GoogleDriveClientConfig};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials(token_uri: String, expires_in: i64) -> Credentials {
    Credentials {
        token: Some("old-token".into()),
        refresh_token: Some("refresh-me".into()),
        token_uri,
        client_id: "client".into(),
        client_secret: "secret".into(),
        scopes: vec!["https://www.googleapis.com/auth/drive.readonly".into()],
        expiry: Some(Utc::now() + Duration::seconds(expires_in)),
    }
}

fn config(dir: &std::path::Path) -> GoogleDriveClientConfig {
    GoogleDriveClientConfig::new(
        dir.join("token.json"),
        dir.join("credentials.json"),
        vec!["https://www.googleapis.com/auth/drive.readonly".into()],
    )
}

#[tokio::test]
async fn valid_token_is_reused_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let stored = credentials(format!("{}/token", server.uri()), 3600);
    config.update_token_file(&stored).unwrap();

    let creds = config.get_credentials().await.unwrap();
    assert_eq!(creds.token.as_deref(), Some("old-token"));
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    config
        .update_token_file(&credentials(format!("{}/token", server.uri()), -60))
        .unwrap();

    let creds = config.get_credentials().await.unwrap();
    assert_eq!(creds.token.as_deref(), Some("new-token"));
    assert_eq!(creds.refresh_token.as_deref(), Some("refresh-me"));
    assert!(creds.valid());

    let stored = config.retrieve_credentials().unwrap().unwrap();
    assert_eq!(stored.token.as_deref(), Some("new-token"));
}

#[tokio::test]
async fn failed_refresh_reports_the_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let err = config
        .refresh_credentials(&credentials(format!("{}/token", server.uri()), -60))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Api { status: 400, ref body } if body == "invalid_grant"));
}

#[tokio::test]
async fn installed_app_flow_exchanges_the_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "flow-token",
            "refresh_token": "flow-refresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/drive.readonly"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let secrets = json!({
        "installed": {
            "client_id": "client",
            "client_secret": "secret",
            "auth_uri": format!("{}/auth", server.uri()),
            "token_uri": format!("{}/token", server.uri()),
            "redirect_uris": ["http://localhost"]
        }
    });
    std::fs::write(dir.path().join("credentials.json"), secrets.to_string()).unwrap();
    let config = config(dir.path());

    let creds = config
        .run_local_server(|authorize_url| {
            let url = reqwest::Url::parse(authorize_url).unwrap();
            let param = |name: &str| {
                url.query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
                    .unwrap()
            };
            let redirect = param("redirect_uri").replace("localhost", "127.0.0.1");
            let state = param("state");
            assert_eq!(param("client_id"), "client");
            tokio::spawn(async move {
                // A stray request first, like a browser asking for a favicon.
                let _ = reqwest::get(format!("{redirect}favicon.ico")).await;
                let body = reqwest::get(format!("{redirect}?code=abc123&state={state}"))
                    .await
                    .unwrap()
                    .text()
                    .await
                    .unwrap();
                assert!(body.contains("authentication flow has completed"));
            });
        })
        .await
        .unwrap();

    assert_eq!(creds.token.as_deref(), Some("flow-token"));
    assert_eq!(creds.refresh_token.as_deref(), Some("flow-refresh"));
    let stored = config.retrieve_credentials().unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("flow-refresh"));
}

fn client(server: &MockServer) -> GoogleDriveClient {
    let mut creds = credentials(format!("{}/token", server.uri()), 3600);
    creds.token = Some("tok".into());
    GoogleDriveClient::with_endpoints(
        creds,
        format!("{}/drive/v3", server.uri()),
        format!("{}/sheets/v4", server.uri()),
    )
}

#[tokio::test]
async fn downloads_and_exports_files() {
    let server = MockServer::start().await;
    let content: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/file-1"))
        .and(query_param("alt", "media"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/doc-1/export"))
        .and(query_param("mimeType", "text/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let drive = client(&server);

    let saved = drive.download_file("file-1", dir.path(), "raw.bin").await.unwrap();
    assert_eq!(std::fs::read(&saved).unwrap(), content);

    let exported = drive
        .export_workspace_file("doc-1", "text/csv", dir.path(), "doc.csv")
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(exported).unwrap(), "a,b\n1,2\n");
}

#[tokio::test]
async fn api_errors_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = client(&server)
        .download_file("nope", dir.path(), "x.bin")
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Api { status: 404, ref body } if body == "File not found"));
}

#[tokio::test]
async fn reads_sheet_values_into_a_frame() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheets/v4/spreadsheets/sheet-1/values/Data!A1:C3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Data!A1:C3",
            "majorDimension": "ROWS",
            "values": [["name", "qty", "price"], ["pen", "3", "1.50"], ["ink"]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sheets/v4/spreadsheets/sheet-1/values/Empty!A1:A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Empty!A1:A1",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    let drive = client(&server);
    let values = drive.retrieve_sheet_data("sheet-1", "Data!A1:C3").await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[1], vec!["pen", "3", "1.50"]);

    let frame = sheet_to_frame(&values).unwrap();
    assert_eq!(frame.columns(), &["name", "qty", "price"]);
    assert_eq!(frame.height(), 2);

    let empty = drive.retrieve_sheet_data("sheet-1", "Empty!A1:A1").await.unwrap();
    assert!(empty.is_empty());
}
