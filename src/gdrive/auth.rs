//! # Google OAuth Credentials
//!
//! Reads and writes authorized-user token files, refreshes expired access
//! tokens and runs the installed-application flow over a loopback redirect.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use super::{check_status, DriveError};

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens expiring within this window are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 225;

const FLOW_COMPLETE_MESSAGE: &str =
    "The authentication flow has completed. You may close this window.";

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Authorized-user credentials, in the same JSON layout Google's client
/// libraries use for `token.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credentials {
    /// An access token is present and not expired.
    pub fn valid(&self) -> bool {
        self.token.is_some() && !self.expired()
    }

    /// Credentials without an expiry never expire.
    pub fn expired(&self) -> bool {
        self.expiry
            .is_some_and(|expiry| Utc::now() >= expiry - Duration::seconds(EXPIRY_SKEW_SECS))
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Client secrets downloaded from the Cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// Where credentials live and which scopes to request.
#[derive(Debug, Clone)]
pub struct GoogleDriveClientConfig {
    pub token_file_path: PathBuf,
    pub credential_file_path: PathBuf,
    pub scopes: Vec<String>,
    http: reqwest::Client,
}

impl fmt::Display for GoogleDriveClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GoogleDriveClientConfig(token_file={}, credential_file={}, scope={:?})",
            self.token_file_path.display(),
            self.credential_file_path.display(),
            self.scopes
        )
    }
}

impl GoogleDriveClientConfig {
    pub fn new(
        token_file_path: impl Into<PathBuf>,
        credential_file_path: impl Into<PathBuf>,
        scopes: Vec<String>,
    ) -> Self {
        GoogleDriveClientConfig {
            token_file_path: token_file_path.into(),
            credential_file_path: credential_file_path.into(),
            scopes,
            http: reqwest::Client::new(),
        }
    }

    /// Loads the token file, or `None` when it does not exist yet.
    /// The configured scopes replace the ones stored in the file.
    pub fn retrieve_credentials(&self) -> Result<Option<Credentials>, DriveError> {
        if !self.token_file_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.token_file_path)?;
        let mut creds: Credentials = serde_json::from_str(&content)?;
        if !self.scopes.is_empty() {
            creds.scopes = self.scopes.clone();
        }
        Ok(Some(creds))
    }

    pub fn update_token_file(&self, credentials: &Credentials) -> Result<(), DriveError> {
        let json = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.token_file_path, json)?;
        tracing::debug!(path = %self.token_file_path.display(), "Token file updated");
        Ok(())
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Credentials, DriveError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or_else(|| DriveError::Auth("credentials have no refresh token".into()))?;

        tracing::info!("Refreshing Google access token");
        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        let mut refreshed = credentials.clone();
        refreshed.token = Some(token.access_token);
        refreshed.expiry = token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(new_refresh) = token.refresh_token {
            refreshed.refresh_token = Some(new_refresh);
        }
        Ok(refreshed)
    }

    /// Valid stored credentials are reused; expired ones are refreshed and
    /// written back; anything else goes through the browser flow.
    pub async fn get_credentials(&self) -> Result<Credentials, DriveError> {
        if let Some(creds) = self.retrieve_credentials()? {
            if creds.valid() {
                return Ok(creds);
            }
            if creds.expired() && creds.can_refresh() {
                let refreshed = self.refresh_credentials(&creds).await?;
                self.update_token_file(&refreshed)?;
                return Ok(refreshed);
            }
        }
        self.get_credentials_from_flow().await
    }

    /// Runs the installed-application flow: the user opens the logged URL,
    /// Google redirects back to a one-shot listener on localhost, and the
    /// authorization code is exchanged for tokens.
    pub async fn get_credentials_from_flow(&self) -> Result<Credentials, DriveError> {
        self.run_local_server(|url| {
            tracing::info!("Please visit this URL to authorize this application: {url}");
        })
        .await
    }

    /// Same as [`get_credentials_from_flow`](Self::get_credentials_from_flow),
    /// handing the authorization URL to `on_authorize_url` instead of logging it.
    pub async fn run_local_server<F>(&self, on_authorize_url: F) -> Result<Credentials, DriveError>
    where
        F: FnOnce(&str),
    {
        let secrets = load_client_secrets(&self.credential_file_path)?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{port}/");
        let state = flow_state();

        let scope = self.scopes.join(" ");
        let authorize_url = reqwest::Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state.as_str()),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| DriveError::InvalidUrl(e.to_string()))?;
        on_authorize_url(authorize_url.as_str());

        let code = wait_for_code(&listener, &state).await?;
        tracing::info!("Authorization code received, requesting tokens");

        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        let scopes = match token.scope {
            Some(granted) => granted.split_whitespace().map(str::to_string).collect(),
            None => self.scopes.clone(),
        };
        let creds = Credentials {
            token: Some(token.access_token),
            refresh_token: token.refresh_token,
            token_uri: secrets.token_uri,
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            scopes,
            expiry: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        };
        self.update_token_file(&creds)?;
        Ok(creds)
    }
}

fn load_client_secrets(path: &Path) -> Result<ClientSecrets, DriveError> {
    let content = std::fs::read_to_string(path)?;
    let file: ClientSecretsFile = serde_json::from_str(&content)?;
    file.installed
        .or(file.web)
        .ok_or_else(|| DriveError::Auth("client secrets file has no 'installed' or 'web' entry".into()))
}

/// Opaque anti-forgery value echoed back by the redirect.
fn flow_state() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Serves the loopback redirect until a request carries `code` or `error`.
async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String, DriveError> {
    loop {
        let (stream, _) = listener.accept().await?;
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        // Drain headers so the browser sees a clean response.
        let mut header = String::new();
        while reader.read_line(&mut header).await? > 2 {
            header.clear();
        }

        let target = request_line.split_whitespace().nth(1).unwrap_or("/");
        let url = reqwest::Url::parse(&format!("http://localhost{target}"))
            .map_err(|e| DriveError::InvalidUrl(e.to_string()))?;
        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut stream = reader.into_inner();
        if code.is_none() && error.is_none() {
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
                .await?;
            continue;
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
            FLOW_COMPLETE_MESSAGE.len(),
            FLOW_COMPLETE_MESSAGE
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;

        if let Some(error) = error {
            return Err(DriveError::Auth(error));
        }
        if state.as_deref() != Some(expected_state) {
            return Err(DriveError::Auth("state mismatch in authorization response".into()));
        }
        return code.ok_or_else(|| DriveError::Auth("missing authorization code".into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(expiry: Option<DateTime<Utc>>) -> Credentials {
        Credentials {
            token: Some("access".into()),
            refresh_token: Some("refresh".into()),
            token_uri: GOOGLE_TOKEN_URI.into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            scopes: vec![],
            expiry,
        }
    }

    #[test]
    fn expiry_includes_clock_skew() {
        assert!(!creds(None).expired());
        assert!(creds(None).valid());
        assert!(creds(Some(Utc::now() + Duration::seconds(100))).expired());
        assert!(!creds(Some(Utc::now() + Duration::seconds(3600))).expired());
        assert!(creds(Some(Utc::now() - Duration::seconds(1))).can_refresh());

        let mut no_token = creds(None);
        no_token.token = None;
        assert!(!no_token.valid());
    }

    #[test]
    fn parses_google_token_file_layout() {
        let json = r#"{
            "token": "ya29.a0",
            "refresh_token": "1//0g",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "abc.apps.googleusercontent.com",
            "client_secret": "shh",
            "scopes": ["https://www.googleapis.com/auth/drive.readonly"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2024-03-01T10:00:00.123456Z"
        }"#;
        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.token.as_deref(), Some("ya29.a0"));
        assert!(creds.expired());
        assert!(creds.can_refresh());
    }

    #[test]
    fn missing_token_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = GoogleDriveClientConfig::new(
            dir.path().join("token.json"),
            dir.path().join("credentials.json"),
            vec!["scope-a".into()],
        );
        assert!(config.retrieve_credentials().unwrap().is_none());

        config.update_token_file(&creds(None)).unwrap();
        let stored = config.retrieve_credentials().unwrap().unwrap();
        assert_eq!(stored.scopes, vec!["scope-a".to_string()]);
        assert!(config.to_string().starts_with("GoogleDriveClientConfig(token_file="));
    }

    #[test]
    fn state_is_random_hex() {
        let state = flow_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
        // Two flows started back to back must not share a state.
        assert_ne!(flow_state(), state);
    }
}
