//! # Google Drive and Sheets (`gdrive`)
//!
//! OAuth credential management for an installed application plus a small
//! REST client for Drive downloads and Sheets values.

use crate::frame::FrameError;

pub mod auth;
pub mod client;

pub use auth::{Credentials, GoogleDriveClientConfig};
pub use client::{sheet_to_frame, GoogleDriveClient};

#[derive(thiserror::Error, Debug)]
pub enum DriveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Google API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Authorization failed: {0}")]
    Auth(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Turns a non-2xx response into [`DriveError::Api`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::Api {
        status: status.as_u16(),
        body,
    })
}
