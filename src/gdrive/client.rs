//! # Drive and Sheets Client
//!
//! Downloads Drive files (raw or converted from Workspace formats) and reads
//! cell values from Sheets through the REST APIs.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::auth::Credentials;
use super::{check_status, DriveError};
use crate::frame::{DataFrame, Value};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// # GoogleDriveClient
///
/// Authenticated client for Drive v3 and Sheets v4.
#[derive(Debug, Clone)]
pub struct GoogleDriveClient {
    http: reqwest::Client,
    credentials: Credentials,
    drive_base: String,
    sheets_base: String,
}

impl GoogleDriveClient {
    pub fn new(credentials: Credentials) -> Self {
        GoogleDriveClient::with_endpoints(credentials, DRIVE_API_BASE, SHEETS_API_BASE)
    }

    /// Points the client at other API roots, such as a local mock server.
    pub fn with_endpoints(
        credentials: Credentials,
        drive_base: impl Into<String>,
        sheets_base: impl Into<String>,
    ) -> Self {
        GoogleDriveClient {
            http: reqwest::Client::new(),
            credentials,
            drive_base: drive_base.into().trim_end_matches('/').to_string(),
            sheets_base: sheets_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `base` with `segments` appended, each one percent-encoded.
    fn api_url(base: &str, segments: &[&str]) -> Result<reqwest::Url, DriveError> {
        let mut url = reqwest::Url::parse(base).map_err(|e| DriveError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DriveError::InvalidUrl(format!("{base} cannot be a base URL")))?
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        url: reqwest::Url,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, DriveError> {
        let token = self
            .credentials
            .token
            .as_deref()
            .ok_or_else(|| DriveError::Auth("credentials have no access token".into()))?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        check_status(response).await
    }

    /// Converts a Google Workspace document to `mime_type` and saves it as
    /// `download_dir/file_name`.
    pub async fn export_workspace_file(
        &self,
        file_id: &str,
        mime_type: &str,
        download_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, DriveError> {
        let url = Self::api_url(&self.drive_base, &["files", file_id, "export"])?;
        let response = self.get(url, &[("mimeType", mime_type)]).await?;
        save_response(response, &download_dir.join(file_name)).await
    }

    /// Downloads a file's content unchanged to `download_dir/file_name`.
    pub async fn download_file(
        &self,
        file_id: &str,
        download_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, DriveError> {
        let url = Self::api_url(&self.drive_base, &["files", file_id])?;
        let response = self.get(url, &[("alt", "media")]).await?;
        save_response(response, &download_dir.join(file_name)).await
    }

    /// Reads `sheet_range` (A1 notation) of a spreadsheet. Cells come back as
    /// their formatted text; an empty range gives an empty vector.
    pub async fn retrieve_sheet_data(
        &self,
        file_sheet_id: &str,
        sheet_range: &str,
    ) -> Result<Vec<Vec<String>>, DriveError> {
        let url = Self::api_url(
            &self.sheets_base,
            &["spreadsheets", file_sheet_id, "values", sheet_range],
        )?;
        let range: ValueRange = self.get(url, &[]).await?.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }
}

/// Streams the body to `path`, logging progress every 10%.
async fn save_response(mut response: reqwest::Response, path: &Path) -> Result<PathBuf, DriveError> {
    let total = response.content_length();
    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;
    let mut last_logged = 0u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(total) = total.filter(|t| *t > 0) {
            let percent = written * 100 / total;
            if percent >= last_logged + 10 {
                tracing::info!("Download {percent}%.");
                last_logged = percent - percent % 10;
            }
        }
    }
    file.flush().await?;

    if total.is_none() {
        tracing::info!("Download 100%.");
    }
    tracing::debug!(path = %path.display(), bytes = written, "Saved download");
    Ok(path.to_path_buf())
}

/// Sheet values as a frame: the first row names the columns, every cell is
/// text, and short rows are padded with nulls.
pub fn sheet_to_frame(values: &[Vec<String>]) -> Result<DataFrame, DriveError> {
    let Some((header, body)) = values.split_first() else {
        return Ok(DataFrame::new(Vec::<String>::new())?);
    };
    let width = header.len();
    let rows = body
        .iter()
        .map(|row| {
            let mut cells: Vec<Value> = row.iter().map(|c| Value::Text(c.clone())).collect();
            if cells.len() < width {
                cells.resize(width, Value::Null);
            }
            cells
        })
        .collect();
    Ok(DataFrame::from_rows(header.iter().cloned(), rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn sheet_rows_are_padded() {
        let values = strings(&[&["name", "city", "amount"], &["ana", "cali", "10"], &["luis"]]);
        let frame = sheet_to_frame(&values).unwrap();
        assert_eq!(frame.columns(), &["name", "city", "amount"]);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.rows()[1], vec![Value::from("luis"), Value::Null, Value::Null]);
    }

    #[test]
    fn empty_sheet_gives_empty_frame() {
        let frame = sheet_to_frame(&[]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.width(), 0);
    }

    #[test]
    fn rows_wider_than_header_are_rejected() {
        let values = strings(&[&["a"], &["1", "2"]]);
        assert!(matches!(sheet_to_frame(&values), Err(DriveError::Frame(_))));
    }

    #[test]
    fn range_is_percent_encoded_in_path() {
        let url = GoogleDriveClient::api_url(
            "https://sheets.googleapis.com/v4",
            &["spreadsheets", "abc", "values", "My Sheet!A1:B2"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/My%20Sheet!A1:B2"
        );
    }
}
