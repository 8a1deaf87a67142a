//! Google Sheets API HTTP client
//!
//! Locates a spreadsheet by name through the Drive API and appends rows
//! through the Sheets values API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::debug;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use super::api::{AppendValuesResponse, DriveFileList, Spreadsheet};
use super::{ServiceAccountAuth, SheetService, Worksheet};
use crate::models::Reading;

/// Google Sheets client authenticated as a service account
pub struct SheetsClient {
    auth: ServiceAccountAuth,
    agent: ureq::Agent,
}

impl SheetsClient {
    /// Sheets API base URL
    const SHEETS_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";
    /// Drive API files endpoint
    const DRIVE_FILES_URL: &'static str = "https://www.googleapis.com/drive/v3/files";

    /// Create a client using the service account key at `credentials_path`
    ///
    /// Every API request, including token exchange, is bounded by `timeout`.
    pub fn new(credentials_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            auth: ServiceAccountAuth::new(credentials_path, agent.clone()),
            agent,
        }
    }

    /// Find the ID of the spreadsheet with exactly this name
    pub fn find_spreadsheet_id(&self, name: &str) -> Result<String> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}?q={}&fields=files(id,name)&pageSize=10&supportsAllDrives=true&includeItemsFromAllDrives=true",
            Self::DRIVE_FILES_URL,
            urlencoding::encode(&spreadsheet_query(name)),
        );

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(|e| self.on_request_error(e))
            .context("Failed to send spreadsheet lookup request")?;

        let list: DriveFileList = response
            .body_mut()
            .read_json()
            .context("Failed to parse spreadsheet lookup response")?;

        list.files
            .unwrap_or_default()
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.id)
            .with_context(|| format!("Spreadsheet not found: {}", name))
    }

    /// Get the title of the first worksheet (tab) of a spreadsheet
    pub fn first_worksheet_title(&self, spreadsheet_id: &str) -> Result<String> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/{}?fields=sheets.properties(sheetId,title,index)",
            Self::SHEETS_URL,
            urlencoding::encode(spreadsheet_id),
        );

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(|e| self.on_request_error(e))
            .context("Failed to send spreadsheet metadata request")?;

        let spreadsheet: Spreadsheet = response
            .body_mut()
            .read_json()
            .context("Failed to parse spreadsheet metadata response")?;

        first_sheet_title(spreadsheet)
            .with_context(|| format!("Spreadsheet {} has no worksheets", spreadsheet_id))
    }

    /// Append rows after the existing content of a worksheet
    pub fn append_values(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: &[Reading],
    ) -> Result<()> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            Self::SHEETS_URL,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(&append_range(title)),
        );

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(append_body(rows))
            .map_err(|e| self.on_request_error(e))
            .context("Failed to send append request")?;

        let appended: AppendValuesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse append response")?;

        if let Some(updates) = appended.updates {
            debug!(
                "Appended {} rows to {}",
                updates.updated_rows.unwrap_or(0),
                updates.updated_range.unwrap_or_default()
            );
        }

        Ok(())
    }

    /// Drop the cached token when the API rejects it
    fn on_request_error(&self, err: ureq::Error) -> ureq::Error {
        if matches!(err, ureq::Error::StatusCode(401)) {
            self.auth.invalidate();
        }
        err
    }
}

impl SheetService for SheetsClient {
    fn open(&self, sheet_name: &str) -> Result<Box<dyn Worksheet + '_>> {
        let spreadsheet_id = self.find_spreadsheet_id(sheet_name)?;
        let title = self.first_worksheet_title(&spreadsheet_id)?;

        Ok(Box::new(SheetsWorksheet {
            client: self,
            spreadsheet_id,
            title,
        }))
    }
}

/// Handle to the first worksheet of an opened spreadsheet
pub struct SheetsWorksheet<'a> {
    client: &'a SheetsClient,
    spreadsheet_id: String,
    title: String,
}

impl SheetsWorksheet<'_> {
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Worksheet for SheetsWorksheet<'_> {
    fn append_rows(&self, rows: &[Reading]) -> Result<()> {
        self.client.append_values(&self.spreadsheet_id, &self.title, rows)
    }
}

/// Drive search query matching a non-trashed spreadsheet by exact name
fn spreadsheet_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
        escaped
    )
}

/// A1 range anchoring an append at the top-left of a worksheet
fn append_range(title: &str) -> String {
    format!("'{}'!A1", title.replace('\'', "''"))
}

fn append_body(rows: &[Reading]) -> serde_json::Value {
    let values: Vec<_> = rows.iter().map(Reading::to_row).collect();
    json!({ "values": values })
}

/// Title of the sheet with the lowest index
fn first_sheet_title(spreadsheet: Spreadsheet) -> Option<String> {
    spreadsheet
        .sheets
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .min_by_key(|(pos, s)| s.properties.index.unwrap_or(*pos as i64))
        .map(|(_, s)| s.properties.title)
}
