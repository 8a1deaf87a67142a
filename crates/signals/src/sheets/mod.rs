//! Google Sheets integration
//!
//! This module provides:
//! - Service-account OAuth2 authentication
//! - Sheets/Drive API client for locating a spreadsheet and appending rows
//! - The `SheetService`/`Worksheet` traits the sync engine depends on

mod auth;
mod client;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use client::{SheetsClient, SheetsWorksheet};

use anyhow::Result;

use crate::models::Reading;

/// A service that can open spreadsheets by name
pub trait SheetService: Send + Sync {
    /// Open the first worksheet of the spreadsheet called `sheet_name`
    ///
    /// Fails if credentials are invalid or the spreadsheet does not exist.
    fn open(&self, sheet_name: &str) -> Result<Box<dyn Worksheet + '_>>;
}

/// An open worksheet that rows can be appended to
pub trait Worksheet {
    /// Append `rows` after the existing content in one request, in order
    fn append_rows(&self, rows: &[Reading]) -> Result<()>;
}

/// Google API response types
pub mod api {
    use serde::Deserialize;

    /// Response from listing Drive files
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DriveFileList {
        pub files: Option<Vec<DriveFile>>,
    }

    /// Reference to a Drive file (just ID and name)
    #[derive(Debug, Deserialize)]
    pub struct DriveFile {
        pub id: String,
        pub name: String,
    }

    /// Spreadsheet metadata (only the sheet list is requested)
    #[derive(Debug, Deserialize)]
    pub struct Spreadsheet {
        pub sheets: Option<Vec<SheetEntry>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SheetEntry {
        pub properties: SheetProperties,
    }

    /// Properties of a single worksheet (tab)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SheetProperties {
        pub sheet_id: Option<i64>,
        pub title: String,
        pub index: Option<i64>,
    }

    /// Response from `values:append`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppendValuesResponse {
        pub updates: Option<UpdateValuesResponse>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdateValuesResponse {
        pub updated_range: Option<String>,
        pub updated_rows: Option<u64>,
    }

    /// OAuth2 token endpoint response
    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        pub access_token: String,
        pub expires_in: Option<u64>,
        pub token_type: Option<String>,
    }
}
