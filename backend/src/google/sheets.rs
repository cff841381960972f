//! Google Sheets values reader.

use crate::engine::slide_builder::SpreadsheetReader;
use crate::google::auth::AccessTokenProvider;
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub struct SheetsApiClient {
    http: Client,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl SheetsApiClient {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        SheetsApiClient {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            tokens,
        }
    }
}

impl SpreadsheetReader for SheetsApiClient {
    fn read_grid(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, String> {
        let token = self.tokens.access_token()?;
        let url = format!("{SHEETS_BASE}/{spreadsheet_id}/values/{range}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!(
                "Sheets respondió {}: {}",
                response.status(),
                response.text().unwrap_or_default()
            ));
        }

        let body: Value = response.json().map_err(|e| e.to_string())?;
        let values = body
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(values
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| cells.iter().map(cell_to_string).collect())
                    .unwrap_or_default()
            })
            .collect())
    }
}

/// Sheets returns numbers and booleans as JSON scalars; everything becomes
/// the string the user would see in the cell.
fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
