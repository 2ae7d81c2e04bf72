//! Danger-zone administration endpoints.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::auth::DangerZoneGrant;
use super::client::{ApiClient, RequestOptions};
use super::error::ApiError;
use crate::models::DataCounts;

#[derive(Debug, Deserialize)]
struct CountsResponse {
    #[serde(default)]
    counts: DataCounts,
}

/// Server's answer to an import: its message plus the record counts it
/// verified after writing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "verifiedCounts")]
    pub counts: DataCounts,
}

/// Current record counts, shown before any destructive action.
pub async fn data_counts(client: &ApiClient) -> Result<DataCounts, ApiError> {
    let body: CountsResponse = client.get_json("/admin/data-counts").await?;
    Ok(body.counts)
}

/// Full backup as the raw JSON document.
pub async fn export_data(client: &ApiClient) -> Result<Vec<u8>, ApiError> {
    client
        .get_bytes("/admin/export", RequestOptions::default())
        .await
}

/// Upload a backup file. The danger-zone grant must come from a fresh
/// re-authentication.
pub async fn import_data(
    client: &ApiClient,
    file_name: &str,
    bytes: Vec<u8>,
    grant: &DangerZoneGrant,
) -> Result<ImportReport, ApiError> {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str("application/json")
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    let mut form = Form::new().part("backup", part);
    if let Some(token) = &grant.token {
        form = form.text("dangerZoneToken", token.clone());
    }

    let report: ImportReport = client.post_multipart("/admin/import", form).await?;
    tracing::info!(
        patients = report.counts.patients,
        prescriptions = report.counts.prescriptions,
        "Backup imported"
    );
    Ok(report)
}
