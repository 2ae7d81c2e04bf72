//! Danger-zone export and import.
//!
//! Export downloads the full backup and writes it under a timestamped name.
//! Import validates the file locally before anything is sent, asks for an
//! explicit confirmation and needs a grant from a fresh danger-zone
//! re-authentication.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::api::admin::{self, ImportReport};
use crate::api::auth::DangerZoneGrant;
use crate::api::{ApiClient, ApiError};
use crate::notify::{Confirm, Notification};

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Invalid backup file: {0}")]
    InvalidFileFormat(String),
    #[error("Import cancelled")]
    Cancelled,
    #[error("Backup file error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What a backup file holds, read before it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub patients: usize,
    pub prescriptions: usize,
    pub exported_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupFile {
    data: Option<BackupData>,
    exported_at: Option<String>,
    export_date: Option<String>,
}

#[derive(Deserialize)]
struct BackupData {
    patients: Option<serde_json::Value>,
    prescriptions: Option<serde_json::Value>,
}

/// Check that `bytes` is a backup: a JSON object whose `data.patients` is
/// an array.
pub fn parse_backup(bytes: &[u8]) -> Result<BackupSummary, BackupError> {
    let file: BackupFile = serde_json::from_slice(bytes)
        .map_err(|e| BackupError::InvalidFileFormat(format!("not a JSON backup ({e})")))?;
    let data = file
        .data
        .ok_or_else(|| BackupError::InvalidFileFormat("missing \"data\" section".into()))?;
    let patients = match data.patients {
        Some(serde_json::Value::Array(items)) => items.len(),
        _ => {
            return Err(BackupError::InvalidFileFormat(
                "\"data.patients\" must be a list".into(),
            ))
        }
    };
    let prescriptions = match data.prescriptions {
        Some(serde_json::Value::Array(items)) => items.len(),
        _ => 0,
    };
    Ok(BackupSummary {
        patients,
        prescriptions,
        exported_at: file.exported_at.or(file.export_date),
    })
}

/// File name for a backup taken at `now`.
pub fn backup_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("clinicdesk-backup-{}.json", now.format("%Y%m%d-%H%M%S"))
}

/// Download the full backup into `dir`. Returns the written path.
pub async fn export_backup(client: &ApiClient, dir: &Path) -> Result<PathBuf, BackupError> {
    let result = write_export(client, dir).await;
    match &result {
        Ok(path) => {
            tracing::info!(path = %path.display(), "Backup exported");
            client.notify(Notification::success(
                "Export Complete",
                format!("Backup saved to {}", path.display()),
            ));
        }
        Err(e) => {
            tracing::warn!(error = %e, "Backup export failed");
            client.notify(Notification::error("Export Failed", failure_message(e)));
        }
    }
    result
}

async fn write_export(client: &ApiClient, dir: &Path) -> Result<PathBuf, BackupError> {
    let bytes = admin::export_data(client).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(backup_file_name(chrono::Local::now()));
    tokio::fs::write(&path, &bytes).await?;
    Ok(path)
}

/// Replace the server's data with the backup at `path`.
///
/// Nothing is sent when the file is malformed or the user declines.
pub async fn import_backup(
    client: &ApiClient,
    path: &Path,
    grant: &DangerZoneGrant,
    confirm: &dyn Confirm,
) -> Result<ImportReport, BackupError> {
    let result = run_import(client, path, grant, confirm).await;
    match &result {
        Ok(report) => {
            let counts = &report.counts;
            client.notify(Notification::success(
                "Import Complete",
                format!(
                    "Imported {} patients, {} prescriptions, {} doctors and {} templates.",
                    counts.patients, counts.prescriptions, counts.doctors, counts.templates
                ),
            ));
        }
        Err(BackupError::Cancelled) => tracing::info!("Backup import cancelled"),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Backup import failed");
            client.notify(Notification::error("Import Failed", failure_message(e)));
        }
    }
    result
}

async fn run_import(
    client: &ApiClient,
    path: &Path,
    grant: &DangerZoneGrant,
    confirm: &dyn Confirm,
) -> Result<ImportReport, BackupError> {
    let bytes = tokio::fs::read(path).await?;
    let summary = parse_backup(&bytes)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup.json".to_string());

    let question = format!(
        "This will replace ALL existing data with {} patients and {} prescriptions from \"{}\". This action cannot be undone!",
        summary.patients, summary.prescriptions, file_name
    );
    if !confirm.confirm("Import Backup?", &question) {
        return Err(BackupError::Cancelled);
    }

    Ok(admin::import_data(client, &file_name, bytes, grant).await?)
}

fn failure_message(err: &BackupError) -> String {
    match err {
        BackupError::Api(e) => e.user_message("The server rejected the request."),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::AutoConfirm;
    use crate::test_support::TestBackend;
    use axum::extract::Multipart;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BACKUP: &str = r#"{
        "exportedAt": "2024-06-01T10:00:00Z",
        "data": {
            "patients": [{"name": "Asha"}, {"name": "Bela"}],
            "prescriptions": [{"symptoms": "fever"}]
        }
    }"#;

    #[test]
    fn parses_valid_backup() {
        let summary = parse_backup(BACKUP.as_bytes()).unwrap();
        assert_eq!(summary.patients, 2);
        assert_eq!(summary.prescriptions, 1);
        assert_eq!(summary.exported_at.as_deref(), Some("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn rejects_malformed_backups() {
        for bad in [
            "not json",
            "[]",
            r#"{"patients": []}"#,
            r#"{"data": {}}"#,
            r#"{"data": {"patients": {"a": 1}}}"#,
        ] {
            assert!(
                matches!(parse_backup(bad.as_bytes()), Err(BackupError::InvalidFileFormat(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn file_name_is_timestamped() {
        let at = chrono::Local.with_ymd_and_hms(2024, 6, 1, 9, 5, 3).unwrap();
        assert_eq!(backup_file_name(at), "clinicdesk-backup-20240601-090503.json");
    }

    fn import_router(hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/api/admin/import",
            post(move |mut multipart: Multipart| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let mut token = None;
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        if field.name() == Some("dangerZoneToken") {
                            token = Some(field.text().await.unwrap());
                        }
                    }
                    assert_eq!(token.as_deref(), Some("dz"));
                    Json(serde_json::json!({
                        "message": "Data imported successfully",
                        "verifiedCounts": {"patients": 2, "prescriptions": 1, "doctors": 1, "templates": 0}
                    }))
                }
            }),
        )
    }

    fn grant() -> DangerZoneGrant {
        DangerZoneGrant {
            token: Some("dz".into()),
        }
    }

    #[tokio::test]
    async fn import_posts_after_confirmation() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = TestBackend::logged_in(import_router(hits.clone())).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, BACKUP).unwrap();

        let report = import_backup(&backend.client, &path, &grant(), &AutoConfirm(true))
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(report.counts.patients, 2);
        assert!(backend
            .notifier
            .all()
            .iter()
            .any(|n| n.title() == "Import Complete"));
    }

    #[tokio::test]
    async fn declined_import_sends_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = TestBackend::logged_in(import_router(hits.clone())).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, BACKUP).unwrap();

        let err = import_backup(&backend.client, &path, &grant(), &AutoConfirm(false))
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Cancelled));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(backend.notifier.all().is_empty());
    }

    #[tokio::test]
    async fn malformed_file_never_reaches_server() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = TestBackend::logged_in(import_router(hits.clone())).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, r#"{"data": {"patients": "nope"}}"#).unwrap();

        let err = import_backup(&backend.client, &path, &grant(), &AutoConfirm(true))
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::InvalidFileFormat(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(backend
            .notifier
            .all()
            .iter()
            .any(|n| n.title() == "Import Failed"));
    }

    #[tokio::test]
    async fn export_writes_timestamped_file() {
        let router = Router::new().route("/api/admin/export", get(|| async { BACKUP }));
        let backend = TestBackend::logged_in(router).await;
        let dir = tempfile::tempdir().unwrap();

        let path = export_backup(&backend.client, &dir.path().join("exports"))
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("clinicdesk-backup-"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), BACKUP);
        assert!(backend
            .notifier
            .all()
            .iter()
            .any(|n| n.title() == "Export Complete"));
    }
}
