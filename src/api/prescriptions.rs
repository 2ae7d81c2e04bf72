//! Prescription endpoints.

use serde::Deserialize;

use super::client::{ApiClient, RequestOptions};
use super::error::ApiError;
use crate::models::{ListFilter, Page, PaginationInfo, Prescription, PrescriptionDraft};
use crate::validation;

#[derive(Debug, Deserialize)]
struct PrescriptionList {
    #[serde(default)]
    prescriptions: Vec<Prescription>,
    pagination: Option<PaginationInfo>,
}

#[derive(Debug, Deserialize)]
struct PrescriptionEnvelope {
    prescription: Prescription,
}

/// One page of prescriptions, optionally narrowed server-side.
pub async fn list(
    client: &ApiClient,
    page: u32,
    limit: u32,
    filter: ListFilter,
) -> Result<Page<Prescription>, ApiError> {
    let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if filter != ListFilter::All {
        query.push(("filter", filter.as_str().to_string()));
    }
    let body: PrescriptionList = client
        .get_json_with("/prescriptions", &query, RequestOptions::default())
        .await?;
    let pagination = body
        .pagination
        .unwrap_or_else(|| PaginationInfo::single_page(body.prescriptions.len(), limit));
    Ok(Page {
        items: body.prescriptions,
        pagination,
    })
}

/// Server-side search; the term travels as a path segment.
pub async fn search(client: &ApiClient, query: &str) -> Result<Vec<Prescription>, ApiError> {
    let path = format!("/prescriptions/search/{}", urlencoding::encode(query));
    let body: PrescriptionList = client.get_json(&path).await?;
    Ok(body.prescriptions)
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Prescription, ApiError> {
    let body: PrescriptionEnvelope = client
        .get_json(&format!("/prescriptions/{}", urlencoding::encode(id)))
        .await?;
    Ok(body.prescription)
}

/// Every prescription written for one patient, newest first as the server sends them.
pub async fn for_patient(client: &ApiClient, patient_id: &str) -> Result<Vec<Prescription>, ApiError> {
    let body: PrescriptionList = client
        .get_json(&format!(
            "/prescriptions/patient/{}",
            urlencoding::encode(patient_id)
        ))
        .await?;
    Ok(body.prescriptions)
}

pub async fn create(client: &ApiClient, draft: &PrescriptionDraft) -> Result<Prescription, ApiError> {
    validation::validate_prescription(draft, chrono::Utc::now())?;
    let body: PrescriptionEnvelope = client.post_json("/prescriptions", draft).await?;
    tracing::info!(prescription_id = %body.prescription.prescription_id, "Prescription created");
    Ok(body.prescription)
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    draft: &PrescriptionDraft,
) -> Result<Prescription, ApiError> {
    validation::validate_prescription(draft, chrono::Utc::now())?;
    let body: PrescriptionEnvelope = client
        .put_json(&format!("/prescriptions/{}", urlencoding::encode(id)), draft)
        .await?;
    tracing::info!(id, "Prescription updated");
    Ok(body.prescription)
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("/prescriptions/{}", urlencoding::encode(id)))
        .await?;
    tracing::info!(id, "Prescription deleted");
    Ok(())
}
