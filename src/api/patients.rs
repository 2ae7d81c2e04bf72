//! Patient endpoints.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::client::{ApiClient, RequestOptions};
use super::error::ApiError;
use crate::models::{ImageUpload, Page, PaginationInfo, Patient, PatientForm};
use crate::validation;

#[derive(Debug, Deserialize)]
struct PatientList {
    #[serde(default)]
    patients: Vec<Patient>,
    pagination: Option<PaginationInfo>,
}

#[derive(Debug, Deserialize)]
struct PatientEnvelope {
    patient: Patient,
}

/// One page of patients. A response without pagination metadata is a
/// single page holding everything returned.
pub async fn list(client: &ApiClient, page: u32, limit: u32) -> Result<Page<Patient>, ApiError> {
    let body: PatientList = client
        .get_json_with(
            "/patients",
            &[("page", page.to_string()), ("limit", limit.to_string())],
            RequestOptions::default(),
        )
        .await?;
    let pagination = body
        .pagination
        .unwrap_or_else(|| PaginationInfo::single_page(body.patients.len(), limit));
    Ok(Page {
        items: body.patients,
        pagination,
    })
}

/// Server-side search across id, name and phone.
pub async fn search(client: &ApiClient, query: &str) -> Result<Vec<Patient>, ApiError> {
    let body: PatientList = client
        .get_json_with(
            "/patients/search",
            &[("query", query.to_string())],
            RequestOptions::default(),
        )
        .await?;
    Ok(body.patients)
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Patient, ApiError> {
    let body: PatientEnvelope = client
        .get_json(&format!("/patients/{}", urlencoding::encode(id)))
        .await?;
    Ok(body.patient)
}

fn build_form(form: &PatientForm, photo: Option<&ImageUpload>) -> Result<Form, ApiError> {
    let mut multipart = Form::new();
    for (name, value) in form.multipart_fields() {
        multipart = multipart.text(name, value);
    }
    if let Some(photo) = photo {
        let part = Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.mime_type)
            .map_err(|e| ApiError::Decode(format!("invalid photo type: {e}")))?;
        multipart = multipart.part("photo", part);
    }
    Ok(multipart)
}

/// Register a patient. The form is validated before anything is sent.
pub async fn create(
    client: &ApiClient,
    form: &PatientForm,
    photo: Option<&ImageUpload>,
) -> Result<Patient, ApiError> {
    validation::validate_patient(form, chrono::Local::now().date_naive())?;
    let body: PatientEnvelope = client
        .post_multipart("/patients", build_form(form, photo)?)
        .await?;
    tracing::info!(patient_id = %body.patient.patient_id, "Patient created");
    Ok(body.patient)
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    form: &PatientForm,
    photo: Option<&ImageUpload>,
) -> Result<Patient, ApiError> {
    validation::validate_patient(form, chrono::Local::now().date_naive())?;
    let body: PatientEnvelope = client
        .put_multipart(
            &format!("/patients/{}", urlencoding::encode(id)),
            build_form(form, photo)?,
        )
        .await?;
    tracing::info!(id, "Patient updated");
    Ok(body.patient)
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("/patients/{}", urlencoding::encode(id)))
        .await?;
    tracing::info!(id, "Patient deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmergencyContact, Sex};
    use crate::test_support::{patient, TestBackend};
    use axum::extract::{Multipart, Path, Query};
    use axum::routing::get as get_route;
    use axum::{Json, Router};
    use std::collections::HashMap;

    #[tokio::test]
    async fn list_passes_page_and_limit() {
        let router = Router::new().route(
            "/api/patients",
            get_route(|Query(q): Query<HashMap<String, String>>| async move {
                let page: u32 = q["page"].parse().unwrap();
                let limit: u32 = q["limit"].parse().unwrap();
                Json(serde_json::json!({
                    "patients": [patient("a", "Asha", "9876543210")],
                    "pagination": PaginationInfo::compute(page, 23, limit),
                }))
            }),
        );
        let backend = TestBackend::logged_in(router).await;

        let page = list(&backend.client, 2, 5).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.total_pages, 5);
    }

    #[tokio::test]
    async fn list_without_pagination_is_single_page() {
        let router = Router::new().route(
            "/api/patients",
            get_route(|| async {
                Json(serde_json::json!({
                    "patients": [patient("a", "Asha", "1"), patient("b", "Bela", "2")],
                }))
            }),
        );
        let backend = TestBackend::logged_in(router).await;

        let page = list(&backend.client, 1, 10).await.unwrap();

        assert_eq!(page.pagination.total_pages, 1);
        assert_eq!(page.pagination.total_items, 2);
        assert!(!page.pagination.has_next_page);
    }

    #[tokio::test]
    async fn search_sends_query_parameter() {
        let router = Router::new().route(
            "/api/patients/search",
            get_route(|Query(q): Query<HashMap<String, String>>| async move {
                let name = q.get("query").cloned().unwrap_or_default();
                Json(serde_json::json!({ "patients": [patient("a", &name, "1")] }))
            }),
        );
        let backend = TestBackend::logged_in(router).await;

        let found = search(&backend.client, "asha rao").await.unwrap();
        assert_eq!(found[0].name, "asha rao");
    }

    #[tokio::test]
    async fn get_missing_patient_is_not_found() {
        let router = Router::new().route(
            "/api/patients/:id",
            get_route(|Path(id): Path<String>| async move {
                crate::test_support::status_json(404, &format!("Patient {id} not found"))
            }),
        );
        let backend = TestBackend::logged_in(router).await;

        let err = get(&backend.client, "zz").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Patient zz not found"));
    }

    #[tokio::test]
    async fn create_sends_flattened_multipart() {
        let router = Router::new().route(
            "/api/patients",
            axum::routing::post(|mut multipart: Multipart| async move {
                let mut fields = HashMap::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    let value = if name == "photo" {
                        format!("{} bytes", field.bytes().await.unwrap().len())
                    } else {
                        field.text().await.unwrap()
                    };
                    fields.insert(name, value);
                }
                let mut p = patient("new", &fields["name"], &fields["phone"]);
                p.address = fields["emergencyContactRelation"].clone();
                p.photo = fields.get("photo").cloned();
                Json(serde_json::json!({ "patient": p }))
            }),
        );
        let backend = TestBackend::logged_in(router).await;
        let form = PatientForm {
            name: "Asha Rao".into(),
            age: Some(34),
            sex: Some(Sex::Female),
            phone: "9876543210".into(),
            address: "12 MG Road, Pune".into(),
            emergency_contact: EmergencyContact {
                name: "Ravi Rao".into(),
                relation: "Brother".into(),
                phone: "9123456789".into(),
            },
            ..PatientForm::default()
        };
        let photo = ImageUpload {
            file_name: "asha.jpg".into(),
            mime_type: "image/jpeg".into(),
            bytes: vec![0xff, 0xd8, 0xff],
        };

        let created = create(&backend.client, &form, Some(&photo)).await.unwrap();

        assert_eq!(created.name, "Asha Rao");
        assert_eq!(created.address, "Brother");
        assert_eq!(created.photo.as_deref(), Some("3 bytes"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_form_locally() {
        let backend = TestBackend::logged_in(Router::new()).await;
        let form = PatientForm {
            name: "A".into(),
            ..PatientForm::default()
        };
        let err = create(&backend.client, &form, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
