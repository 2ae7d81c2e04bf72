//! Doctor profile, signature and template endpoints.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::client::ApiClient;
use super::error::ApiError;
use crate::models::{Doctor, DoctorProfileUpdate, ImageUpload, PrescriptionTemplate};
use crate::validation;

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    doctor: Doctor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureResponse {
    signature_path: String,
}

#[derive(Debug, Deserialize)]
struct TemplateList {
    #[serde(default)]
    templates: Vec<PrescriptionTemplate>,
}

/// Save the profile and refresh the stored doctor.
pub async fn update_profile(
    client: &ApiClient,
    profile: &DoctorProfileUpdate,
) -> Result<Doctor, ApiError> {
    validation::validate_doctor_profile(profile)?;
    let body: ProfileResponse = client.put_json("/doctors/profile", profile).await?;
    client.core().update_doctor(body.doctor.clone())?;
    tracing::info!("Doctor profile updated");
    Ok(body.doctor)
}

/// Upload a signature image. Returns the stored path and records it on the
/// session's doctor.
pub async fn upload_signature(client: &ApiClient, image: &ImageUpload) -> Result<String, ApiError> {
    let part = Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.mime_type)
        .map_err(|e| ApiError::Decode(format!("invalid signature type: {e}")))?;
    let body: SignatureResponse = client
        .post_multipart("/doctors/signature", Form::new().part("signature", part))
        .await?;

    if let Some(mut doctor) = client.core().doctor() {
        doctor.digital_signature = Some(body.signature_path.clone());
        client.core().update_doctor(doctor)?;
    }
    Ok(body.signature_path)
}

pub async fn delete_signature(client: &ApiClient) -> Result<(), ApiError> {
    client.delete("/doctors/signature").await?;
    if let Some(mut doctor) = client.core().doctor() {
        doctor.digital_signature = None;
        client.core().update_doctor(doctor)?;
    }
    Ok(())
}

/// Prescription templates of the logged-in doctor.
pub async fn templates(client: &ApiClient) -> Result<Vec<PrescriptionTemplate>, ApiError> {
    let body: TemplateList = client.get_json("/doctors/templates").await?;
    Ok(body.templates)
}
