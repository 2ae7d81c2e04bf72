use serde::{Deserialize, Serialize};

/// Authenticated doctor profile, persisted alongside the bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub specialization: String,
    pub license_number: Option<String>,
    #[serde(default)]
    pub clinic_name: String,
    pub clinic_address: Option<String>,
    pub phone: Option<String>,
    pub digital_signature: Option<String>,
    #[serde(default)]
    pub require_password_change: bool,
}

/// Editable subset of the doctor profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfileUpdate {
    pub name: String,
    pub email: String,
    pub specialization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    pub clinic_name: String,
    pub clinic_address: String,
    pub phone: String,
}

impl DoctorProfileUpdate {
    pub fn from_doctor(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            email: doctor.email.clone(),
            specialization: doctor.specialization.clone(),
            license_number: doctor.license_number.clone(),
            clinic_name: doctor.clinic_name.clone(),
            clinic_address: doctor.clinic_address.clone().unwrap_or_default(),
            phone: doctor.phone.clone().unwrap_or_default(),
        }
    }
}

/// Forced or voluntary password change form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}
