use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Sex;
use crate::validation::{age_from_dob, dob_from_age};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    pub allergies: Option<String>,
    pub chronic_illnesses: Option<String>,
    pub past_surgeries: Option<String>,
    pub medications: Option<String>,
    pub additional_notes: Option<String>,
}

/// Client-side projection of a backend patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Internal backend id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Human-facing patient code.
    #[serde(default)]
    pub patient_id: String,
    pub name: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub sex: String,
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub photo: Option<String>,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    pub created_at: Option<DateTime<Utc>>,
}

/// Patient create/edit form, flattened the way the multipart endpoint expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientForm {
    pub patient_id: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub phone: String,
    pub address: String,
    pub emergency_contact: EmergencyContact,
    pub medical_history: MedicalHistory,
}

impl PatientForm {
    /// Pre-fill an edit form from an existing record. A stored birth date
    /// wins over the stored age, which may be out of date.
    pub fn from_patient(patient: &Patient, today: NaiveDate) -> Self {
        let mut form = Self {
            patient_id: patient.patient_id.clone(),
            name: patient.name.clone(),
            date_of_birth: None,
            age: Some(patient.age),
            sex: patient.sex.parse().ok(),
            phone: patient.phone.clone(),
            address: patient.address.clone(),
            emergency_contact: patient.emergency_contact.clone(),
            medical_history: patient.medical_history.clone(),
        };
        if let Some(dob) = patient.date_of_birth {
            form.set_date_of_birth(dob.date_naive(), today);
        }
        form
    }

    /// Set the birth date; age follows it.
    pub fn set_date_of_birth(&mut self, dob: NaiveDate, today: NaiveDate) {
        self.date_of_birth = Some(dob);
        self.age = Some(age_from_dob(dob, today));
    }

    /// Set the age; the birth date moves to 1 January of the implied year.
    pub fn set_age(&mut self, age: u32, today: NaiveDate) {
        self.age = Some(age);
        self.date_of_birth = dob_from_age(age, today);
    }

    /// Text fields in submission order. Empty optionals are sent as empty strings.
    pub fn multipart_fields(&self) -> Vec<(&'static str, String)> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let history = &self.medical_history;
        vec![
            ("patientId", self.patient_id.clone()),
            ("name", self.name.clone()),
            (
                "dateOfBirth",
                self.date_of_birth
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
            ("age", self.age.map(|a| a.to_string()).unwrap_or_default()),
            (
                "sex",
                self.sex.map(|s| s.as_str().to_string()).unwrap_or_default(),
            ),
            ("address", self.address.clone()),
            ("phone", self.phone.clone()),
            ("emergencyContactName", self.emergency_contact.name.clone()),
            (
                "emergencyContactRelation",
                self.emergency_contact.relation.clone(),
            ),
            ("emergencyContactPhone", self.emergency_contact.phone.clone()),
            ("allergies", opt(&history.allergies)),
            ("chronicIllnesses", opt(&history.chronic_illnesses)),
            ("pastSurgeries", opt(&history.past_surgeries)),
            ("medications", opt(&history.medications)),
            ("additionalNotes", opt(&history.additional_notes)),
        ]
    }
}

/// Image attached to a patient or signature upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Load an image file. The MIME type comes from the extension.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}
