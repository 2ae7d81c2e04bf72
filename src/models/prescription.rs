use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Patient fields the backend populates on prescription listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub name: String,
    pub age: Option<u32>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Doctor fields the backend populates on prescription listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub clinic_name: String,
    pub clinic_address: Option<String>,
}

/// A reference that is either a bare id or the populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Populated(T),
    Id(String),
}

impl Ref<PatientSummary> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Populated(p) => &p.id,
            Ref::Id(id) => id,
        }
    }
}

impl Ref<DoctorSummary> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Populated(d) => &d.id,
            Ref::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(rename = "_id")]
    pub id: String,
    /// Human-facing prescription code.
    #[serde(default)]
    pub prescription_id: String,
    #[serde(rename = "patientId")]
    pub patient: Ref<PatientSummary>,
    #[serde(rename = "doctorId")]
    pub doctor: Option<Ref<DoctorSummary>>,
    /// Snapshot taken when the prescription was written.
    #[serde(default)]
    pub patient_name: String,
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub prescription: String,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Prescription {
    /// Internal id of the referenced patient.
    pub fn patient_key(&self) -> &str {
        self.patient.id()
    }

    /// Phone of the populated patient, empty when the reference is bare.
    pub fn patient_phone(&self) -> &str {
        match &self.patient {
            Ref::Populated(p) => &p.phone,
            Ref::Id(_) => "",
        }
    }

    /// Name for display, preferring the populated patient over the snapshot.
    pub fn display_patient_name(&self) -> &str {
        match &self.patient {
            Ref::Populated(p) if !p.name.is_empty() => &p.name,
            _ => &self.patient_name,
        }
    }

    pub fn has_follow_up(&self) -> bool {
        self.next_follow_up.is_some()
    }
}

/// Body for prescription create/update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDraft {
    pub patient_id: String,
    pub symptoms: String,
    pub prescription: String,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl PrescriptionDraft {
    /// Pre-fill an edit draft from an existing prescription.
    pub fn from_prescription(prescription: &Prescription) -> Self {
        Self {
            patient_id: prescription.patient_key().to_string(),
            symptoms: prescription.symptoms.clone(),
            prescription: prescription.prescription.clone(),
            next_follow_up: prescription.next_follow_up,
            notes: prescription.notes.clone(),
        }
    }
}

/// Saved prescription template of the logged-in doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionTemplate {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub prescription: String,
    #[serde(default)]
    pub follow_up_days: u32,
}

impl PrescriptionTemplate {
    /// Fill symptoms, prescription and (when configured) the follow-up date.
    pub fn apply(&self, draft: &mut PrescriptionDraft, now: DateTime<Utc>) {
        draft.symptoms = self.symptoms.clone();
        draft.prescription = self.prescription.clone();
        if self.follow_up_days > 0 {
            draft.next_follow_up = Some(now + Duration::days(i64::from(self.follow_up_days)));
        }
    }
}
