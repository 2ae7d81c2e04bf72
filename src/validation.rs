//! Client-side form rules.
//!
//! Each validator collects every failing field into [`ValidationErrors`] so
//! a form can show all problems at once. Nothing here touches the network.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use crate::models::{DoctorProfileUpdate, PasswordChange, PatientForm, PrescriptionDraft};

static USERNAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]*$").unwrap());
static ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]*$").unwrap());
static LETTERS_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]*$").unwrap());
static LETTERS_SPACES_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s.]*$").unwrap());
static INDIAN_MOBILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[6-9]\d{9}$").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MAX_AGE: u32 = 150;
const MIN_MEANINGFUL_WORDS: usize = 3;

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

/// One failing form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every failing field of one form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

// ── Field checks ────────────────────────────────────────────

struct Checker {
    errors: ValidationErrors,
}

impl Checker {
    fn new() -> Self {
        Self {
            errors: ValidationErrors::default(),
        }
    }

    /// Required text with a character-length range. Returns false on failure
    /// so pattern checks are skipped for that field.
    fn text(&mut self, field: &'static str, label: &str, value: &str, min: usize, max: usize) -> bool {
        let len = value.trim().chars().count();
        if len == 0 {
            self.errors.push(field, format!("{label} is required"));
            false
        } else if len < min {
            self.errors
                .push(field, format!("{label} must be at least {min} characters"));
            false
        } else if value.chars().count() > max {
            self.errors
                .push(field, format!("{label} cannot exceed {max} characters"));
            false
        } else {
            true
        }
    }

    fn max_len(&mut self, field: &'static str, label: &str, value: Option<&str>, max: usize) {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.errors
                .push(field, format!("{label} cannot exceed {max} characters"));
        }
    }

    fn pattern(&mut self, field: &'static str, value: &str, re: &Regex, message: &str) {
        if !re.is_match(value.trim()) {
            self.errors.push(field, message);
        }
    }

    fn phone(&mut self, field: &'static str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.errors.push(field, format!("{label} is required"));
        } else if !INDIAN_MOBILE.is_match(value.trim()) {
            self.errors
                .push(field, "Please enter a valid 10-digit Indian mobile number");
        }
    }

    fn meaningful(&mut self, field: &'static str, label: &str, value: &str) {
        if self.text(field, label, value, 10, 2000)
            && value.split_whitespace().count() < MIN_MEANINGFUL_WORDS
        {
            self.errors.push(
                field,
                format!("Please provide meaningful {} details", label.to_lowercase()),
            );
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}

// ═══════════════════════════════════════════════════════════
// Forms
// ═══════════════════════════════════════════════════════════

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut c = Checker::new();
    if c.text("username", "Username", username, 3, 20) {
        c.pattern(
            "username",
            username,
            &USERNAME,
            "Username can only contain letters, numbers, and underscores",
        );
    }
    if password.is_empty() {
        c.errors.push("password", "Password is required");
    } else if password.chars().count() < 6 {
        c.errors
            .push("password", "Password must be at least 6 characters");
    } else if password.chars().count() > 50 {
        c.errors
            .push("password", "Password cannot exceed 50 characters");
    }
    c.finish()
}

/// Patient create/edit form. `today` bounds the date of birth.
pub fn validate_patient(form: &PatientForm, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut c = Checker::new();

    if !form.patient_id.is_empty() {
        c.pattern(
            "patientId",
            &form.patient_id,
            &ALNUM,
            "Patient ID can only contain letters and numbers",
        );
        c.max_len("patientId", "Patient ID", Some(&form.patient_id), 20);
    }

    if c.text("name", "Full name", &form.name, 2, 50) {
        c.pattern(
            "name",
            &form.name,
            &LETTERS_SPACES,
            "Name can only contain letters and spaces",
        );
    }

    if let Some(dob) = form.date_of_birth {
        if dob > today {
            c.errors
                .push("dateOfBirth", "Date of birth cannot be in the future");
        } else if today.year() - dob.year() > MAX_AGE as i32 {
            c.errors
                .push("dateOfBirth", "Age must be between 0 and 150 years");
        }
    }

    match (form.age, form.date_of_birth) {
        (None, _) => c.errors.push("age", "Age is required"),
        (Some(age), _) if age > MAX_AGE => c.errors.push("age", "Age cannot exceed 150"),
        (Some(age), Some(dob)) if dob <= today && age != age_from_dob(dob, today) => {
            c.errors.push("age", "Age does not match date of birth")
        }
        _ => {}
    }

    if form.sex.is_none() {
        c.errors.push("sex", "Sex is required");
    }

    c.phone("phone", "Phone number", &form.phone);
    c.text("address", "Address", &form.address, 10, 200);

    let contact = &form.emergency_contact;
    if c.text("emergencyContactName", "Contact name", &contact.name, 2, 50) {
        c.pattern(
            "emergencyContactName",
            &contact.name,
            &LETTERS_SPACES,
            "Name can only contain letters and spaces",
        );
    }
    if c.text("emergencyContactRelation", "Relation", &contact.relation, 2, 30) {
        c.pattern(
            "emergencyContactRelation",
            &contact.relation,
            &LETTERS_SPACES,
            "Relation can only contain letters and spaces",
        );
    }
    c.phone("emergencyContactPhone", "Emergency contact phone", &contact.phone);

    let history = &form.medical_history;
    c.max_len("allergies", "Allergies", history.allergies.as_deref(), 500);
    c.max_len(
        "chronicIllnesses",
        "Chronic illnesses",
        history.chronic_illnesses.as_deref(),
        500,
    );
    c.max_len(
        "pastSurgeries",
        "Past surgeries",
        history.past_surgeries.as_deref(),
        500,
    );
    c.max_len(
        "medications",
        "Current medications",
        history.medications.as_deref(),
        500,
    );
    c.max_len(
        "additionalNotes",
        "Additional notes",
        history.additional_notes.as_deref(),
        1000,
    );

    c.finish()
}

/// Prescription create/edit draft. `now` bounds the follow-up date.
pub fn validate_prescription(
    draft: &PrescriptionDraft,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut c = Checker::new();

    if draft.patient_id.trim().is_empty() {
        c.errors.push("patientId", "Please select a patient");
    }
    c.meaningful("symptoms", "Symptom", &draft.symptoms);
    c.meaningful("prescription", "Prescription", &draft.prescription);

    if let Some(follow_up) = draft.next_follow_up {
        let limit = now.checked_add_months(Months::new(12)).unwrap_or(now);
        if follow_up.date_naive() < now.date_naive() {
            c.errors
                .push("nextFollowUp", "Follow-up date cannot be in the past");
        } else if follow_up > limit {
            c.errors
                .push("nextFollowUp", "Follow-up date should be within 1 year");
        }
    }

    c.max_len("notes", "Notes", draft.notes.as_deref(), 1000);
    c.finish()
}

pub fn validate_doctor_profile(profile: &DoctorProfileUpdate) -> Result<(), ValidationErrors> {
    let mut c = Checker::new();

    if c.text("name", "Name", &profile.name, 2, 50) {
        c.pattern(
            "name",
            &profile.name,
            &LETTERS_SPACES_DOTS,
            "Name can only contain letters, spaces, and dots",
        );
    }
    if c.text("email", "Email", &profile.email, 1, 100) {
        c.pattern("email", &profile.email, &EMAIL, "Invalid email format");
    }
    if c.text("specialization", "Specialization", &profile.specialization, 2, 50) {
        c.pattern(
            "specialization",
            &profile.specialization,
            &LETTERS_SPACES,
            "Specialization can only contain letters and spaces",
        );
    }
    c.text("clinicName", "Clinic name", &profile.clinic_name, 2, 100);
    c.text(
        "clinicAddress",
        "Clinic address",
        &profile.clinic_address,
        10,
        200,
    );
    c.phone("phone", "Phone number", &profile.phone);

    c.finish()
}

pub fn validate_password_change(change: &PasswordChange) -> Result<(), ValidationErrors> {
    let mut c = Checker::new();

    if change.current_password.is_empty() {
        c.errors
            .push("currentPassword", "Current password is required");
    }

    let new = &change.new_password;
    if new.is_empty() {
        c.errors.push("newPassword", "New password is required");
    } else if new.chars().count() < 6 {
        c.errors
            .push("newPassword", "New password must be at least 6 characters");
    } else if !(new.chars().any(|ch| ch.is_ascii_lowercase())
        && new.chars().any(|ch| ch.is_ascii_uppercase())
        && new.chars().any(|ch| ch.is_ascii_digit()))
    {
        c.errors.push(
            "newPassword",
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }

    if change.confirm_password.is_empty() {
        c.errors
            .push("confirmPassword", "Please confirm your new password");
    } else if change.confirm_password != change.new_password {
        c.errors.push("confirmPassword", "Passwords must match");
    }

    c.finish()
}

// ═══════════════════════════════════════════════════════════
// Age / date-of-birth derivation
// ═══════════════════════════════════════════════════════════

/// Completed years between `dob` and `today`.
pub fn age_from_dob(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    u32::try_from(age).unwrap_or(0)
}

/// 1 January of the birth year implied by `age`.
pub fn dob_from_age(age: u32, today: NaiveDate) -> Option<NaiveDate> {
    let year = today.year() - i32::try_from(age).ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmergencyContact, Sex};
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn valid_patient() -> PatientForm {
        PatientForm {
            name: "Asha Rao".into(),
            date_of_birth: Some(date(1990, 5, 17)),
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
        }
    }

    fn valid_draft() -> PrescriptionDraft {
        PrescriptionDraft {
            patient_id: "p1".into(),
            symptoms: "fever and dry cough for three days".into(),
            prescription: "paracetamol 500mg twice daily after food".into(),
            next_follow_up: None,
            notes: None,
        }
    }

    #[test]
    fn login_rules() {
        assert!(validate_login("dr_mehta", "secret1").is_ok());

        let errs = validate_login("ab", "123").unwrap_err();
        assert_eq!(errs.get("username"), Some("Username must be at least 3 characters"));
        assert_eq!(errs.get("password"), Some("Password must be at least 6 characters"));

        let errs = validate_login("dr.mehta", "secret1").unwrap_err();
        assert!(errs.get("username").unwrap().contains("underscores"));
    }

    #[test]
    fn valid_patient_passes() {
        assert!(validate_patient(&valid_patient(), date(2024, 6, 1)).is_ok());
    }

    #[test]
    fn patient_collects_every_failure() {
        let form = PatientForm {
            name: "Asha 2".into(),
            phone: "12345".into(),
            ..valid_patient()
        };
        let errs = validate_patient(&form, date(2024, 6, 1)).unwrap_err();
        assert_eq!(errs.errors().len(), 2);
        assert!(errs.get("name").is_some());
        assert_eq!(
            errs.get("phone"),
            Some("Please enter a valid 10-digit Indian mobile number")
        );
    }

    #[test]
    fn phone_must_start_with_six_to_nine() {
        let form = PatientForm {
            phone: "5876543210".into(),
            ..valid_patient()
        };
        assert!(validate_patient(&form, date(2024, 6, 1)).is_err());
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let form = PatientForm {
            date_of_birth: Some(date(2025, 1, 1)),
            ..valid_patient()
        };
        let errs = validate_patient(&form, date(2024, 6, 1)).unwrap_err();
        assert_eq!(errs.get("dateOfBirth"), Some("Date of birth cannot be in the future"));
    }

    #[test]
    fn age_must_match_birth_date() {
        let form = PatientForm {
            age: Some(5),
            date_of_birth: Some(date(1980, 3, 1)),
            ..valid_patient()
        };
        let errs = validate_patient(&form, date(2024, 6, 1)).unwrap_err();
        assert_eq!(errs.get("age"), Some("Age does not match date of birth"));

        let form = PatientForm {
            age: Some(44),
            ..form
        };
        assert!(validate_patient(&form, date(2024, 6, 1)).is_ok());
    }

    #[test]
    fn patient_id_must_be_alphanumeric() {
        let form = PatientForm {
            patient_id: "P-01".into(),
            ..valid_patient()
        };
        let errs = validate_patient(&form, date(2024, 6, 1)).unwrap_err();
        assert!(errs.get("patientId").is_some());
    }

    #[test]
    fn history_fields_are_length_capped() {
        let mut form = valid_patient();
        form.medical_history.allergies = Some("x".repeat(501));
        let errs = validate_patient(&form, date(2024, 6, 1)).unwrap_err();
        assert_eq!(errs.get("allergies"), Some("Allergies cannot exceed 500 characters"));
    }

    #[test]
    fn prescription_requires_three_words() {
        let now = Utc::now();
        assert!(validate_prescription(&valid_draft(), now).is_ok());

        let draft = PrescriptionDraft {
            symptoms: "feverishness".into(),
            ..valid_draft()
        };
        let errs = validate_prescription(&draft, now).unwrap_err();
        assert_eq!(
            errs.get("symptoms"),
            Some("Please provide meaningful symptom details")
        );
    }

    #[test]
    fn prescription_requires_patient() {
        let draft = PrescriptionDraft {
            patient_id: String::new(),
            ..valid_draft()
        };
        let errs = validate_prescription(&draft, Utc::now()).unwrap_err();
        assert_eq!(errs.get("patientId"), Some("Please select a patient"));
    }

    #[test]
    fn follow_up_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let today = PrescriptionDraft {
            next_follow_up: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            ..valid_draft()
        };
        assert!(validate_prescription(&today, now).is_ok());

        let past = PrescriptionDraft {
            next_follow_up: Some(now - Duration::days(2)),
            ..valid_draft()
        };
        assert!(validate_prescription(&past, now).is_err());

        let far = PrescriptionDraft {
            next_follow_up: Some(now + Duration::days(400)),
            ..valid_draft()
        };
        let errs = validate_prescription(&far, now).unwrap_err();
        assert_eq!(errs.get("nextFollowUp"), Some("Follow-up date should be within 1 year"));
    }

    #[test]
    fn doctor_profile_rules() {
        let mut profile = DoctorProfileUpdate {
            name: "Dr. R. Mehta".into(),
            email: "mehta@cityclinic.in".into(),
            specialization: "General Medicine".into(),
            license_number: None,
            clinic_name: "City Clinic".into(),
            clinic_address: "14 Station Road, Pune".into(),
            phone: "9876500000".into(),
        };
        assert!(validate_doctor_profile(&profile).is_ok());

        profile.email = "not-an-email".into();
        profile.specialization = "ENT-2".into();
        let errs = validate_doctor_profile(&profile).unwrap_err();
        assert_eq!(errs.get("email"), Some("Invalid email format"));
        assert!(errs.get("specialization").is_some());
    }

    #[test]
    fn password_change_rules() {
        let ok = PasswordChange {
            current_password: "temp123".into(),
            new_password: "NewPass1".into(),
            confirm_password: "NewPass1".into(),
        };
        assert!(validate_password_change(&ok).is_ok());

        let weak = PasswordChange {
            new_password: "newpass1".into(),
            confirm_password: "different".into(),
            ..ok
        };
        let errs = validate_password_change(&weak).unwrap_err();
        assert!(errs.get("newPassword").unwrap().contains("uppercase"));
        assert_eq!(errs.get("confirmPassword"), Some("Passwords must match"));
    }

    #[test]
    fn display_joins_messages() {
        let mut errs = ValidationErrors::single("a", "First");
        errs.push("b", "Second");
        assert_eq!(errs.to_string(), "First; Second");
    }

    #[test]
    fn age_is_birthday_aware() {
        assert_eq!(age_from_dob(date(1990, 6, 2), date(2024, 6, 1)), 33);
        assert_eq!(age_from_dob(date(1990, 6, 1), date(2024, 6, 1)), 34);
        assert_eq!(age_from_dob(date(2025, 1, 1), date(2024, 6, 1)), 0);
    }

    #[test]
    fn dob_from_age_is_first_of_january() {
        assert_eq!(dob_from_age(34, date(2024, 6, 1)), Some(date(1990, 1, 1)));
        assert_eq!(dob_from_age(0, date(2024, 6, 1)), Some(date(2024, 1, 1)));
    }
}
