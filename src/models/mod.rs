pub mod doctor;
pub mod enums;
pub mod pagination;
pub mod patient;
pub mod prescription;
pub mod stats;

pub use doctor::{Doctor, DoctorProfileUpdate, PasswordChange};
pub use enums::{InvalidEnum, ListFilter, RecordStatus, Sex};
pub use pagination::{Page, PaginationInfo};
pub use patient::{EmergencyContact, ImageUpload, MedicalHistory, Patient, PatientForm};
pub use prescription::{
    DoctorSummary, PatientSummary, Prescription, PrescriptionDraft, PrescriptionTemplate, Ref,
};
pub use stats::{DashboardStats, DataCounts};
