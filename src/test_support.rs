//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::{Json, Router};

use crate::api::ApiClient;
use crate::core_state::{CoreState, SessionStore};
use crate::models::{Doctor, Patient, PatientSummary, Prescription, Ref};
use crate::notify::MemoryNotifier;

pub fn doctor(name: &str) -> Doctor {
    Doctor {
        id: "d1".into(),
        username: "drmehta".into(),
        name: name.into(),
        email: "mehta@cityclinic.in".into(),
        specialization: "General Medicine".into(),
        license_number: Some("MH-12345".into()),
        clinic_name: "City Clinic".into(),
        clinic_address: Some("14 Station Road, Pune".into()),
        phone: Some("9876500000".into()),
        digital_signature: None,
        require_password_change: false,
    }
}

pub fn patient(id: &str, name: &str, phone: &str) -> Patient {
    Patient {
        id: id.into(),
        patient_id: format!("P-{id}"),
        name: name.into(),
        age: 40,
        sex: "Female".into(),
        date_of_birth: None,
        phone: phone.into(),
        address: "12 MG Road, Pune".into(),
        photo: None,
        emergency_contact: Default::default(),
        medical_history: Default::default(),
        created_at: None,
    }
}

pub fn prescription(id: &str, patient_name: &str) -> Prescription {
    Prescription {
        id: id.into(),
        prescription_id: format!("RX-{id}"),
        patient: Ref::Populated(PatientSummary {
            id: format!("p-{id}"),
            patient_id: format!("P-{id}"),
            name: patient_name.into(),
            age: Some(40),
            phone: "9876543210".into(),
            address: String::new(),
        }),
        doctor: Some(Ref::Id("d1".into())),
        patient_name: patient_name.into(),
        patient_age: Some(40),
        symptoms: "fever and dry cough".into(),
        prescription: "paracetamol twice daily".into(),
        next_follow_up: None,
        notes: None,
        status: None,
        created_at: None,
        updated_at: None,
    }
}

/// Fresh logged-out session context backed by a temp directory.
pub fn core_state() -> (Arc<CoreState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    (Arc::new(CoreState::new(store)), dir)
}

/// Error body in the backend's `{ "message": ... }` shape.
pub fn status_json(code: u16, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::from_u16(code).unwrap(),
        Json(serde_json::json!({ "message": message })),
    )
}

/// A local axum server plus a gateway client pointed at its `/api` prefix.
pub struct TestBackend {
    pub client: Arc<ApiClient>,
    pub core: Arc<CoreState>,
    pub notifier: MemoryNotifier,
    pub origin: String,
    _dir: tempfile::TempDir,
}

impl TestBackend {
    pub async fn start(router: Router) -> Self {
        Self::start_with_timeout(router, crate::config::REQUEST_TIMEOUT).await
    }

    pub async fn start_with_timeout(router: Router, timeout: Duration) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let (core, dir) = core_state();
        let notifier = MemoryNotifier::new();
        let origin = format!("http://{addr}");
        let client = ApiClient::with_timeout(
            &format!("{origin}/api"),
            timeout,
            core.clone(),
            Arc::new(notifier.clone()),
        )
        .unwrap();

        Self {
            client: Arc::new(client),
            core,
            notifier,
            origin,
            _dir: dir,
        }
    }

    /// Start with an authenticated session already in place.
    pub async fn logged_in(router: Router) -> Self {
        let backend = Self::start(router).await;
        backend
            .core
            .set_session("tok".into(), doctor("Dr. Mehta"))
            .unwrap();
        backend
    }
}
