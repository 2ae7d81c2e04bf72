//! Patient search screen: the paged patient list with live search, and a
//! history panel showing the selected patient's prescriptions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{self, ApiClient, ApiError};
use crate::detail::{DetailSource, SelectionView};
use crate::models::{Page, Patient, Prescription};
use crate::notify::{confirm_delete, Confirm, Notification};
use crate::search::{SearchController, SearchSource, Searchable};

impl Searchable for Patient {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.patient_id.as_str(), self.name.as_str(), self.phone.as_str()]
    }
}

/// Patients as served by the backend.
pub struct PatientSource {
    client: Arc<ApiClient>,
}

impl PatientSource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchSource for PatientSource {
    type Item = Patient;

    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Page<Patient>, ApiError> {
        api::patients::list(&self.client, page, limit).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Patient>, ApiError> {
        api::patients::search(&self.client, query).await
    }
}

/// Prescription history keyed by the patient's internal id.
pub struct PatientHistory {
    client: Arc<ApiClient>,
}

#[async_trait]
impl DetailSource for PatientHistory {
    type Key = String;
    type Detail = Vec<Prescription>;

    async fn load(&self, patient_id: &String) -> Result<Vec<Prescription>, ApiError> {
        api::prescriptions::for_patient(&self.client, patient_id).await
    }
}

pub struct PatientsView {
    client: Arc<ApiClient>,
    list: SearchController<PatientSource>,
    history: SelectionView<PatientHistory>,
}

impl PatientsView {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let notifier = client.notifier().clone();
        Self {
            list: SearchController::new(PatientSource::new(client.clone()), notifier.clone()),
            history: SelectionView::new(
                PatientHistory {
                    client: client.clone(),
                },
                notifier,
            ),
            client,
        }
    }

    pub fn list(&self) -> &SearchController<PatientSource> {
        &self.list
    }

    pub fn history(&self) -> &SelectionView<PatientHistory> {
        &self.history
    }

    /// Show the history panel for `patient`.
    pub fn select(&self, patient: &Patient) {
        self.history.select(patient.id.clone());
    }

    /// Delete after confirmation. `Ok(false)` when the user declined.
    ///
    /// On success the record leaves the loaded page and the match set, and
    /// an open history panel for it is closed.
    pub async fn delete(&self, patient: &Patient, confirm: &dyn Confirm) -> Result<bool, ApiError> {
        if !confirm_delete(confirm, &patient.name) {
            tracing::debug!(patient = %patient.id, "Patient delete cancelled");
            return Ok(false);
        }

        if let Err(e) = api::patients::delete(&self.client, &patient.id).await {
            tracing::warn!(patient = %patient.id, error = %e, "Patient delete failed");
            self.client.notify(Notification::error(
                "Delete Failed",
                e.user_message("Error deleting patient"),
            ));
            return Err(e);
        }

        self.list.remove_where(|p| p.id == patient.id);
        if self.history.selected().as_deref() == Some(patient.id.as_str()) {
            self.history.close();
        }
        self.history.invalidate(&patient.id);
        tracing::info!(patient = %patient.id, "Patient deleted");
        self.client.notify(Notification::success(
            "Patient Deleted",
            format!("Patient \"{}\" has been deleted successfully.", patient.name),
        ));
        Ok(true)
    }

    pub fn teardown(&self) {
        self.list.teardown();
        self.history.teardown();
    }
}
