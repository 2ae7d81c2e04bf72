//! Prescription list screen: paged list with live search, the follow-ups
//! filter, and a detail panel for one prescription.
//!
//! The filter narrows first and search runs inside it. Browse pages are
//! narrowed by the server (`filter=followups`); search and local fallback
//! results are narrowed here through [`SearchSource::retain`].

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::api::{self, ApiClient, ApiError};
use crate::detail::{DetailSource, SelectionView};
use crate::models::{ListFilter, Page, Prescription};
use crate::notify::{confirm_delete, Confirm, Notification};
use crate::search::{SearchController, SearchSource, Searchable};

impl Searchable for Prescription {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.prescription_id.as_str(),
            self.display_patient_name(),
            self.patient_phone(),
            self.symptoms.as_str(),
            self.notes.as_deref().unwrap_or_default(),
        ]
    }
}

impl Prescription {
    /// Human-facing code, falling back to the internal id.
    pub fn code(&self) -> &str {
        if self.prescription_id.is_empty() {
            &self.id
        } else {
            &self.prescription_id
        }
    }
}

pub struct PrescriptionSource {
    client: Arc<ApiClient>,
    filter: RwLock<ListFilter>,
}

impl PrescriptionSource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            filter: RwLock::new(ListFilter::All),
        }
    }

    pub fn filter(&self) -> ListFilter {
        *self.filter.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_filter(&self, filter: ListFilter) {
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) = filter;
    }
}

#[async_trait]
impl SearchSource for PrescriptionSource {
    type Item = Prescription;

    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Page<Prescription>, ApiError> {
        api::prescriptions::list(&self.client, page, limit, self.filter()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Prescription>, ApiError> {
        api::prescriptions::search(&self.client, query).await
    }

    fn retain(&self, item: &Prescription) -> bool {
        match self.filter() {
            ListFilter::All => true,
            ListFilter::FollowUps => item.has_follow_up(),
        }
    }
}

/// Full prescription keyed by internal id.
pub struct PrescriptionDetail {
    client: Arc<ApiClient>,
}

#[async_trait]
impl DetailSource for PrescriptionDetail {
    type Key = String;
    type Detail = Prescription;

    async fn load(&self, id: &String) -> Result<Prescription, ApiError> {
        api::prescriptions::get(&self.client, id).await
    }
}

pub struct PrescriptionsView {
    client: Arc<ApiClient>,
    list: SearchController<PrescriptionSource>,
    detail: SelectionView<PrescriptionDetail>,
}

impl PrescriptionsView {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let notifier = client.notifier().clone();
        Self {
            list: SearchController::new(PrescriptionSource::new(client.clone()), notifier.clone()),
            detail: SelectionView::new(
                PrescriptionDetail {
                    client: client.clone(),
                },
                notifier,
            ),
            client,
        }
    }

    pub fn list(&self) -> &SearchController<PrescriptionSource> {
        &self.list
    }

    pub fn detail(&self) -> &SelectionView<PrescriptionDetail> {
        &self.detail
    }

    pub fn filter(&self) -> ListFilter {
        self.list.source().filter()
    }

    /// Switch the filter and start over on page 1. An active search is
    /// re-run inside the new filter.
    pub async fn set_filter(&self, filter: ListFilter) -> Result<(), ApiError> {
        if self.filter() == filter {
            return Ok(());
        }
        tracing::debug!(filter = %filter, "Prescription filter changed");
        self.list.source().set_filter(filter);
        self.list.reload_first_page().await
    }

    pub fn select(&self, prescription: &Prescription) {
        self.detail.select(prescription.id.clone());
    }

    /// Delete after confirmation. `Ok(false)` when the user declined.
    pub async fn delete(
        &self,
        prescription: &Prescription,
        confirm: &dyn Confirm,
    ) -> Result<bool, ApiError> {
        let code = prescription.code();
        if !confirm_delete(confirm, &format!("prescription \"{code}\"")) {
            tracing::debug!(prescription = %prescription.id, "Prescription delete cancelled");
            return Ok(false);
        }

        if let Err(e) = api::prescriptions::delete(&self.client, &prescription.id).await {
            tracing::warn!(prescription = %prescription.id, error = %e, "Prescription delete failed");
            self.client.notify(Notification::error(
                "Delete Failed",
                e.user_message("Error deleting prescription"),
            ));
            return Err(e);
        }

        self.list.remove_where(|p| p.id == prescription.id);
        if self.detail.selected().as_deref() == Some(prescription.id.as_str()) {
            self.detail.close();
        }
        self.detail.invalidate(&prescription.id);
        tracing::info!(prescription = %prescription.id, "Prescription deleted");
        self.client.notify(Notification::success(
            "Prescription Deleted",
            format!("Prescription \"{code}\" has been deleted successfully."),
        ));
        Ok(true)
    }

    pub fn teardown(&self) {
        self.list.teardown();
        self.detail.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::AutoConfirm;
    use crate::test_support::{prescription, status_json, TestBackend};
    use axum::extract::{Path, Query};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::collections::HashMap;

    fn with_follow_up(id: &str, name: &str) -> Prescription {
        let mut rx = prescription(id, name);
        rx.next_follow_up = Some(Utc::now() + Duration::days(3));
        rx
    }

    fn backend_router() -> Router {
        Router::new()
            .route(
                "/api/prescriptions",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    let rows = if q.get("filter").map(String::as_str) == Some("followups") {
                        vec![with_follow_up("2", "Bela Shah")]
                    } else {
                        vec![prescription("1", "Asha Rao"), with_follow_up("2", "Bela Shah")]
                    };
                    Json(json!({ "prescriptions": rows }))
                }),
            )
            .route(
                "/api/prescriptions/search/:query",
                get(|Path(query): Path<String>| async move {
                    // Matches both patients on the shared phone number.
                    assert_eq!(query, "98765");
                    Json(json!({
                        "prescriptions": [prescription("1", "Asha Rao"), with_follow_up("2", "Bela Shah")]
                    }))
                }),
            )
            .route(
                "/api/prescriptions/:id",
                get(|Path(id): Path<String>| async move {
                    Json(json!({ "prescription": prescription(&id, "Asha Rao") })).into_response()
                })
                .delete(|Path(id): Path<String>| async move {
                    if id == "1" {
                        Json(json!({ "message": "deleted" })).into_response()
                    } else {
                        status_json(500, "").into_response()
                    }
                }),
            )
    }

    #[test]
    fn search_fields_cover_symptoms_and_notes() {
        let mut rx = prescription("1", "Asha Rao");
        rx.notes = Some("review blood sugar".into());
        let fields = rx.search_fields();
        assert!(fields.contains(&"RX-1"));
        assert!(fields.contains(&"Asha Rao"));
        assert!(fields.contains(&"9876543210"));
        assert!(fields.contains(&"fever and dry cough"));
        assert!(fields.contains(&"review blood sugar"));
    }

    #[test]
    fn code_falls_back_to_internal_id() {
        let mut rx = prescription("1", "Asha Rao");
        assert_eq!(rx.code(), "RX-1");
        rx.prescription_id.clear();
        assert_eq!(rx.code(), "1");
    }

    #[tokio::test]
    async fn follow_up_filter_narrows_browse_and_search() {
        let backend = TestBackend::logged_in(backend_router()).await;
        let view = PrescriptionsView::new(backend.client.clone());
        view.list().load_initial().await.unwrap();
        assert_eq!(view.list().visible_items().len(), 2);

        view.set_filter(ListFilter::FollowUps).await.unwrap();
        assert_eq!(view.list().visible_items().len(), 1);

        view.list().set_query("98765");
        view.list().submit_query().await;
        let found = view.list().all_items();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "2");

        // Dropping the filter re-runs the search over everything.
        view.set_filter(ListFilter::All).await.unwrap();
        assert_eq!(view.list().all_items().len(), 2);
        assert!(view.list().is_search_mode());
    }

    #[tokio::test]
    async fn delete_uses_code_in_messages() {
        let backend = TestBackend::logged_in(backend_router()).await;
        let view = PrescriptionsView::new(backend.client.clone());
        view.list().load_initial().await.unwrap();

        let rx = view.list().visible_items()[0].clone();
        view.select(&rx);
        assert!(view.delete(&rx, &AutoConfirm(true)).await.unwrap());

        assert_eq!(view.list().visible_items().len(), 1);
        assert!(!view.detail().is_open());
        assert!(backend.notifier.contains(&Notification::success(
            "Prescription Deleted",
            "Prescription \"RX-1\" has been deleted successfully."
        )));
    }

    #[tokio::test]
    async fn failed_delete_falls_back_to_generic_message() {
        let backend = TestBackend::logged_in(backend_router()).await;
        let view = PrescriptionsView::new(backend.client.clone());
        view.list().load_initial().await.unwrap();

        let rx = view.list().visible_items()[1].clone();
        assert!(view.delete(&rx, &AutoConfirm(true)).await.is_err());
        assert!(backend.notifier.contains(&Notification::error(
            "Delete Failed",
            "Internal Server Error"
        )));
    }

    #[tokio::test]
    async fn detail_open_fetches_single_prescription() {
        let backend = TestBackend::logged_in(backend_router()).await;
        let view = PrescriptionsView::new(backend.client.clone());
        let rx = view.detail().open("7".to_string()).await.unwrap();
        assert_eq!(rx.id, "7");
        assert_eq!(view.detail().selected().as_deref(), Some("7"));
    }
}
