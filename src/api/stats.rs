//! Dashboard statistics endpoint.

use super::client::ApiClient;
use super::error::ApiError;
use crate::models::DashboardStats;

pub async fn dashboard(client: &ApiClient) -> Result<DashboardStats, ApiError> {
    client.get_json("/stats/dashboard").await
}
