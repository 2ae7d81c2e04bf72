//! Authentication endpoints.

use serde::Deserialize;
use serde_json::json;

use super::client::{ApiClient, RequestOptions};
use super::error::{ApiError, SECONDARY_AUTH_PATH};
use crate::models::{Doctor, PasswordChange};
use crate::notify::Notification;
use crate::validation;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    doctor: Doctor,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    doctor: Doctor,
}

/// Result of a successful danger-zone re-authentication.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DangerZoneGrant {
    /// Short-lived token some backends issue for the follow-up admin call.
    #[serde(default, alias = "dangerZoneToken")]
    pub token: Option<String>,
}

/// Log in and start a session.
///
/// A rejected password is an ordinary `RequestFailed(401)`, never a
/// session expiry, though any stale stored session is dropped.
pub async fn login(client: &ApiClient, username: &str, password: &str) -> Result<Doctor, ApiError> {
    validation::validate_login(username, password)?;

    let response: LoginResponse = client
        .post_json_with(
            "/auth/login",
            &json!({ "username": username.trim(), "password": password }),
            RequestOptions::credential_check(),
        )
        .await?;

    client
        .core()
        .set_session(response.token, response.doctor.clone())?;
    tracing::info!(doctor = %response.doctor.name, "Logged in");
    client.notify(Notification::success(
        "Welcome back!",
        format!("Logged in as {}", response.doctor.name),
    ));
    Ok(response.doctor)
}

/// Refresh the stored doctor profile from `/auth/me`.
///
/// Failures keep the cached profile.
pub async fn fetch_profile(client: &ApiClient) -> Result<Doctor, ApiError> {
    let response: ProfileResponse = client.get_json("/auth/me").await?;
    client.core().update_doctor(response.doctor.clone())?;
    Ok(response.doctor)
}

/// Replace the initial password. The session ends on success so the doctor
/// logs in again with the new password.
pub async fn force_change_password(
    client: &ApiClient,
    change: &PasswordChange,
) -> Result<(), ApiError> {
    validation::validate_password_change(change)?;

    client
        .post_json::<_, serde_json::Value>(
            "/auth/force-change-password",
            &json!({
                "currentPassword": change.current_password,
                "newPassword": change.new_password,
            }),
        )
        .await?;

    client.core().logout()?;
    client.notify(Notification::success(
        "Password Changed",
        "Please log in again with your new password.",
    ));
    Ok(())
}

/// Re-authenticate before a destructive admin operation.
///
/// Silent: the caller reports a wrong password itself and a 401 here never
/// ends the session.
pub async fn danger_zone_auth(client: &ApiClient, password: &str) -> Result<DangerZoneGrant, ApiError> {
    if password.is_empty() {
        return Err(validation::ValidationErrors::single("password", "Password is required").into());
    }
    client
        .post_json_with(
            SECONDARY_AUTH_PATH,
            &json!({ "password": password }),
            RequestOptions::silent(),
        )
        .await
}

/// End the session locally.
pub fn logout(client: &ApiClient) -> Result<(), ApiError> {
    client.core().logout()?;
    Ok(())
}
