//! Session and profile endpoints
//!
//! `login`/`logout` are the only places the credential store is written
//! from outside the dispatcher: login stores the issued pair, logout
//! clears it whether or not the server call succeeded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use domo_core::{ApiClient, Result, TokenPair, routes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Role summary as embedded in the profile payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRole {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub is_system_role: bool,
    pub description: String,
}

/// The signed-in user, as returned by the `me` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub gender: Gender,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub current_address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub roles: Vec<ProfileRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Sign in and store the issued credential pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let pair: TokenPair = self
            .client
            .post(
                routes::auth::LOGIN,
                Some(json!({ "username": username, "password": password })),
            )
            .await?;

        self.client.credentials().set_credentials(pair.clone());
        tracing::info!("signed in as {username}");
        Ok(pair)
    }

    /// Revoke the refresh token server-side and drop local credentials.
    ///
    /// Credentials are cleared even when the revocation call fails; a dead
    /// session on the server is preferable to a live one on disk.
    pub async fn logout(&self) -> Result<()> {
        let store = self.client.credentials();

        let outcome = match store.refresh_token() {
            Some(refresh_token) => self
                .client
                .post::<serde_json::Value>(
                    routes::auth::LOGOUT,
                    Some(json!({ "refreshToken": refresh_token })),
                )
                .await
                .map(drop),
            None => Ok(()),
        };

        store.clear();
        outcome
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.client.get(routes::auth::ME, Default::default()).await
    }

    pub async fn update_profile(&self, update: &UpdateProfile) -> Result<MessageResponse> {
        self.client
            .patch(routes::auth::PROFILE, Some(serde_json::to_value(update)?))
            .await
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse> {
        self.client
            .patch(
                routes::auth::CHANGE_PASSWORD,
                Some(json!({
                    "oldPassword": old_password,
                    "newPassword": new_password,
                })),
            )
            .await
    }
}
