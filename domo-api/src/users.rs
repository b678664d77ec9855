//! User management endpoints

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use domo_core::{ApiClient, Result, routes};

use crate::auth::Gender;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// The listing endpoint wraps its result in an object.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<String>>,
}

/// Partial user update; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<String>>,
}

pub struct UserService {
    client: Arc<ApiClient>,
}

impl UserService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let response: UsersResponse = self.client.get(routes::USERS, Default::default()).await?;
        Ok(response.users)
    }

    pub async fn detail(&self, id: &str) -> Result<User> {
        self.client.get(&routes::user(id), Default::default()).await
    }

    pub async fn create(&self, body: &CreateUser) -> Result<User> {
        self.client
            .post(routes::USERS, Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn update(&self, id: &str, body: &UpdateUser) -> Result<User> {
        self.client
            .patch(&routes::user(id), Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete::<Value>(&routes::user(id)).await?;
        Ok(())
    }
}
