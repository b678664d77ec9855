//! Role and permission endpoints
//!
//! Role listing is paginated and filterable; absent filters are skipped in
//! the query string entirely.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use domo_core::{ApiClient, Query, Result, routes};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub description: String,
    pub path: String,
    pub method: String,
    pub module: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub is_system_role: bool,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolePage {
    pub data: Vec<Role>,
    pub meta: PageMeta,
}

/// Listing filters; every field is optional and skipped when absent.
#[derive(Debug, Clone, Default)]
pub struct RoleQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub is_system_role: Option<bool>,
    pub page: Option<u32>,
}

impl RoleQuery {
    fn to_query(&self) -> Query {
        Query::new()
            .maybe("search", self.search.as_deref())
            .maybe("isActive", self.is_active)
            .maybe("isSystemRole", self.is_system_role)
            .maybe("page", self.page)
    }
}

/// Role creation/update payload; permissions are attached by id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBody {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_ids: Option<Vec<String>>,
}

pub struct RoleService {
    client: Arc<ApiClient>,
}

impl RoleService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &RoleQuery) -> Result<RolePage> {
        self.client.get(routes::ROLES, query.to_query()).await
    }

    pub async fn detail(&self, id: &str) -> Result<Role> {
        self.client.get(&routes::role(id), Default::default()).await
    }

    pub async fn create(&self, body: &RoleBody) -> Result<Role> {
        self.client
            .post(routes::ROLES, Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn update(&self, id: &str, body: &RoleBody) -> Result<Role> {
        self.client
            .patch(&routes::role(id), Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete::<Value>(&routes::role(id)).await?;
        Ok(())
    }

    pub async fn permissions(&self) -> Result<Vec<Permission>> {
        self.client
            .get(routes::PERMISSIONS, Default::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_filters_are_skipped() {
        let query = RoleQuery {
            search: Some("admin".to_string()),
            page: Some(3),
            ..Default::default()
        };

        assert_eq!(
            query.to_query().pairs(),
            &[
                ("search".to_string(), "admin".to_string()),
                ("page".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_filter_produces_empty_query() {
        assert!(RoleQuery::default().to_query().is_empty());
    }

    #[test]
    fn test_role_page_wire_format() {
        let page: RolePage = serde_json::from_value(json!({
            "data": [{
                "id": "r1",
                "name": "operator",
                "description": "Device operators",
                "isActive": true,
                "isSystemRole": false,
                "permissions": [{
                    "id": "p1",
                    "name": "devices.list",
                    "description": "List devices",
                    "path": "/devices",
                    "method": "GET",
                    "module": "devices",
                }],
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z",
            }],
            "meta": { "page": 1, "totalPages": 4 },
        }))
        .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].permissions[0].module, "devices");
        assert_eq!(page.meta.total_pages, 4);
    }

    #[test]
    fn test_role_body_skips_absent_fields() {
        let body = RoleBody {
            name: "viewer".to_string(),
            description: None,
            permission_ids: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "name": "viewer" })
        );
    }
}
