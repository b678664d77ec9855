//! Device listing and control endpoints
//!
//! Control posts go to the hub's MQTT bridge routes; the hub forwards the
//! desired state to the device and answers once it is acknowledged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use domo_core::{ApiClient, Query, Result, routes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Sensor,
    Actuator,
    Controller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub status: DeviceStatus,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }
}

pub struct DeviceService {
    client: Arc<ApiClient>,
}

impl DeviceService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// List devices, optionally restricted to one room location.
    pub async fn list(&self, location: Option<&str>) -> Result<Vec<Device>> {
        let query = Query::new().maybe("location", location);
        self.client.get(routes::DEVICES, query).await
    }

    /// Switch a light-capable device on or off.
    pub async fn set_light(&self, device_id: &str, on: bool) -> Result<()> {
        self.client
            .post::<Value>(&routes::device_light(device_id), Some(json!({ "state": on })))
            .await?;
        Ok(())
    }

    /// Open or close a door-capable device.
    pub async fn set_door(&self, device_id: &str, open: bool) -> Result<()> {
        self.client
            .post::<Value>(&routes::device_door(device_id), Some(json!({ "state": open })))
            .await?;
        Ok(())
    }
}
