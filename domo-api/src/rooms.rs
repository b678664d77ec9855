//! Per-room state endpoint

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domo_core::{ApiClient, Result, routes};

use crate::devices::{DeviceKind, DeviceStatus};

/// Rooms known to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Room {
    LivingRoom,
    Bedroom,
    Kitchen,
}

impl Room {
    pub fn as_str(&self) -> &'static str {
        match self {
            Room::LivingRoom => "living-room",
            Room::Bedroom => "bedroom",
            Room::Kitchen => "kitchen",
        }
    }

    pub fn all() -> [Room; 3] {
        [Room::LivingRoom, Room::Bedroom, Room::Kitchen]
    }

    pub fn parse(s: &str) -> Option<Room> {
        Room::all().into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device as embedded in a room snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub status: DeviceStatus,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Aggregated state of one room.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub location: String,
    #[serde(default)]
    pub devices: Vec<RoomDevice>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    pub lights_on: u32,
    pub lights_total: u32,
    pub doors_open: u32,
    pub doors_total: u32,
}

pub struct RoomService {
    client: Arc<ApiClient>,
}

impl RoomService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn detail(&self, room: Room) -> Result<RoomDetail> {
        self.client
            .get(&routes::room_detail(room.as_str()), Default::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_room_names_roundtrip() {
        for room in Room::all() {
            assert_eq!(Room::parse(room.as_str()), Some(room));
        }
        assert!(Room::parse("garage").is_none());
    }

    #[test]
    fn test_room_serde_uses_kebab_case() {
        assert_eq!(
            serde_json::to_value(Room::LivingRoom).unwrap(),
            json!("living-room")
        );
    }

    #[test]
    fn test_room_detail_wire_format() {
        let detail: RoomDetail = serde_json::from_value(json!({
            "location": "kitchen",
            "devices": [],
            "temperature": 22.5,
            "lightsOn": 1,
            "lightsTotal": 3,
            "doorsOpen": 0,
            "doorsTotal": 1,
        }))
        .unwrap();

        assert_eq!(detail.location, "kitchen");
        assert_eq!(detail.temperature, Some(22.5));
        assert!(detail.humidity.is_none());
        assert_eq!(detail.lights_on, 1);
    }
}
