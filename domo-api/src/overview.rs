//! Whole-home snapshot endpoint

use std::sync::Arc;

use serde::Deserialize;

use domo_core::{ApiClient, Result, routes};

use crate::rooms::RoomDetail;

/// Headline counters shown on the overview screen.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStatus {
    pub lights_on: u32,
    pub devices_online: u32,
    pub devices_total: u32,
    pub doors_open: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub quick_status: QuickStatus,
    #[serde(default)]
    pub rooms: Vec<RoomDetail>,
}

pub struct OverviewService {
    client: Arc<ApiClient>,
}

impl OverviewService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn snapshot(&self) -> Result<Overview> {
        self.client.get(routes::OVERVIEW, Default::default()).await
    }
}
