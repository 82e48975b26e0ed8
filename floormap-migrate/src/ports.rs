//! Seams between the orchestrator and the two vendor APIs
//!
//! `CatalystClient` and `MerakiClient` implement these for real runs; the
//! devkit provides in-memory implementations for end-to-end tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{DeviceAssignment, Floor, FloorPlan, Network, NetworkDevice, NewFloorPlan};

/// Source side: where floors come from
#[async_trait]
pub trait FloorSource {
    /// Floors that can be migrated (with known building coordinates)
    async fn list_floors(&self) -> Result<Vec<Floor>>;

    /// Export the floor's map archive into `export_dir`, returning the
    /// path of the downloaded `.tar.gz`
    async fn export_floor(&self, floor: &Floor, export_dir: &Path) -> Result<PathBuf>;
}

/// Destination side: where floor plans are created and devices placed
#[async_trait]
pub trait FloorPlanTarget {
    async fn list_networks(&self) -> Result<Vec<Network>>;

    async fn create_floor_plan(&self, network_id: &str, plan: &NewFloorPlan) -> Result<FloorPlan>;

    /// Devices claimed in the network
    async fn list_devices(&self, network_id: &str) -> Result<Vec<NetworkDevice>>;

    async fn assign_device(&self, serial: &str, assignment: &DeviceAssignment) -> Result<()>;
}
