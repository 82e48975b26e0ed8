use serde::{Deserialize, Serialize};

use crate::mac::Mac;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Catalyst Center floor with the coordinates of the building it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: String,
    /// Full site path, ex: "Global/Paris/Building 1/Floor 2"
    pub hierarchy: String,
    pub building: Coordinates,
}

impl Floor {
    /// Last segment of the hierarchy, used as the Meraki floor plan name
    pub fn name(&self) -> &str {
        self.hierarchy.rsplit('/').next().unwrap_or(&self.hierarchy)
    }

    /// Filesystem-safe stem for the exported archive of this floor
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .hierarchy
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let stem = stem.trim_matches('_');
        if stem.is_empty() {
            format!("floor_{}", self.id)
        } else {
            stem.to_string()
        }
    }
}

/// Device placed on the source floor in the exported archive
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDevice {
    pub raw_mac: String,
    pub mac: Option<Mac>,
    pub name: Option<String>,
}

impl SourceDevice {
    pub fn new(raw_mac: impl Into<String>, name: Option<String>) -> Self {
        let raw_mac = raw_mac.into();
        let mac = raw_mac.parse().ok();
        Self { raw_mac, mac, name }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub product_types: Vec<String>,
    pub time_zone: Option<String>,
}

/// Device claimed in a Meraki network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDevice {
    pub serial: String,
    pub mac: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub floor_plan_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Body of a floor plan creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFloorPlan {
    pub name: String,
    /// Base64 encoded floor image
    pub image_contents: String,
    pub center: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlan {
    pub floor_plan_id: String,
    pub name: String,
    pub center: Coordinates,
    pub image_url: Option<String>,
}

/// Device update placing a device on a floor plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAssignment {
    pub floor_plan_id: String,
    pub lat: f64,
    pub lng: f64,
}

impl DeviceAssignment {
    pub fn onto(plan: &FloorPlan) -> Self {
        Self {
            floor_plan_id: plan.floor_plan_id.clone(),
            lat: plan.center.lat,
            lng: plan.center.lng,
        }
    }
}
