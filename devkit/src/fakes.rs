/*!
Fakes en mémoire de Catalyst Center et du Dashboard Meraki

Implémentent `FloorSource` et `FloorPlanTarget` sans réseau:
- Catalyst Center: étages configurés + archive tar.gz servie par étage
- Meraki: réseaux, devices réclamés, floor plans créés et updates enregistrés

Les fakes sont `Clone` (état partagé via `Arc<Mutex<_>>`), le test garde une
copie pour inspecter ce que le migrateur a fait.
*/

use async_trait::async_trait;
use floormap_migrate::models::{
    Coordinates, DeviceAssignment, Floor, FloorPlan, Network, NetworkDevice, NewFloorPlan,
};
use floormap_migrate::{FloorPlanTarget, FloorSource, MigrateError, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CatalystState {
    floors: Vec<Floor>,
    archives: HashMap<String, Vec<u8>>,
    exported: Vec<String>,
    export_failure: Option<String>,
}

/// Fake Catalyst Center
#[derive(Clone, Default)]
pub struct FakeCatalystCenter {
    state: Arc<Mutex<CatalystState>>,
}

impl FakeCatalystCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un étage et l'archive (tar.gz) que son export produira
    pub fn with_floor(self, id: &str, hierarchy: &str, building: Coordinates, archive: Vec<u8>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.floors.push(Floor {
                id: id.to_string(),
                hierarchy: hierarchy.to_string(),
                building,
            });
            state.archives.insert(id.to_string(), archive);
        }
        self
    }

    /// Tous les exports suivants échouent comme une tâche en erreur
    pub fn fail_exports(&self, reason: &str) {
        self.state.lock().unwrap().export_failure = Some(reason.to_string());
    }

    /// Ids des étages exportés, dans l'ordre
    pub fn exported(&self) -> Vec<String> {
        self.state.lock().unwrap().exported.clone()
    }
}

#[async_trait]
impl FloorSource for FakeCatalystCenter {
    async fn list_floors(&self) -> Result<Vec<Floor>> {
        Ok(self.state.lock().unwrap().floors.clone())
    }

    async fn export_floor(&self, floor: &Floor, export_dir: &Path) -> Result<PathBuf> {
        let archive = {
            let mut state = self.state.lock().unwrap();
            if let Some(reason) = &state.export_failure {
                return Err(MigrateError::Export(reason.clone()));
            }
            state.exported.push(floor.id.clone());
            state.archives.get(&floor.id).cloned()
        };
        let archive = archive.ok_or_else(|| MigrateError::Export(format!("no archive for floor {}", floor.id)))?;

        let path = export_dir.join(format!("{}.tar.gz", floor.file_stem()));
        tokio::fs::write(&path, archive).await?;
        log::info!("📦 [FAKE] Exported {} to {}", floor.hierarchy, path.display());
        Ok(path)
    }
}

/// Floor plan créé par le migrateur
#[derive(Debug, Clone)]
pub struct CreatedFloorPlan {
    pub network_id: String,
    pub request: NewFloorPlan,
    pub plan: FloorPlan,
}

/// `PUT /devices/{serial}` reçu par le fake
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceUpdate {
    pub serial: String,
    pub assignment: DeviceAssignment,
}

#[derive(Default)]
struct MerakiState {
    networks: Vec<Network>,
    devices: HashMap<String, Vec<NetworkDevice>>,
    floor_plans: Vec<CreatedFloorPlan>,
    updates: Vec<DeviceUpdate>,
    rejected_serials: HashSet<String>,
    upload_failure: Option<String>,
    key_revoked: bool,
}

/// Fake Meraki Dashboard
#[derive(Clone, Default)]
pub struct FakeMeraki {
    state: Arc<Mutex<MerakiState>>,
}

impl FakeMeraki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().networks.push(Network {
            id: id.to_string(),
            name: name.to_string(),
            product_types: vec!["wireless".to_string()],
            time_zone: Some("Europe/Paris".to_string()),
        });
        self
    }

    /// Réclame un device dans le réseau `network_id`
    pub fn with_device(self, network_id: &str, serial: &str, mac: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .devices
            .entry(network_id.to_string())
            .or_default()
            .push(NetworkDevice {
                serial: serial.to_string(),
                mac: Some(mac.to_string()),
                name: None,
                model: Some("MR46".to_string()),
                floor_plan_id: None,
                lat: None,
                lng: None,
            });
        self
    }

    /// Les updates de ce device sont refusés (404 côté Dashboard)
    pub fn reject_device(&self, serial: &str) {
        self.state.lock().unwrap().rejected_serials.insert(serial.to_string());
    }

    /// Les updates de devices suivants répondent 401
    pub fn revoke_key(&self) {
        self.state.lock().unwrap().key_revoked = true;
    }

    pub fn reject_uploads(&self, reason: &str) {
        self.state.lock().unwrap().upload_failure = Some(reason.to_string());
    }

    pub fn floor_plans(&self) -> Vec<CreatedFloorPlan> {
        self.state.lock().unwrap().floor_plans.clone()
    }

    pub fn updates(&self) -> Vec<DeviceUpdate> {
        self.state.lock().unwrap().updates.clone()
    }

    /// Etat courant d'un device, quel que soit son réseau
    pub fn device(&self, serial: &str) -> Option<NetworkDevice> {
        self.state
            .lock()
            .unwrap()
            .devices
            .values()
            .flatten()
            .find(|d| d.serial == serial)
            .cloned()
    }
}

#[async_trait]
impl FloorPlanTarget for FakeMeraki {
    async fn list_networks(&self) -> Result<Vec<Network>> {
        Ok(self.state.lock().unwrap().networks.clone())
    }

    async fn create_floor_plan(&self, network_id: &str, plan: &NewFloorPlan) -> Result<FloorPlan> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.upload_failure {
            return Err(MigrateError::Upload(reason.clone()));
        }
        let created = FloorPlan {
            floor_plan_id: format!("g_{}", state.floor_plans.len() + 1),
            name: plan.name.clone(),
            center: plan.center,
            image_url: None,
        };
        state.floor_plans.push(CreatedFloorPlan {
            network_id: network_id.to_string(),
            request: plan.clone(),
            plan: created.clone(),
        });
        log::info!("🗺️ [FAKE] Created floor plan {} in {}", created.floor_plan_id, network_id);
        Ok(created)
    }

    async fn list_devices(&self, network_id: &str) -> Result<Vec<NetworkDevice>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .devices
            .get(network_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn assign_device(&self, serial: &str, assignment: &DeviceAssignment) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let device_error = |reason: &str| MigrateError::Device {
            serial: serial.to_string(),
            reason: reason.to_string(),
        };
        if state.key_revoked {
            return Err(MigrateError::Auth {
                service: "Meraki",
                reason: "server replied 401 Unauthorized".to_string(),
            });
        }
        if state.rejected_serials.contains(serial) {
            return Err(device_error("Meraki request failed with status 404: Not found"));
        }

        let device = state
            .devices
            .values_mut()
            .flatten()
            .find(|d| d.serial == serial)
            .ok_or_else(|| device_error("unknown serial"))?;
        device.floor_plan_id = Some(assignment.floor_plan_id.clone());
        device.lat = Some(assignment.lat);
        device.lng = Some(assignment.lng);

        state.updates.push(DeviceUpdate {
            serial: serial.to_string(),
            assignment: assignment.clone(),
        });
        log::info!("📍 [FAKE] {} → floor plan {}", serial, assignment.floor_plan_id);
        Ok(())
    }
}
