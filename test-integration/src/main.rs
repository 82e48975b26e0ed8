//! Read-only smoke check against real appliances
//!
//! Uses the same environment as the migrator (`.env` supported) and only
//! issues GET requests plus the Catalyst Center token request: nothing is
//! exported, uploaded or reassigned.

use anyhow::{Context, Result};
use floormap_migrate::{CatalystClient, MerakiClient, MigrateConfig};
use log::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    info!("🚀 Starting floor map migration smoke check");

    let config = MigrateConfig::load().await.context("Failed to load configuration")?;

    let catalyst = CatalystClient::connect(&config.cat_center, &config.export)
        .await
        .context("Catalyst Center authentication failed")?;
    let floors = catalyst.list_floors().await.context("Failed to list floors")?;
    info!("🏢 {} floors with building coordinates", floors.len());
    for floor in floors.iter().take(10) {
        info!("   {} ({}, {})", floor.hierarchy, floor.building.lat, floor.building.lng);
    }
    if floors.is_empty() {
        warn!("⚠️ No floor can be migrated: buildings need latitude/longitude");
    }

    let meraki = MerakiClient::new(&config.meraki).context("Failed to build Meraki client")?;
    let networks = meraki.list_networks().await.context("Failed to list Meraki networks")?;
    info!("🌐 {} networks in organization {}", networks.len(), config.meraki.org_id);

    match networks.first() {
        Some(network) => {
            let devices = meraki
                .list_devices(&network.id)
                .await
                .with_context(|| format!("Failed to list devices of {}", network.name))?;
            let with_mac = devices.iter().filter(|d| d.mac.is_some()).count();
            info!("📡 {}: {} devices, {} with a MAC address", network.name, devices.len(), with_mac);
        }
        None => warn!("⚠️ Organization has no networks"),
    }

    info!("✅ Smoke check passed");
    Ok(())
}
