//! Migration run orchestration
//!
//! select floor → export archive → select network → upload floor plan →
//! match devices by MAC → assign matched devices → report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::archive;
use crate::config::{MigrateConfig, APP_NAME};
use crate::error::{MigrateError, Result};
use crate::mac::Mac;
use crate::matching::{plan_assignments, Assignment, Skipped, Untouched};
use crate::models::{DeviceAssignment, Floor, FloorPlan, Network, NewFloorPlan};
use crate::ports::{FloorPlanTarget, FloorSource};
use crate::prompt::Prompter;

#[derive(Debug, Clone, Serialize)]
pub struct FailedAssignment {
    pub mac: Mac,
    pub serial: String,
    pub error: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub floor: Floor,
    pub network: Network,
    pub floor_plan: FloorPlan,
    pub archive: PathBuf,
    pub assigned: Vec<Assignment>,
    pub failed: Vec<FailedAssignment>,
    pub skipped: Vec<Skipped>,
    /// Meraki devices not on the source floor
    pub untouched: Vec<Untouched>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MigrationReport {
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "📊 MIGRATION REPORT")?;
        writeln!(out, "────────────────────────────────────────")?;
        writeln!(out, "Source floor: {}", self.floor.hierarchy)?;
        writeln!(out, "Network: {} ({})", self.network.name, self.network.id)?;
        writeln!(
            out,
            "Floor plan: {} ({}) at {}, {}",
            self.floor_plan.name, self.floor_plan.floor_plan_id, self.floor_plan.center.lat, self.floor_plan.center.lng
        )?;
        writeln!(out, "Archive: {}", self.archive.display())?;
        writeln!(out)?;

        writeln!(out, "✅ Assigned ({}):", self.assigned.len())?;
        for a in &self.assigned {
            writeln!(out, "   {} → {} on {}", a.mac, a.serial, self.floor_plan.floor_plan_id)?;
        }
        if !self.failed.is_empty() {
            writeln!(out, "❌ Failed ({}):", self.failed.len())?;
            for f in &self.failed {
                writeln!(out, "   {} ({}): {}", f.mac, f.serial, f.error)?;
            }
        }
        writeln!(out, "⚠️  Skipped ({}):", self.skipped.len())?;
        for s in &self.skipped {
            let mac = if s.raw_mac.is_empty() { "(no MAC)" } else { s.raw_mac.as_str() };
            match &s.name {
                Some(name) => writeln!(out, "   {} [{}]: {}", mac, name, s.reason)?,
                None => writeln!(out, "   {}: {}", mac, s.reason)?,
            }
        }
        writeln!(out, "➖ Not on source floor, left untouched ({}):", self.untouched.len())?;
        for u in &self.untouched {
            let mac = u.mac.as_deref().unwrap_or("(no MAC)");
            match &u.name {
                Some(name) => writeln!(out, "   {} ({}) [{}]", mac, u.serial, name)?,
                None => writeln!(out, "   {} ({})", mac, u.serial)?,
            }
        }

        let elapsed = self.finished_at - self.started_at;
        writeln!(out, "Completed in {}s", elapsed.num_seconds())?;
        Ok(())
    }
}

pub struct Migrator<S, T, R, W> {
    source: S,
    target: T,
    prompter: Prompter<R, W>,
    config: MigrateConfig,
}

impl<S, T, R, W> Migrator<S, T, R, W>
where
    S: FloorSource,
    T: FloorPlanTarget,
    R: BufRead,
    W: Write,
{
    pub fn new(source: S, target: T, prompter: Prompter<R, W>, config: MigrateConfig) -> Self {
        Self {
            source,
            target,
            prompter,
            config,
        }
    }

    pub fn into_output(self) -> W {
        self.prompter.into_output()
    }

    fn step(&mut self, n: u8, title: &str) -> Result<()> {
        let out = self.prompter.output();
        writeln!(out)?;
        writeln!(out, "🔹 Step {n} — {title}")?;
        writeln!(out, "────────────────────────────────────────")?;
        info!("Step {}: {}", n, title);
        Ok(())
    }

    pub async fn run(&mut self) -> Result<MigrationReport> {
        let started_at = Utc::now();
        {
            let out = self.prompter.output();
            writeln!(out)?;
            writeln!(out, "🗺️  ======================================")?;
            writeln!(out, "   {}", APP_NAME.to_uppercase())?;
            writeln!(out, "🗺️  ======================================")?;
            writeln!(out)?;
            self.config.write_summary(out)?;
        }

        self.step(1, "Select source floor (Catalyst Center)")?;
        let floors = self.source.list_floors().await?;
        info!("Found {} floors", floors.len());
        let floor = self.prompter.select("floors", &floors)?.clone();

        self.step(2, "Export floor map archive")?;
        tokio::fs::create_dir_all(&self.config.export.dir).await?;
        let archive_path = self.source.export_floor(&floor, &self.config.export.dir).await?;
        let extracted = archive::extract(&archive_path)?;
        let map = archive::load(&extracted)?;
        info!(
            "Archive for {}: image {}, {} devices",
            floor.hierarchy,
            map.image_name,
            map.devices.len()
        );
        writeln!(
            self.prompter.output(),
            "📦 Exported {} ({} devices on floor)",
            archive_path.display(),
            map.devices.len()
        )?;

        self.step(3, "Select destination network (Meraki)")?;
        let networks = self.target.list_networks().await?;
        info!("Found {} networks", networks.len());
        let network = self.prompter.select("networks", &networks)?.clone();

        self.step(4, "Upload floor plan")?;
        let request = NewFloorPlan {
            name: floor.name().to_string(),
            image_contents: map.image_base64,
            center: map.civic_location.unwrap_or(floor.building),
        };
        let floor_plan = self.target.create_floor_plan(&network.id, &request).await?;
        info!(
            "Floor plan '{}' created with id {}",
            floor_plan.name, floor_plan.floor_plan_id
        );
        writeln!(
            self.prompter.output(),
            "✅ Floor plan '{}' created ({})",
            floor_plan.name,
            floor_plan.floor_plan_id
        )?;

        self.step(5, "Associate devices")?;
        let claimed = self.target.list_devices(&network.id).await?;
        let plan = plan_assignments(&map.devices, &claimed);
        for s in &plan.skipped {
            warn!("Skipping {}: {}", s.raw_mac, s.reason);
        }

        let update = DeviceAssignment::onto(&floor_plan);
        let mut assigned = Vec::new();
        let mut failed = Vec::new();
        for assignment in plan.assignments {
            match self.target.assign_device(&assignment.serial, &update).await {
                Ok(()) => {
                    info!(
                        "Device {} ({}) assigned to floor plan {}",
                        assignment.serial, assignment.mac, floor_plan.floor_plan_id
                    );
                    assigned.push(assignment);
                }
                Err(e @ MigrateError::Auth { .. }) => return Err(e),
                Err(e) => {
                    error!("Failed to assign {} ({}): {}", assignment.serial, assignment.mac, e);
                    failed.push(FailedAssignment {
                        mac: assignment.mac,
                        serial: assignment.serial,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = MigrationReport {
            floor,
            network,
            floor_plan,
            archive: archive_path,
            assigned,
            failed,
            skipped: plan.skipped,
            untouched: plan.untouched,
            started_at,
            finished_at: Utc::now(),
        };
        let out = self.prompter.output();
        writeln!(out)?;
        report.write_to(out)?;
        Ok(report)
    }
}
