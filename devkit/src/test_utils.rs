/*!
Test Harness pour le migrateur de floor maps

Facilite l'écriture de tests bout-en-bout avec:
- Fakes Catalyst Center et Meraki partagés avec le test
- Répertoire d'export temporaire
- Entrées opérateur scriptées et capture de la sortie console
*/

use crate::fakes::{FakeCatalystCenter, FakeMeraki};
use anyhow::Result;
use floormap_migrate::config::Secret;
use floormap_migrate::{MigrateConfig, MigrateError, MigrationReport, Migrator, Prompter};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

/// Résultat d'un run: rapport (ou erreur fatale) et tout ce qui a été affiché
pub struct RunOutcome {
    pub result: std::result::Result<MigrationReport, MigrateError>,
    pub output: String,
}

impl RunOutcome {
    pub fn report(&self) -> &MigrationReport {
        match &self.result {
            Ok(report) => report,
            Err(e) => panic!("migration failed: {e}\n--- output ---\n{}", self.output),
        }
    }

    pub fn error(&self) -> &MigrateError {
        match &self.result {
            Ok(_) => panic!("migration succeeded\n--- output ---\n{}", self.output),
            Err(e) => e,
        }
    }
}

/// Harness de test complet pour le migrateur
pub struct TestHarness {
    pub catalyst: FakeCatalystCenter,
    pub meraki: FakeMeraki,
    export_dir: TempDir,
}

impl TestHarness {
    pub fn new(catalyst: FakeCatalystCenter, meraki: FakeMeraki) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        Ok(Self {
            catalyst,
            meraki,
            export_dir: tempfile::tempdir()?,
        })
    }

    pub fn export_dir(&self) -> &Path {
        self.export_dir.path()
    }

    /// Config de run pointant vers le répertoire temporaire
    pub fn config(&self) -> MigrateConfig {
        let mut config = MigrateConfig::default();
        config.cat_center.base_url = "https://catalyst.test".to_string();
        config.cat_center.username = "devkit".to_string();
        config.cat_center.password = Secret::new("devkit-password");
        config.meraki.api_key = Secret::new("devkit-api-key");
        config.meraki.org_id = "devkit-org".to_string();
        config.export.dir = self.export_dir.path().to_path_buf();
        config
    }

    /// Lance une migration complète, `input` étant tapé par l'opérateur
    pub async fn run(&self, input: &str) -> RunOutcome {
        log::info!("🚀 Running migration with scripted input {:?}", input);

        let prompter = Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let mut migrator = Migrator::new(self.catalyst.clone(), self.meraki.clone(), prompter, self.config());
        let result = migrator.run().await;
        let output = String::from_utf8_lossy(&migrator.into_output()).into_owned();

        match &result {
            Ok(report) => log::info!(
                "✅ Migration done: {} assigned, {} failed, {} skipped",
                report.assigned.len(),
                report.failed.len(),
                report.skipped.len()
            ),
            Err(e) => log::info!("❌ Migration failed: {}", e),
        }
        RunOutcome { result, output }
    }
}
