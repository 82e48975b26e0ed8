//! Catalyst Center → Meraki floor map migration
//!
//! Exports a floor map archive from Catalyst Center, uploads its image as a
//! Meraki floor plan and places the devices found on both sides (matched by
//! MAC address) onto the new floor plan.

pub mod archive;
pub mod catalyst;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod mac;
pub mod matching;
pub mod meraki;
pub mod migrate;
pub mod models;
pub mod ports;
pub mod prompt;

pub use catalyst::CatalystClient;
pub use config::MigrateConfig;
pub use error::{MigrateError, Result};
pub use mac::Mac;
pub use meraki::MerakiClient;
pub use migrate::{MigrationReport, Migrator};
pub use ports::{FloorPlanTarget, FloorSource};
pub use prompt::Prompter;
