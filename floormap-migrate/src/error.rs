//! Error taxonomy for a migration run
//!
//! Every variant except `Device` is fatal for the run. Per-device failures
//! are collected in the report instead of being propagated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication to {service} failed: {reason}")]
    Auth { service: &'static str, reason: String },

    #[error("{service} request failed with status {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("map archive export failed: {0}")]
    Export(String),

    #[error("invalid map archive: {0}")]
    Archive(String),

    #[error("floor plan upload failed: {0}")]
    Upload(String),

    #[error("device {serial} update failed: {reason}")]
    Device { serial: String, reason: String },

    #[error("no {0} available to select")]
    NothingToSelect(&'static str),

    #[error("selection aborted: input closed")]
    Aborted,

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Process exit code reported by the binary for a fatal error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Auth { .. } => 2,
            MigrateError::Export(_) => 3,
            MigrateError::Upload(_) => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_non_zero() {
        let errors = [
            MigrateError::Auth { service: "Catalyst Center", reason: "401".into() },
            MigrateError::Export("timeout".into()),
            MigrateError::Upload("rejected".into()),
            MigrateError::Config("missing ORG_ID".into()),
            MigrateError::Aborted,
        ];
        let codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        assert_eq!(codes, vec![2, 3, 4, 1, 1]);
    }

    #[test]
    fn test_auth_message_names_service() {
        let err = MigrateError::Auth { service: "Meraki", reason: "invalid API key".into() };
        assert_eq!(err.to_string(), "authentication to Meraki failed: invalid API key");
    }
}
