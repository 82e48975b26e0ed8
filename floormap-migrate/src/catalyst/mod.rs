//! Catalyst Center client
//!
//! Covers the part of the intent API the migration needs:
//! - Token authentication (basic auth → `X-Auth-Token`)
//! - Floor listing with building coordinates
//! - Map archive export job, task polling and archive download

mod wire;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CatCenterConfig, ExportConfig, Secret};
use crate::error::{MigrateError, Result};
use crate::http::{check_status, send_submission, send_with_retry, RetryPolicy, TRANSIENT_STATUSES};
use crate::models::{Coordinates, Floor};
use crate::ports::FloorSource;
use wire::{AuthToken, Envelope, ExportTask, Site, Task};

const SERVICE: &str = "Catalyst Center";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

pub struct CatalystClient {
    http: reqwest::Client,
    base_url: String,
    token: Secret,
    retry: RetryPolicy,
    export: ExportConfig,
}

impl CatalystClient {
    /// Build the HTTP client and obtain a token. Any failure here is an
    /// authentication error.
    pub async fn connect(config: &CatCenterConfig, export: &ExportConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.request_timeout())
            .build()?;
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            max_backoff: config.max_backoff(),
            retry_on: TRANSIENT_STATUSES,
        };

        let auth_url = format!("{}/dna/system/api/v1/auth/token", config.base_url);
        let request = http
            .post(&auth_url)
            .basic_auth(&config.username, Some(config.password.expose()))
            .header(CONTENT_TYPE, "application/json");

        let auth_error = |reason: String| MigrateError::Auth { service: SERVICE, reason };
        let response = send_with_retry(request, &retry)
            .await
            .map_err(|e| auth_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(auth_error(format!("server replied {status}")));
        }
        let token: AuthToken = response
            .json()
            .await
            .map_err(|e| auth_error(format!("unreadable token response: {e}")))?;

        info!("Successfully logged into Catalyst Center: {}", config.base_url);
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: Secret::new(token.token),
            retry,
            export: export.clone(),
        })
    }

    fn intent_url(&self, path: &str) -> String {
        format!("{}/dna/intent/api{}", self.base_url, path)
    }

    async fn get_response<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self
            .http
            .get(self.intent_url(path))
            .query(query)
            .header(AUTH_TOKEN_HEADER, self.token.expose());
        let response = check_status(send_with_retry(request, &self.retry).await?, SERVICE).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.response)
    }

    /// Floors whose building has latitude/longitude, sorted by hierarchy
    pub async fn list_floors(&self) -> Result<Vec<Floor>> {
        let sites: Vec<Site> = self.get_response("/v2/site", &[("type", "floor")]).await?;
        debug!("Catalyst Center returned {} floors", sites.len());

        let mut buildings: HashMap<String, Option<Coordinates>> = HashMap::new();
        let mut floors = Vec::new();

        for site in sites {
            let Some(building_id) = site.address_inherited_from() else {
                debug!("Skipping floor {} without location", site.id);
                continue;
            };
            let building = match buildings.get(&building_id) {
                Some(cached) => *cached,
                None => {
                    let coords = match self.building_coordinates(&building_id).await {
                        Ok(coords) => coords,
                        Err(e @ MigrateError::Auth { .. }) => return Err(e),
                        Err(e) => {
                            warn!("Building {} lookup failed, skipping its floors: {}", building_id, e);
                            None
                        }
                    };
                    buildings.insert(building_id.clone(), coords);
                    coords
                }
            };
            let Some(building) = building else {
                debug!("Skipping floor {}: building {} has no coordinates", site.id, building_id);
                continue;
            };

            let hierarchy = site
                .group_name_hierarchy
                .clone()
                .or_else(|| site.name.clone())
                .unwrap_or_else(|| site.id.clone());
            floors.push(Floor { id: site.id, hierarchy, building });
        }

        floors.sort_by(|a, b| a.hierarchy.cmp(&b.hierarchy));
        Ok(floors)
    }

    async fn building_coordinates(&self, building_id: &str) -> Result<Option<Coordinates>> {
        let sites: Vec<Site> = self.get_response("/v2/site", &[("id", building_id)]).await?;
        Ok(sites
            .first()
            .and_then(Site::lat_lng)
            .map(|(lat, lng)| Coordinates { lat, lng }))
    }

    /// Start the export job for a floor, returning its task id
    pub async fn export_map_archive(&self, floor_id: &str) -> Result<String> {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(10).collect();
        let request = self
            .http
            .post(self.intent_url(&format!("/v1/maps/export/{floor_id}")))
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .header(AUTH_TOKEN_HEADER, self.token.expose())
            .body(format!("ExportMapArchiveRequest-{suffix}"));

        let response = send_submission(request, &self.retry).await.map_err(export_failure)?;
        let response = check_status(response, SERVICE).await.map_err(export_failure)?;
        let envelope: Envelope<ExportTask> = response
            .json()
            .await
            .map_err(|e| MigrateError::Export(format!("unreadable export response: {e}")))?;
        info!("Map archive export started (task {})", envelope.response.task_id);
        Ok(envelope.response.task_id)
    }

    /// Poll a task until it finishes, returning its result data (the
    /// archive file path for exports)
    pub async fn wait_for_task(&self, task_id: &str) -> Result<String> {
        let deadline = Instant::now() + self.export.timeout();
        loop {
            let task: Task = self
                .get_response(&format!("/v1/task/{task_id}"), &[])
                .await
                .map_err(export_failure)?;

            if task.is_error {
                let reason = task.failure_reason.unwrap_or_else(|| "unknown reason".to_string());
                return Err(MigrateError::Export(format!("task {task_id} failed: {reason}")));
            }
            if task.progress == "finished" {
                return match task.data {
                    Some(data) if !data.is_empty() => {
                        info!("Successfully completed task ({task_id}): {data}");
                        Ok(data)
                    }
                    _ => Err(MigrateError::Export(format!("task {task_id} finished without a file"))),
                };
            }
            if Instant::now() >= deadline {
                return Err(MigrateError::Export(format!(
                    "task {task_id} still running after {:?}",
                    self.export.timeout()
                )));
            }

            debug!("Task {task_id} progress: {}", task.progress);
            tokio::time::sleep(self.export.poll_interval()).await;
        }
    }

    /// Stream a Catalyst Center file to `dest`
    pub async fn download_archive(&self, file_path: &str, dest: &Path) -> Result<u64> {
        let request = self
            .http
            .get(self.intent_url(&format!("/v1{file_path}")))
            .header(AUTH_TOKEN_HEADER, self.token.expose());
        let response = send_with_retry(request, &self.retry).await?;
        let mut response = check_status(response, SERVICE).await.map_err(export_failure)?;

        if let Some(name) = response.headers().get("fileName").and_then(|v| v.to_str().ok()) {
            debug!("Catalyst Center file name: {name}");
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        let copied = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), MigrateError>(())
        }
        .await;
        drop(file);

        if let Err(e) = copied {
            warn!("Download of {} failed, removing partial file", dest.display());
            let _ = tokio::fs::remove_file(dest).await;
            return Err(export_failure(e));
        }

        info!("File downloaded successfully: {} ({} bytes)", dest.display(), written);
        Ok(written)
    }
}

/// Non-auth failures during export become `Export` errors
fn export_failure(err: MigrateError) -> MigrateError {
    match err {
        MigrateError::Auth { .. } | MigrateError::Export(_) => err,
        other => MigrateError::Export(other.to_string()),
    }
}

#[async_trait]
impl FloorSource for CatalystClient {
    async fn list_floors(&self) -> Result<Vec<Floor>> {
        CatalystClient::list_floors(self).await
    }

    async fn export_floor(&self, floor: &Floor, export_dir: &Path) -> Result<PathBuf> {
        let task_id = self.export_map_archive(&floor.id).await?;
        let file_path = self.wait_for_task(&task_id).await?;
        let dest = export_dir.join(format!("{}.tar.gz", floor.file_stem()));
        self.download_archive(&file_path, &dest).await?;
        Ok(dest)
    }
}
