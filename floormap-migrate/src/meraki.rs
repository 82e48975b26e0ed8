//! Meraki Dashboard client
//!
//! Organization networks, floor plan creation, network device listing and
//! device updates. Rate limiting (429) is retried with `Retry-After`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MerakiConfig;
use crate::error::{MigrateError, Result};
use crate::http::{check_status, send_submission, send_with_retry, RetryPolicy, RATE_LIMIT_STATUSES};
use crate::models::{Coordinates, DeviceAssignment, FloorPlan, Network, NetworkDevice, NewFloorPlan};
use crate::ports::FloorPlanTarget;

const SERVICE: &str = "Meraki";
const NETWORKS_PER_PAGE: &str = "1000";

pub struct MerakiClient {
    http: reqwest::Client,
    base_url: String,
    org_id: String,
    retry: RetryPolicy,
}

/// Floor plan as returned on creation; some fields are omitted by older
/// dashboard versions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedFloorPlan {
    floor_plan_id: String,
    name: Option<String>,
    center: Option<Coordinates>,
    image_url: Option<String>,
}

impl MerakiClient {
    pub fn new(config: &MerakiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose()))
            .map_err(|_| MigrateError::Config("MERAKI_API_KEY contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let caller = HeaderValue::from_str(&config.caller)
            .map_err(|_| MigrateError::Config(format!("invalid caller string: {}", config.caller)))?;
        headers.insert(USER_AGENT, caller);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            org_id: config.org_id.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                max_backoff: Duration::from_secs(60),
                retry_on: RATE_LIMIT_STATUSES,
            },
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// All networks of the organization, following `Link: rel=next` pages.
    /// An unauthorized answer here is the authentication failure of the run.
    pub async fn list_networks(&self) -> Result<Vec<Network>> {
        let first = self
            .http
            .get(self.url(&format!("/organizations/{}/networks", self.org_id)))
            .query(&[("perPage", NETWORKS_PER_PAGE)]);

        let mut networks: Vec<Network> = Vec::new();
        let mut request = Some(first);
        while let Some(current) = request.take() {
            let response = check_status(send_with_retry(current, &self.retry).await?, SERVICE).await?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);
            let page: Vec<Network> = response.json().await?;
            debug!("Fetched {} networks (more pages: {})", page.len(), next.is_some());
            networks.extend(page);
            request = next.map(|url| self.http.get(url));
        }

        networks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(networks)
    }

    pub async fn create_floor_plan(&self, network_id: &str, plan: &NewFloorPlan) -> Result<FloorPlan> {
        let request = self
            .http
            .post(self.url(&format!("/networks/{network_id}/floorPlans")))
            .json(plan);
        let response = send_submission(request, &self.retry)
            .await
            .map_err(|e| MigrateError::Upload(e.to_string()))?;
        let response = check_status(response, SERVICE).await.map_err(|e| match e {
            MigrateError::Auth { .. } => e,
            other => MigrateError::Upload(other.to_string()),
        })?;
        let created: CreatedFloorPlan = response
            .json()
            .await
            .map_err(|e| MigrateError::Upload(format!("unreadable floor plan response: {e}")))?;

        info!("Created floor plan {} on network {}", created.floor_plan_id, network_id);
        Ok(FloorPlan {
            floor_plan_id: created.floor_plan_id,
            name: created.name.unwrap_or_else(|| plan.name.clone()),
            center: created.center.unwrap_or(plan.center),
            image_url: created.image_url,
        })
    }

    pub async fn list_devices(&self, network_id: &str) -> Result<Vec<NetworkDevice>> {
        let request = self.http.get(self.url(&format!("/networks/{network_id}/devices")));
        let response = check_status(send_with_retry(request, &self.retry).await?, SERVICE).await?;
        Ok(response.json().await?)
    }

    pub async fn assign_device(&self, serial: &str, assignment: &DeviceAssignment) -> Result<()> {
        let device_error = |reason: String| MigrateError::Device {
            serial: serial.to_string(),
            reason,
        };
        let request = self
            .http
            .put(self.url(&format!("/devices/{serial}")))
            .json(assignment);
        let response = send_with_retry(request, &self.retry)
            .await
            .map_err(|e| device_error(e.to_string()))?;
        check_status(response, SERVICE).await.map_err(|e| match e {
            MigrateError::Auth { .. } => e,
            other => device_error(other.to_string()),
        })?;
        Ok(())
    }
}

/// Extract the `rel=next` target of an RFC 8288 `Link` header
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=next" || p == "rel=\"next\""
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[async_trait]
impl FloorPlanTarget for MerakiClient {
    async fn list_networks(&self) -> Result<Vec<Network>> {
        MerakiClient::list_networks(self).await
    }

    async fn create_floor_plan(&self, network_id: &str, plan: &NewFloorPlan) -> Result<FloorPlan> {
        MerakiClient::create_floor_plan(self, network_id, plan).await
    }

    async fn list_devices(&self, network_id: &str) -> Result<Vec<NetworkDevice>> {
        MerakiClient::list_devices(self, network_id).await
    }

    async fn assign_device(&self, serial: &str, assignment: &DeviceAssignment) -> Result<()> {
        MerakiClient::assign_device(self, serial, assignment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use mockito::{Matcher, Server, ServerGuard};

    fn client(server: &ServerGuard) -> MerakiClient {
        let config = MerakiConfig {
            base_url: server.url(),
            api_key: Secret::new("key-123"),
            org_id: "549236".into(),
            max_retries: 2,
            ..MerakiConfig::default()
        };
        MerakiClient::new(&config).unwrap()
    }

    #[test]
    fn test_next_link() {
        let header = "<https://api.meraki.com/api/v1/organizations/1/networks?perPage=2>; rel=first, \
                      <https://api.meraki.com/api/v1/organizations/1/networks?perPage=2&startingAfter=N_2>; rel=next";
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://api.meraki.com/api/v1/organizations/1/networks?perPage=2&startingAfter=N_2")
        );
        assert_eq!(next_link("<https://x/first>; rel=first"), None);
        assert_eq!(next_link("<https://x/n>; rel=\"next\"").as_deref(), Some("https://x/n"));
    }

    #[tokio::test]
    async fn test_list_networks_follows_pages() {
        let mut server = Server::new_async().await;
        let next_url = format!("{}/organizations/549236/networks?perPage=1000&startingAfter=N_2", server.url());

        let page1 = server
            .mock("GET", "/organizations/549236/networks")
            .match_query(Matcher::Exact("perPage=1000".into()))
            .match_header("authorization", "Bearer key-123")
            .with_status(200)
            .with_header("link", &format!("<{next_url}>; rel=next"))
            .with_body(r#"[{"id": "N_2", "name": "Paris HQ", "productTypes": ["wireless"]}]"#)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/organizations/549236/networks")
            .match_query(Matcher::Exact("perPage=1000&startingAfter=N_2".into()))
            .with_status(200)
            .with_body(r#"[{"id": "N_1", "name": "Lyon Branch", "timeZone": "Europe/Paris"}]"#)
            .create_async()
            .await;

        let networks = client(&server).list_networks().await.unwrap();

        let names: Vec<&str> = networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Lyon Branch", "Paris HQ"]);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_api_key_is_auth_error() {
        let mut server = Server::new_async().await;
        let _networks = server
            .mock("GET", "/organizations/549236/networks")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"errors": ["Invalid API key"]}"#)
            .create_async()
            .await;

        let err = client(&server).list_networks().await.unwrap_err();
        assert!(matches!(err, MigrateError::Auth { service: "Meraki", .. }));
    }

    #[tokio::test]
    async fn test_create_floor_plan() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/networks/N_1/floorPlans")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "Floor 1",
                "imageContents": "aW1n",
                "center": {"lat": 48.85, "lng": 2.35}
            })))
            .with_status(201)
            .with_body(
                r#"{"floorPlanId": "g_100", "name": "Floor 1", "imageUrl": "https://img/x.jpg",
                    "center": {"lat": 48.8501, "lng": 2.3502}}"#,
            )
            .create_async()
            .await;

        let plan = NewFloorPlan {
            name: "Floor 1".into(),
            image_contents: "aW1n".into(),
            center: Coordinates { lat: 48.85, lng: 2.35 },
        };
        let created = client(&server).create_floor_plan("N_1", &plan).await.unwrap();

        assert_eq!(created.floor_plan_id, "g_100");
        assert_eq!(created.center, Coordinates { lat: 48.8501, lng: 2.3502 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_floor_plan_is_upload_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/networks/N_1/floorPlans")
            .with_status(400)
            .with_body(r#"{"errors": ["Image is too large"]}"#)
            .create_async()
            .await;

        let plan = NewFloorPlan {
            name: "Floor 1".into(),
            image_contents: "aW1n".into(),
            center: Coordinates { lat: 0.0, lng: 0.0 },
        };
        let err = client(&server).create_floor_plan("N_1", &plan).await.unwrap_err();
        assert!(matches!(err, MigrateError::Upload(ref m) if m.contains("Image is too large")));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_assign_device_sends_floor_plan_and_coordinates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/devices/Q2XX-0002")
            .match_body(Matcher::Json(serde_json::json!({"floorPlanId": "g_100", "lat": 48.85, "lng": 2.35})))
            .with_status(200)
            .with_body(r#"{"serial": "Q2XX-0002", "floorPlanId": "g_100"}"#)
            .create_async()
            .await;

        let assignment = DeviceAssignment { floor_plan_id: "g_100".into(), lat: 48.85, lng: 2.35 };
        client(&server).assign_device("Q2XX-0002", &assignment).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retry_budget() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("PUT", "/devices/Q2XX-0002")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(3)
            .create_async()
            .await;

        let assignment = DeviceAssignment { floor_plan_id: "g_100".into(), lat: 48.85, lng: 2.35 };
        let err = client(&server).assign_device("Q2XX-0002", &assignment).await.unwrap_err();

        assert!(matches!(err, MigrateError::Device { .. }));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_update_is_device_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/devices/Q2XX-0404")
            .with_status(404)
            .create_async()
            .await;

        let assignment = DeviceAssignment { floor_plan_id: "g_100".into(), lat: 1.0, lng: 2.0 };
        let err = client(&server).assign_device("Q2XX-0404", &assignment).await.unwrap_err();
        assert!(matches!(err, MigrateError::Device { ref serial, .. } if serial == "Q2XX-0404"));
    }

    #[tokio::test]
    async fn test_unauthorized_update_stays_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/devices/Q2XX-0002")
            .with_status(401)
            .create_async()
            .await;

        let assignment = DeviceAssignment { floor_plan_id: "g_100".into(), lat: 1.0, lng: 2.0 };
        let err = client(&server).assign_device("Q2XX-0002", &assignment).await.unwrap_err();
        assert!(matches!(err, MigrateError::Auth { service: "Meraki", .. }));
    }
}
