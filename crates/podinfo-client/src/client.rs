//! HTTP container-host client
//!
//! Each host runs an agent that answers `GET /podInfo?podID=<id>` with a JSON
//! map of container name to runtime snapshot.

use crate::error::PodInfoError;
use crate::getter::PodInfoGetter;
use api::PodInfo;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default port of the container-host agent
pub const DEFAULT_PORT: u16 = 10250;

/// Talks to the agent on each host over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpPodInfoGetter {
    client: Client,
    port: u16,
}

impl HttpPodInfoGetter {
    /// Create a getter that reaches every host on `port`
    pub fn new(port: u16) -> Result<Self, PodInfoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(PodInfoError::Http)?;
        Ok(Self::with_client(client, port))
    }

    /// Create a getter around an existing HTTP client
    pub fn with_client(client: Client, port: u16) -> Self {
        Self { client, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build the info URL for a pod on a host
    pub fn build_url(&self, host: &str, pod_id: &str) -> String {
        format!(
            "http://{}:{}/podInfo?podID={}",
            host,
            self.port,
            urlencoding::encode(pod_id)
        )
    }
}

#[async_trait::async_trait]
impl PodInfoGetter for HttpPodInfoGetter {
    async fn get_pod_info(&self, host: &str, pod_id: &str) -> Result<PodInfo, PodInfoError> {
        let url = self.build_url(host, pod_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(PodInfoError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PodInfoError::NotFound {
                host: host.to_string(),
                pod_id: pod_id.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PodInfoError::Api {
                host: host.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
