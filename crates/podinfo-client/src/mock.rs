//! Mock PodInfoGetter for unit testing
//!
//! Serves canned per-host, per-pod info from memory and records every call.

use crate::error::PodInfoError;
use crate::getter::PodInfoGetter;
use api::PodInfo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock container-host client
///
/// Unknown `(host, pod)` pairs answer with `NotFound`; a host marked as
/// failing answers every query with an `Api` error.
#[derive(Clone, Default)]
pub struct MockPodInfoGetter {
    info: Arc<Mutex<HashMap<(String, String), PodInfo>>>,
    failing_hosts: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockPodInfoGetter {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `info` for `pod_id` on `host`
    pub fn set_info(&self, host: &str, pod_id: &str, info: PodInfo) {
        self.info
            .lock()
            .unwrap()
            .insert((host.to_string(), pod_id.to_string()), info);
    }

    /// Make every query against `host` fail
    pub fn fail_host(&self, host: &str) {
        self.failing_hosts.lock().unwrap().push(host.to_string());
    }

    /// `(host, pod_id)` of every call so far, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PodInfoGetter for MockPodInfoGetter {
    async fn get_pod_info(&self, host: &str, pod_id: &str) -> Result<PodInfo, PodInfoError> {
        self.calls
            .lock()
            .unwrap()
            .push((host.to_string(), pod_id.to_string()));

        if self.failing_hosts.lock().unwrap().iter().any(|h| h == host) {
            return Err(PodInfoError::Api {
                host: host.to_string(),
                status: 500,
                body: "mock failure".to_string(),
            });
        }

        self.info
            .lock()
            .unwrap()
            .get(&(host.to_string(), pod_id.to_string()))
            .cloned()
            .ok_or_else(|| PodInfoError::NotFound {
                host: host.to_string(),
                pod_id: pod_id.to_string(),
            })
    }
}
