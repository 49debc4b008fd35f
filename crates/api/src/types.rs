//! Resource types
//!
//! Pods, their manifests and runtime snapshots, minions (hosts), list
//! wrappers and the `Status` object returned for failures and
//! asynchronous completions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Per-container runtime snapshots of one pod, keyed by container name.
pub type PodInfo = BTreeMap<String, ContainerInfo>;

/// A scheduled group of containers sharing a host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Pod identity; assigned by the server on create when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Set by the server on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// Registry-assigned revision
    #[serde(default, skip_serializing_if = "is_zero")]
    pub resource_version: u64,

    /// Free-form labels matched by label selectors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// What the client asked for
    #[serde(default)]
    pub desired_state: PodState,

    /// What was last observed
    #[serde(default)]
    pub current_state: PodState,
}

/// Desired or observed state of a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodState {
    #[serde(default)]
    pub manifest: ContainerManifest,

    /// Derived phase; never ground truth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PodPhase>,

    /// Host the pod is assigned to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,

    #[serde(rename = "hostIP", default, skip_serializing_if = "String::is_empty")]
    pub host_ip: String,

    #[serde(rename = "podIP", default, skip_serializing_if = "String::is_empty")]
    pub pod_ip: String,

    /// Runtime snapshots reported by the container host
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: PodInfo,
}

/// The containers making up a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerManifest {
    /// Manifest schema version, see [`crate::SUPPORTED_MANIFEST_VERSIONS`]
    #[serde(default)]
    pub version: String,

    /// Mirrors the owning pod's id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Globally unique tag, assigned on create when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
}

/// One container of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,

    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub container_port: u16,

    #[serde(default)]
    pub host_port: u16,

    /// `TCP` or `UDP`; empty means `TCP`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Runtime snapshot of one container, as reported by its host.
///
/// Uses the container runtime's PascalCase field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInfo {
    #[serde(rename = "Id", default)]
    pub id: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub state: ContainerState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_settings: Option<NetworkSettings>,
}

impl ContainerInfo {
    /// True if the runtime reports the container as running.
    pub fn running(&self) -> bool {
        self.state.running
    }

    /// The container's reported IP address, if any.
    pub fn ip_address(&self) -> Option<&str> {
        self.network_settings
            .as_ref()
            .map(|n| n.ip_address.as_str())
            .filter(|ip| !ip.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
}

/// Derived lifecycle phase of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    /// Not yet observed running, or in a mixed state
    Waiting,
    /// Every desired container is running
    Running,
    /// Every desired container stopped, or the host is gone
    Terminated,
}

impl PodPhase {
    /// The phase name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            PodPhase::Waiting => "Waiting",
            PodPhase::Running => "Running",
            PodPhase::Terminated => "Terminated",
        }
    }

    /// True for phases the pod does not leave on its own.
    pub fn is_stable(self) -> bool {
        matches!(self, PodPhase::Running | PodPhase::Terminated)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodList {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub resource_version: u64,
    #[serde(default)]
    pub items: Vec<Pod>,
}

/// A host that pods can be scheduled onto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minion {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub resource_version: u64,

    #[serde(rename = "hostIP", default, skip_serializing_if = "String::is_empty")]
    pub host_ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinionList {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub resource_version: u64,
    #[serde(default)]
    pub items: Vec<Minion>,
}

/// Outcome of an operation that did not return a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub status: StatusOutcome,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,

    /// Suggested HTTP status code
    #[serde(default)]
    pub code: u16,
}

impl Status {
    /// A successful completion with no resource to return.
    pub fn success() -> Self {
        Self {
            status: StatusOutcome::Success,
            message: String::new(),
            reason: None,
            details: None,
            code: 200,
        }
    }

    /// A failure with the given reason, message and HTTP code.
    pub fn failure(reason: StatusReason, message: impl Into<String>, code: u16) -> Self {
        Self {
            status: StatusOutcome::Failure,
            message: message.into(),
            reason: Some(reason),
            details: None,
            code,
        }
    }

    /// Attaches the affected resource's id and kind.
    #[must_use]
    pub fn with_details(mut self, id: impl Into<String>, kind: impl Into<String>) -> Self {
        self.details = Some(StatusDetails {
            id: id.into(),
            kind: kind.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusOutcome {
    Success,
    Failure,
    /// The operation is still in progress
    Working,
}

/// Machine-readable failure cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    NotFound,
    AlreadyExists,
    Invalid,
    BadRequest,
    MethodNotAllowed,
    Working,
    InternalError,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}
