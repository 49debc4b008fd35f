//! The [`Object`] envelope
//!
//! Every value the API server sends or receives is one of a closed set of
//! kinds. On the wire the variant is carried in the `kind` field.

use crate::types::{Minion, MinionList, Pod, PodList, Status};
use serde::{Deserialize, Serialize};
use watch::Versioned;

/// Any API object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    Pod(Pod),
    PodList(PodList),
    Minion(Minion),
    MinionList(MinionList),
    Status(Status),
}

impl Object {
    /// The kind name written to the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Pod(_) => "Pod",
            Object::PodList(_) => "PodList",
            Object::Minion(_) => "Minion",
            Object::MinionList(_) => "MinionList",
            Object::Status(_) => "Status",
        }
    }

    /// True if `kind` names a known variant.
    pub fn is_known_kind(kind: &str) -> bool {
        matches!(kind, "Pod" | "PodList" | "Minion" | "MinionList" | "Status")
    }

    /// The object's id; empty for lists and statuses.
    pub fn id(&self) -> &str {
        match self {
            Object::Pod(pod) => &pod.id,
            Object::Minion(minion) => &minion.id,
            Object::PodList(_) | Object::MinionList(_) | Object::Status(_) => "",
        }
    }

    /// Sets the id of a pod or minion; other kinds are left unchanged.
    pub fn set_id(&mut self, id: impl Into<String>) {
        match self {
            Object::Pod(pod) => pod.id = id.into(),
            Object::Minion(minion) => minion.id = id.into(),
            Object::PodList(_) | Object::MinionList(_) | Object::Status(_) => {}
        }
    }

    pub fn into_pod(self) -> Option<Pod> {
        match self {
            Object::Pod(pod) => Some(pod),
            _ => None,
        }
    }

    pub fn into_minion(self) -> Option<Minion> {
        match self {
            Object::Minion(minion) => Some(minion),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<&Status> {
        match self {
            Object::Status(status) => Some(status),
            _ => None,
        }
    }
}

impl Versioned for Object {
    fn resource_version(&self) -> u64 {
        match self {
            Object::Pod(pod) => pod.resource_version,
            Object::PodList(list) => list.resource_version,
            Object::Minion(minion) => minion.resource_version,
            Object::MinionList(list) => list.resource_version,
            Object::Status(_) => 0,
        }
    }
}

impl Versioned for Pod {
    fn resource_version(&self) -> u64 {
        self.resource_version
    }
}

impl Versioned for Minion {
    fn resource_version(&self) -> u64 {
        self.resource_version
    }
}

impl From<Pod> for Object {
    fn from(pod: Pod) -> Self {
        Object::Pod(pod)
    }
}

impl From<PodList> for Object {
    fn from(list: PodList) -> Self {
        Object::PodList(list)
    }
}

impl From<Minion> for Object {
    fn from(minion: Minion) -> Self {
        Object::Minion(minion)
    }
}

impl From<MinionList> for Object {
    fn from(list: MinionList) -> Self {
        Object::MinionList(list)
    }
}

impl From<Status> for Object {
    fn from(status: Status) -> Self {
        Object::Status(status)
    }
}
