//! Change events

use serde::{Deserialize, Serialize};

/// Kind of change carried by an [`Event`].
///
/// Serializes as `ADDED`, `MODIFIED` and `DELETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// The object was created
    Added,
    /// The object was updated
    Modified,
    /// The object was removed; the event carries its last state
    Deleted,
}

/// Objects that carry a registry-assigned, monotonically non-decreasing
/// resource version.
pub trait Versioned {
    /// The object's resource version.
    fn resource_version(&self) -> u64;
}

/// A single change to a resource collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    /// What happened
    pub kind: EventType,
    /// Snapshot of the object at the time of the change
    pub object: T,
}

impl<T> Event<T> {
    /// Creates an event.
    pub fn new(kind: EventType, object: T) -> Self {
        Self { kind, object }
    }

    /// Converts the carried object, keeping the event kind.
    pub fn map<U, F>(self, f: F) -> Event<U>
    where
        F: FnOnce(T) -> U,
    {
        Event {
            kind: self.kind,
            object: f(self.object),
        }
    }
}
