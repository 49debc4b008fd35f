//! Field projection for field selectors
//!
//! Each kind exposes a fixed, flat set of named fields. A field selector is
//! matched against that set exactly the way a label selector is matched
//! against labels.

use crate::types::{Minion, Pod, PodPhase};
use labels::Set;

/// Field names a pod can be selected by.
pub const POD_FIELDS: &[&str] = &[
    "ID",
    "DesiredState.Status",
    "DesiredState.Host",
    "DesiredState.Manifest.ID",
    "CurrentState.Status",
    "CurrentState.Host",
];

/// Field names a minion can be selected by.
pub const MINION_FIELDS: &[&str] = &["ID", "HostIP"];

/// Kinds that expose selectable fields.
pub trait FieldSource {
    /// The kind's selectable fields. Every field is present; unset values
    /// project as the empty string.
    fn fields(&self) -> Set;
}

fn phase(status: Option<PodPhase>) -> String {
    status.map(|p| p.as_str().to_string()).unwrap_or_default()
}

impl FieldSource for Pod {
    fn fields(&self) -> Set {
        let mut set = Set::new();
        set.insert("ID".to_string(), self.id.clone());
        set.insert("DesiredState.Status".to_string(), phase(self.desired_state.status));
        set.insert("DesiredState.Host".to_string(), self.desired_state.host.clone());
        set.insert(
            "DesiredState.Manifest.ID".to_string(),
            self.desired_state.manifest.id.clone(),
        );
        set.insert("CurrentState.Status".to_string(), phase(self.current_state.status));
        set.insert("CurrentState.Host".to_string(), self.current_state.host.clone());
        set
    }
}

impl FieldSource for Minion {
    fn fields(&self) -> Set {
        let mut set = Set::new();
        set.insert("ID".to_string(), self.id.clone());
        set.insert("HostIP".to_string(), self.host_ip.clone());
        set
    }
}
