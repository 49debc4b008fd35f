//! Registries and REST storage for pods and minions
//!
//! - [`PodRegistry`] and [`MinionRegistry`]: storage collaborators, with
//!   [`MemoryRegistry`] as the in-process implementation
//! - [`compute_phase`] and [`get_pod_status`]: pod phase derivation
//! - [`PodStorage`] and [`MinionStorage`]: the `pods` and `minions`
//!   collections served by the API server
//!
//! # Example
//!
//! ```no_run
//! use registry::{MemoryRegistry, MinionStorage, PodStorage};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let registry = Arc::new(MemoryRegistry::new(100));
//! let pods = PodStorage::new(Arc::<MemoryRegistry>::clone(&registry)).with_minions(Arc::<MemoryRegistry>::clone(&registry));
//! let minions = MinionStorage::new(registry);
//! # }
//! ```

pub mod cloud;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod minion;
pub mod pod;
pub mod traits;
pub mod status;

pub use cloud::{CloudError, CloudInstances};
pub use error::RegistryError;
pub use memory::MemoryRegistry;
pub use minion::MinionStorage;
pub use pod::PodStorage;
pub use traits::{MinionRegistry, PodRegistry};
pub use status::{compute_phase, get_pod_status, pod_host};
