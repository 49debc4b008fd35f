//! Container-host client
//!
//! Queries the agent running on a host for the runtime state of a pod's
//! containers.
//!
//! # Example
//!
//! ```no_run
//! use podinfo_client::{HttpPodInfoGetter, PodInfoGetter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let getter = HttpPodInfoGetter::new(10250)?;
//! let info = getter.get_pod_info("machine-1", "my-pod").await?;
//! for (name, container) in &info {
//!     println!("{name}: running={}", container.running());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod getter;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{HttpPodInfoGetter, DEFAULT_PORT};
pub use error::PodInfoError;
pub use getter::PodInfoGetter;
#[cfg(feature = "test-util")]
pub use mock::MockPodInfoGetter;
