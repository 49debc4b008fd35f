//! Pod phase derivation
//!
//! A pod's phase is never stored as ground truth. It is recomputed from the
//! containers the pod asks for, the latest runtime snapshots reported by its
//! host, and whether that host is still a known minion.

use crate::error::RegistryError;
use crate::traits::MinionRegistry;
use api::{Container, Pod, PodInfo, PodPhase};
use tracing::warn;

/// Derives a phase from the desired containers, their runtime snapshots and
/// the reachability of the pod's host.
///
/// Rules, first match wins:
/// 1. no snapshot at all: `Waiting`
/// 2. host not reachable: `Terminated`
/// 3. every desired container has a running snapshot: `Running`
/// 4. every desired container has a stopped snapshot: `Terminated`
/// 5. anything else: `Waiting`
pub fn compute_phase(desired: &[Container], info: &PodInfo, host_reachable: bool) -> PodPhase {
    if info.is_empty() {
        return PodPhase::Waiting;
    }
    if !host_reachable {
        return PodPhase::Terminated;
    }

    let mut running = 0;
    let mut stopped = 0;
    for container in desired {
        match info.get(&container.name) {
            Some(snapshot) if snapshot.running() => running += 1,
            Some(_) => stopped += 1,
            None => {}
        }
    }

    if running == desired.len() {
        PodPhase::Running
    } else if stopped == desired.len() {
        PodPhase::Terminated
    } else {
        PodPhase::Waiting
    }
}

/// Host a pod runs on: the observed host, else the requested one.
pub fn pod_host(pod: &Pod) -> &str {
    if pod.current_state.host.is_empty() {
        &pod.desired_state.host
    } else {
        &pod.current_state.host
    }
}

/// Computes the phase of a live pod, checking its host against `minions`.
///
/// A pod without a host is `Waiting`. If the reachability check fails the
/// host is treated as reachable and the error is returned alongside the
/// phase.
pub async fn get_pod_status(
    pod: &Pod,
    minions: &dyn MinionRegistry,
) -> (PodPhase, Option<RegistryError>) {
    let info = &pod.current_state.info;
    let containers = &pod.desired_state.manifest.containers;
    let host = pod_host(pod);
    if info.is_empty() || host.is_empty() {
        return (PodPhase::Waiting, None);
    }

    match minions.contains(host).await {
        Ok(reachable) => (compute_phase(containers, info, reachable), None),
        Err(err) => {
            warn!(id = %pod.id, %host, error = %err, "host reachability check failed");
            (compute_phase(containers, info, true), Some(err))
        }
    }
}
