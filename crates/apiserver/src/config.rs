//! Server configuration from environment variables

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings of the API server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Listen address (`APISERVER_ADDR`)
    pub addr: SocketAddr,
    /// Route prefix (`API_PREFIX`)
    pub prefix: String,
    /// Per-subscription queue length (`WATCH_QUEUE_LEN`)
    pub watch_queue_len: usize,
    /// How long a mutation request waits for its result (`REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,
    /// Interval between pod status polls after a create (`POD_POLL_PERIOD_MS`)
    pub pod_poll_period: Duration,
    /// Bound on post-create polling (`POD_WAIT_TIMEOUT_SECS`)
    pub pod_wait_timeout: Duration,
    /// Port of the container-host agent (`KUBELET_PORT`)
    pub kubelet_port: u16,
    /// Hosts registered at startup (`MINIONS`, comma-separated)
    pub minions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            prefix: "/api/v1beta1".to_string(),
            watch_queue_len: 100,
            request_timeout: Duration::from_secs(30),
            pod_poll_period: Duration::from_millis(100),
            pod_wait_timeout: Duration::from_secs(30),
            kubelet_port: 10250,
            minions: Vec::new(),
        }
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads the configuration through `lookup`; unset variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("APISERVER_ADDR") {
            config.addr = parse("APISERVER_ADDR", value)?;
        }
        if let Some(value) = lookup("API_PREFIX") {
            let prefix = value.trim().trim_end_matches('/');
            if !prefix.is_empty() && !prefix.starts_with('/') {
                return Err(ConfigError::Invalid {
                    var: "API_PREFIX",
                    value,
                    reason: "must start with '/'".to_string(),
                });
            }
            config.prefix = prefix.to_string();
        }
        if let Some(value) = lookup("WATCH_QUEUE_LEN") {
            let len: usize = parse("WATCH_QUEUE_LEN", value.clone())?;
            if len == 0 {
                return Err(ConfigError::Invalid {
                    var: "WATCH_QUEUE_LEN",
                    value,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.watch_queue_len = len;
        }
        if let Some(value) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse("REQUEST_TIMEOUT_SECS", value)?);
        }
        if let Some(value) = lookup("POD_POLL_PERIOD_MS") {
            config.pod_poll_period = Duration::from_millis(parse("POD_POLL_PERIOD_MS", value)?);
        }
        if let Some(value) = lookup("POD_WAIT_TIMEOUT_SECS") {
            config.pod_wait_timeout = Duration::from_secs(parse("POD_WAIT_TIMEOUT_SECS", value)?);
        }
        if let Some(value) = lookup("KUBELET_PORT") {
            config.kubelet_port = parse("KUBELET_PORT", value)?;
        }
        if let Some(value) = lookup("MINIONS") {
            config.minions = value
                .split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }
}
