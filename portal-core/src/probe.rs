//! Internet reachability check used by the verifier.

use crate::command;
use crate::config::{secs, ProbeConfig};
use crate::traits::ReachabilityProbe;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Pings a short list of highly available hosts, one at a time.
/// A single reply is enough; one host being down does not fail the check.
#[derive(Debug, Clone)]
pub struct PingProbe {
    ping: String,
    hosts: Vec<IpAddr>,
    per_probe_timeout: Duration,
    call_timeout: Duration,
}

impl PingProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            ping: config.ping_path.clone(),
            hosts: config.hosts.clone(),
            per_probe_timeout: secs(config.per_probe_timeout_secs),
            call_timeout: secs(config.call_timeout_secs),
        }
    }

    async fn ping_once(&self, host: IpAddr) -> bool {
        let wait = self.per_probe_timeout.as_secs().max(1).to_string();
        let host_arg = host.to_string();
        match command::run(
            &self.ping,
            ["-c", "1", "-W", wait.as_str(), host_arg.as_str()],
            self.call_timeout,
        )
        .await
        {
            Ok(out) => out.success(),
            Err(e) => {
                tracing::debug!("ping {} failed: {}", host, e);
                false
            }
        }
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn is_reachable(&self) -> bool {
        for &host in &self.hosts {
            if self.ping_once(host).await {
                tracing::debug!("{} answered", host);
                return true;
            }
        }
        false
    }
}
