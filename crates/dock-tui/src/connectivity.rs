//! Background reachability probe.
//!
//! A plain TCP connect to the server's host:port decides online/offline. The
//! shared [`Connectivity`] flag is what the client core checks before every
//! request; only transitions produce a toast.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dock_proto::config::ConnectivityConfig;
use dock_proto::{Connectivity, Notifier, Severity};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct ConnectivityMonitor {
    addr: String,
    interval: Duration,
    timeout: Duration,
    connectivity: Connectivity,
    notifier: Arc<dyn Notifier>,
}

impl ConnectivityMonitor {
    pub fn new(
        base_url: &str,
        config: &ConnectivityConfig,
        connectivity: Connectivity,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Ok(Self {
            addr: probe_addr(base_url)?,
            interval: Duration::from_secs(config.probe_interval_secs.max(1)),
            timeout: Duration::from_millis(config.probe_timeout_ms),
            connectivity,
            notifier,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let online = probe(&self.addr, self.timeout).await;
                self.apply(online);
            }
        })
    }

    /// Records a probe result. Returns true when the state changed.
    pub fn apply(&self, online: bool) -> bool {
        if !self.connectivity.set_online(online) {
            return false;
        }
        if online {
            info!("connectivity: {} reachable again", self.addr);
            self.notifier.notify("Back online", Severity::Success, None);
        } else {
            warn!("connectivity: {} unreachable", self.addr);
            self.notifier.notify("Connection lost", Severity::Warning, None);
        }
        true
    }
}

/// `host:port` for the server in `base_url`, filling in the scheme's default
/// port.
pub fn probe_addr(base_url: &str) -> Result<String> {
    let url = reqwest::Url::parse(base_url).with_context(|| format!("invalid server url {}", base_url))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("server url {} has no host", base_url))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| anyhow!("server url {} has no port", base_url))?;
    Ok(format!("{}:{}", host, port))
}

pub async fn probe(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("connectivity: connect {} failed: {}", addr, e);
            false
        }
        Err(_) => {
            debug!("connectivity: connect {} timed out", addr);
            false
        }
    }
}
