//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Public DNS resolver; a TCP handshake on port 53 is cheap and widely allowed.
const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Desktop network monitor implementation
///
/// Detects connectivity by opening a TCP connection to a well-known host.
/// Desktop links are reported as unmetered.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    last_status: Arc<Mutex<Option<NetworkStatus>>>,
}

impl DesktopNetworkMonitor {
    /// Create a monitor that probes the default public resolver
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_ADDR, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a monitor with a custom `host:port` probe target
    pub fn with_probe(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            probe_addr: addr.into(),
            probe_timeout: timeout,
            last_status: Arc::new(Mutex::new(None)),
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(&self.probe_addr),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;

        let mut last = self.last_status.lock().await;
        if *last != Some(status) {
            info!(status = ?status, probe = %self.probe_addr, "Network status changed");
            *last = Some(status);
        } else {
            debug!(status = ?status, "Network status unchanged");
        }

        Ok(match status {
            // Desktop APIs can't cheaply tell Ethernet from WiFi.
            NetworkStatus::Connected => NetworkInfo::connected(NetworkType::Other),
            _ => NetworkInfo::disconnected(),
        })
    }
}
