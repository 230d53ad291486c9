use crate::Result;
use crate::traits::{ConnectionAttemptOutcome, DeviceStatus, Network, NetworkControl};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// A mock backend for local development.
/// It simulates scanning and connecting without any real hardware interaction.
#[derive(Debug, Default)]
pub struct MockControl {
    connected_to: Mutex<Option<String>>,
}

impl MockControl {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NetworkControl for MockControl {
    async fn scan(&self) -> Result<Vec<Network>> {
        tracing::info!("🤖 [MockControl] Scanning for networks...");
        sleep(Duration::from_secs(1)).await;

        let networks = vec![
            Network {
                ssid: "MyHomeWiFi".to_string(),
                signal: 95,
                security: "WPA3".to_string(),
            },
            Network {
                ssid: "xfinitywifi".to_string(),
                signal: 88,
                security: "WPA2".to_string(),
            },
            Network {
                ssid: "CafeGuest".to_string(),
                signal: 78,
                security: "Open".to_string(),
            },
            Network {
                ssid: "Neighbor's Network".to_string(),
                signal: 55,
                security: "WPA2".to_string(),
            },
        ];
        Ok(networks)
    }

    async fn status(&self) -> Result<DeviceStatus> {
        let ssid = self.connected_to.lock().map(|g| g.clone()).unwrap_or(None);
        Ok(DeviceStatus {
            connected: ssid.is_some(),
            ssid,
        })
    }

    async fn connect(&self, ssid: &str, password: Option<&str>) -> Result<ConnectionAttemptOutcome> {
        tracing::info!(
            "🤖 [MockControl] Connecting to '{}' with password: {}",
            ssid,
            if password.is_some_and(|p| !p.is_empty()) { "********" } else { "(none)" }
        );
        sleep(Duration::from_secs(2)).await;

        // 为测试模拟某个网络连接失败
        if ssid == "xfinitywifi" {
            return Ok(ConnectionAttemptOutcome {
                ssid: ssid.to_string(),
                succeeded: false,
                error_message: Some("Error: Connection activation failed: (7) Secrets were required, but not provided.".into()),
            });
        }

        if let Ok(mut guard) = self.connected_to.lock() {
            *guard = Some(ssid.to_string());
        }
        Ok(ConnectionAttemptOutcome {
            ssid: ssid.to_string(),
            succeeded: true,
            error_message: None,
        })
    }
}
