use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// 在这里定义共享的数据结构，和为所有后端、探测器、前端定义的 trait。

/// Represents a single Wi-Fi network found during a scan.
/// Wi-Fi 扫描时单个网络的具体信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub ssid: String,
    pub signal: u8,       // 信号强度，0到100
    pub security: String, // 无线网络安全性 "WPA2", "WPA1 WPA2", "Open"
}

/// `/api/wifi/connect` 的请求体。两个字段在使用前都会去掉首尾空白。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionRequest {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Result of the adapter's connect command. Says nothing about reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionAttemptOutcome {
    pub ssid: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

/// 无线设备当前的连接状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub connected: bool,
    pub ssid: Option<String>,
}

/// Captured output of one run of the portal teardown script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisableReport {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl DisableReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// 网络控制适配器：扫描、查询设备状态、发起连接。
#[async_trait]
pub trait NetworkControl: Send + Sync {
    /// Lists currently visible networks, deduplicated and sorted by signal.
    async fn scan(&self) -> crate::Result<Vec<Network>>;

    /// Reports whether the wireless device is connected and to what.
    async fn status(&self) -> crate::Result<DeviceStatus>;

    /// Asks the adapter to join `ssid`. A non-zero exit is reported through
    /// the outcome, not as an `Err`.
    async fn connect(
        &self,
        ssid: &str,
        password: Option<&str>,
    ) -> crate::Result<ConnectionAttemptOutcome>;
}

/// 互联网可达性探测
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Tears down access-point / captive-portal mode.
#[async_trait]
pub trait PortalDisabler: Send + Sync {
    async fn disable(&self) -> crate::Result<DisableReport>;
}

/// 前端资源提供者接口。
#[async_trait]
pub trait UiAssetProvider: Send + Sync {
    /// Retrieves a single UI asset.
    ///
    /// # Arguments
    /// * `path` - The path to the asset (e.g., "index.html", "style.css").
    ///
    /// # Returns
    /// The asset's content and its MIME type, or `Error::AssetNotFound`.
    async fn get_asset(&self, path: &str) -> crate::Result<(Cow<'static, [u8]>, String)>;
}
