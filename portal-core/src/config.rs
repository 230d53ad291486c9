use crate::{Error, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============= 配置 =============
// 每个字段都有默认值，配置文件中只需写出需要覆盖的部分。

/// 顶层应用配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalConfig {
    pub server: ServerConfig,
    pub portal: PortalHostConfig,
    pub network: NetworkConfig,
    pub verifier: VerifierConfig,
    pub probe: ProbeConfig,
    pub disabler: DisablerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_host: IpAddr,
    pub port: u16,
    /// Serve the UI from this directory instead of the embedded copy.
    pub assets_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            assets_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }
}

/// 门户对外公布的主机名，以及重定向目标
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalHostConfig {
    pub host: String,
    /// Defaults to `http://<host>`.
    pub url: Option<String>,
}

impl Default for PortalHostConfig {
    fn default() -> Self {
        Self {
            host: "splines.portal".to_string(),
            url: None,
        }
    }
}

impl PortalHostConfig {
    pub fn redirect_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.host))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub nmcli_path: String,
    pub interface_name: String,
    pub scan_timeout_secs: u64,
    pub status_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            nmcli_path: "nmcli".to_string(),
            interface_name: "wlan0".to_string(),
            scan_timeout_secs: 10,
            status_timeout_secs: 5,
            connect_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub settle_delay_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub log_path: PathBuf,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: 5,
            max_attempts: 6,
            retry_delay_secs: 5,
            log_path: PathBuf::from("/tmp/captive-portal-verification.log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub ping_path: String,
    pub hosts: Vec<IpAddr>,
    /// Passed to `ping -W`.
    pub per_probe_timeout_secs: u64,
    /// Hard limit on each `ping` process.
    pub call_timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ping_path: "ping".to_string(),
            hosts: vec![
                IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
                IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
                IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)),
            ],
            per_probe_timeout_secs: 2,
            call_timeout_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisablerConfig {
    /// Defaults to `<install root>/access-point/disable-captive-portal.sh`.
    pub script_path: Option<PathBuf>,
    pub use_sudo: bool,
    pub timeout_secs: u64,
}

impl Default for DisablerConfig {
    fn default() -> Self {
        Self {
            script_path: None,
            use_sudo: true,
            timeout_secs: 30,
        }
    }
}

impl DisablerConfig {
    pub fn resolved_script_path(&self) -> PathBuf {
        self.script_path.clone().unwrap_or_else(default_disable_script)
    }
}

/// The install root is the parent of the directory holding the running binary.
fn default_disable_script() -> PathBuf {
    let install_root = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    install_root
        .join("access-point")
        .join("disable-captive-portal.sh")
}

pub(crate) fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

// ============= 配置加载函数 =============

/// 从 TOML 字符串加载应用配置
pub fn portal_config_from_toml_str(s: &str) -> Result<PortalConfig> {
    let config: PortalConfig = toml::from_str(s)?;
    config.validate()?;
    Ok(config)
}

impl PortalConfig {
    /// Reads and validates the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        portal_config_from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.portal.host.trim().is_empty() {
            return Err(Error::Config("portal.host must not be empty".into()));
        }
        if self.verifier.max_attempts == 0 {
            return Err(Error::Config("verifier.max_attempts must be at least 1".into()));
        }
        if self.probe.hosts.is_empty() {
            return Err(Error::Config("probe.hosts must list at least one host".into()));
        }
        if self.network.interface_name.trim().is_empty() {
            return Err(Error::Config("network.interface_name must not be empty".into()));
        }
        Ok(())
    }
}
