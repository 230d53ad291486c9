use crate::command::{self, CommandOutput};
use crate::config::{secs, NetworkConfig};
use crate::traits::{ConnectionAttemptOutcome, DeviceStatus, Network, NetworkControl};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

// 通过调用 nmcli 命令行工具实现的网络控制后端，适用于使用 NetworkManager 管理网络连接的 Linux 系统

#[derive(Debug, Clone)]
pub struct NmcliControl {
    nmcli: String,
    interface_name: String,
    scan_timeout: Duration,
    status_timeout: Duration,
    connect_timeout: Duration,
}

impl NmcliControl {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            nmcli: config.nmcli_path.clone(),
            interface_name: config.interface_name.clone(),
            scan_timeout: secs(config.scan_timeout_secs),
            status_timeout: secs(config.status_timeout_secs),
            connect_timeout: secs(config.connect_timeout_secs),
        }
    }

    async fn nmcli(&self, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
        command::run(&self.nmcli, args, timeout).await
    }
}

/// Non-zero exit of a read-only query is an error; the stderr text is kept.
fn require_success(out: CommandOutput, what: &str) -> Result<CommandOutput> {
    if out.success() {
        return Ok(out);
    }
    let err = out.stderr.trim();
    Err(Error::CommandFailed(if err.is_empty() {
        format!("nmcli {} exited with status {:?}", what, out.status)
    } else {
        format!("nmcli {} failed: {}", what, err)
    }))
}

#[async_trait]
impl NetworkControl for NmcliControl {
    async fn scan(&self) -> Result<Vec<Network>> {
        let out = self
            .nmcli(
                &["-t", "-f", "SSID,SIGNAL,SECURITY", "device", "wifi", "list"],
                self.scan_timeout,
            )
            .await?;
        let out = require_success(out, "scan")?;
        let networks = parse_wifi_list(&out.stdout);
        tracing::debug!("nmcli scan returned {} networks", networks.len());
        Ok(networks)
    }

    async fn status(&self) -> Result<DeviceStatus> {
        let out = self
            .nmcli(
                &["-t", "-f", "DEVICE,STATE,CONNECTION", "device", "status"],
                self.status_timeout,
            )
            .await?;
        let out = require_success(out, "device status")?;
        Ok(parse_device_status(&out.stdout, &self.interface_name))
    }

    async fn connect(&self, ssid: &str, password: Option<&str>) -> Result<ConnectionAttemptOutcome> {
        let mut args = vec!["device", "wifi", "connect", ssid];
        if let Some(pw) = password.filter(|p| !p.is_empty()) {
            args.push("password");
            args.push(pw);
        }
        tracing::info!(ssid, with_password = args.len() > 4, "Running nmcli connect");

        let out = self.nmcli(&args, self.connect_timeout).await?;
        let succeeded = out.success();
        let error_message = if succeeded {
            None
        } else {
            let err = out.stderr.trim();
            (!err.is_empty()).then(|| err.to_string())
        };
        if !succeeded {
            tracing::warn!(ssid, status = ?out.status, "nmcli connect failed");
        }

        Ok(ConnectionAttemptOutcome {
            ssid: ssid.to_string(),
            succeeded,
            error_message,
        })
    }
}

/// Splits one line of `nmcli -t` output. Terse mode escapes `:` and `\`
/// inside a field with a backslash.
fn split_terse_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// 解析 `nmcli -t -f SSID,SIGNAL,SECURITY device wifi list` 的输出。
///
/// Hidden networks (empty SSID) are dropped, the first line for each SSID
/// wins, and the result is sorted by signal, strongest first. Ties keep
/// their scan order.
pub fn parse_wifi_list(output: &str) -> Vec<Network> {
    let mut seen = HashSet::new();
    let mut networks = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        let fields = split_terse_fields(line);
        if fields.len() < 3 {
            continue;
        }

        let ssid = &fields[0];
        if ssid.is_empty() || !seen.insert(ssid.clone()) {
            continue;
        }

        let raw_signal = fields[1].as_str();
        let signal = if !raw_signal.is_empty() && raw_signal.bytes().all(|b| b.is_ascii_digit()) {
            raw_signal.parse::<u32>().map(|v| v.min(100) as u8).unwrap_or(100)
        } else {
            0
        };

        let security = if fields[2].trim().is_empty() {
            "Open".to_string()
        } else {
            fields[2].clone()
        };

        networks.push(Network {
            ssid: ssid.clone(),
            signal,
            security,
        });
    }

    // sort_by 是稳定排序，信号相同的网络保持扫描顺序
    networks.sort_by(|a, b| b.signal.cmp(&a.signal));
    networks
}

/// 解析 `nmcli -t -f DEVICE,STATE,CONNECTION device status` 的输出。
pub fn parse_device_status(output: &str, interface_name: &str) -> DeviceStatus {
    for line in output.lines() {
        if !(line.contains(interface_name) || line.to_lowercase().contains("wifi")) {
            continue;
        }
        let fields = split_terse_fields(line);
        if fields.len() < 3 || !state_is_connected(&fields[1]) {
            continue;
        }
        return DeviceStatus {
            connected: true,
            ssid: (!fields[2].is_empty()).then(|| fields[2].clone()),
        };
    }
    DeviceStatus::default()
}

// A bare substring test would also accept "disconnected".
fn state_is_connected(state: &str) -> bool {
    let state = state.to_lowercase();
    state.contains("connected") && !state.contains("disconnected")
}
