use crate::command;
use crate::config::{secs, DisablerConfig};
use crate::traits::{DisableReport, PortalDisabler};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 运行关闭 AP / 强制门户的脚本（默认通过 sudo 提权）。
#[derive(Debug, Clone)]
pub struct ScriptDisabler {
    script: PathBuf,
    use_sudo: bool,
    timeout: Duration,
}

impl ScriptDisabler {
    pub fn new(config: &DisablerConfig) -> Self {
        Self {
            script: config.resolved_script_path(),
            use_sudo: config.use_sudo,
            timeout: secs(config.timeout_secs),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl PortalDisabler for ScriptDisabler {
    async fn disable(&self) -> Result<DisableReport> {
        let script = self.script.as_os_str();
        let out = if self.use_sudo {
            command::run("sudo", [std::ffi::OsStr::new("bash"), script], self.timeout).await?
        } else {
            command::run("bash", [script], self.timeout).await?
        };
        Ok(DisableReport {
            exit_code: out.status,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}
