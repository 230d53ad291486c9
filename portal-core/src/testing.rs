//! Hand-written fakes shared by the unit tests.

use crate::traits::{
    ConnectionAttemptOutcome, DeviceStatus, DisableReport, Network, NetworkControl, PortalDisabler,
    ReachabilityProbe, UiAssetProvider,
};
use crate::verification_log::{LogLevel, VerificationLog};
use crate::{Error, Result};
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub(crate) fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub(crate) fn has(&self, level: LogLevel) -> bool {
        self.entries().iter().any(|(l, _)| *l == level)
    }
}

#[async_trait]
impl VerificationLog for MemoryLog {
    async fn record(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

/// Answers from `results` in order, then `false` forever.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProbe {
    results: Vec<bool>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub(crate) fn new(results: Vec<bool>) -> Self {
        Self {
            results,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reachable on attempt `n` (1-based), unreachable before it.
    pub(crate) fn succeeding_on(n: usize) -> Self {
        let mut results = vec![false; n - 1];
        results.push(true);
        Self::new(results)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn is_reachable(&self) -> bool {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.get(n).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum DisableBehaviour {
    Succeed,
    ExitWith(i32),
    FailToRun,
}

#[derive(Debug)]
pub(crate) struct CountingDisabler {
    behaviour: DisableBehaviour,
    calls: AtomicUsize,
}

impl CountingDisabler {
    pub(crate) fn new(behaviour: DisableBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalDisabler for CountingDisabler {
    async fn disable(&self) -> Result<DisableReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            DisableBehaviour::Succeed => Ok(DisableReport {
                exit_code: Some(0),
                stdout: "access point removed\n".into(),
                stderr: String::new(),
            }),
            DisableBehaviour::ExitWith(code) => Ok(DisableReport {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: "systemctl: unit not found\n".into(),
            }),
            DisableBehaviour::FailToRun => Err(Error::ToolNotFound("sudo".into())),
        }
    }
}

/// What the fake adapter's `connect` should do.
#[derive(Debug, Clone)]
pub(crate) enum ConnectBehaviour {
    Succeed,
    Fail(Option<String>),
    Error(fn() -> Error),
}

#[derive(Debug)]
pub(crate) struct FakeControl {
    pub(crate) scan: fn() -> Result<Vec<Network>>,
    pub(crate) status: fn() -> Result<DeviceStatus>,
    pub(crate) connect: ConnectBehaviour,
    calls: AtomicUsize,
    last_password: Mutex<Option<String>>,
}

impl FakeControl {
    pub(crate) fn new(connect: ConnectBehaviour) -> Self {
        Self {
            scan: || Ok(Vec::new()),
            status: || Ok(DeviceStatus::default()),
            connect,
            calls: AtomicUsize::new(0),
            last_password: Mutex::new(None),
        }
    }

    /// Total adapter invocations of any kind.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_password(&self) -> Option<String> {
        self.last_password.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkControl for FakeControl {
    async fn scan(&self) -> Result<Vec<Network>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.scan)()
    }

    async fn status(&self) -> Result<DeviceStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.status)()
    }

    async fn connect(&self, ssid: &str, password: Option<&str>) -> Result<ConnectionAttemptOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_password.lock().unwrap() = password.map(str::to_string);
        match &self.connect {
            ConnectBehaviour::Succeed => Ok(ConnectionAttemptOutcome {
                ssid: ssid.to_string(),
                succeeded: true,
                error_message: None,
            }),
            ConnectBehaviour::Fail(message) => Ok(ConnectionAttemptOutcome {
                ssid: ssid.to_string(),
                succeeded: false,
                error_message: message.clone(),
            }),
            ConnectBehaviour::Error(make) => Err(make()),
        }
    }
}

/// Serves `index.html` only.
#[derive(Debug, Default)]
pub(crate) struct StaticAssets;

#[async_trait]
impl UiAssetProvider for StaticAssets {
    async fn get_asset(&self, path: &str) -> Result<(Cow<'static, [u8]>, String)> {
        match path {
            "index.html" => Ok((
                Cow::Borrowed(b"<html>portal</html>".as_slice()),
                "text/html".to_string(),
            )),
            _ => Err(Error::AssetNotFound(path.to_string())),
        }
    }
}
