//! Connectivity verification after a successful connect command.
//!
//! `nmcli` exiting 0 only means the association worked. Each successful
//! connect spawns one verification run that polls the reachability probe on a
//! fixed schedule and, once the internet answers, tears the captive portal
//! down exactly once. Nothing here reports back to the HTTP client.

use crate::config::{secs, VerifierConfig};
use crate::traits::{PortalDisabler, ReachabilityProbe};
use crate::verification_log::{LogLevel, VerificationLog};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Wait before the first probe so DHCP and routes can settle.
    pub settle_delay: Duration,
    pub max_attempts: u32,
    /// Wait between unsuccessful attempts; never applied after the last one.
    pub retry_delay: Duration,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self::from(&VerifierConfig::default())
    }
}

impl From<&VerifierConfig> for VerifierSettings {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            settle_delay: secs(config.settle_delay_secs),
            max_attempts: config.max_attempts.max(1),
            retry_delay: secs(config.retry_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Pending,
    /// Internet reachable; the portal disabler has been invoked.
    Verified,
    /// Every attempt failed; the portal stays up.
    Exhausted,
    /// A newer connect request took over before this run finished.
    Superseded,
}

/// State of one verification, owned by the task running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRun {
    pub ssid: String,
    pub generation: u64,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub outcome: VerificationOutcome,
}

impl VerificationRun {
    fn new(ssid: String, generation: u64, max_attempts: u32) -> Self {
        Self {
            ssid,
            generation,
            attempts_made: 0,
            max_attempts,
            outcome: VerificationOutcome::Pending,
        }
    }

    pub fn verified(&self) -> bool {
        self.outcome == VerificationOutcome::Verified
    }
}

/// Latest attempt wins: every successful connect takes the next generation, and
/// a run whose generation is no longer current stops without disabling.
#[derive(Debug, Default)]
pub struct AttemptGenerations(AtomicU64);

impl AttemptGenerations {
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

pub struct Verifier {
    probe: Arc<dyn ReachabilityProbe>,
    disabler: Arc<dyn PortalDisabler>,
    log: Arc<dyn VerificationLog>,
    settings: VerifierSettings,
    generations: AttemptGenerations,
}

impl Verifier {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        disabler: Arc<dyn PortalDisabler>,
        log: Arc<dyn VerificationLog>,
        settings: VerifierSettings,
    ) -> Self {
        Self {
            probe,
            disabler,
            log,
            settings,
            generations: AttemptGenerations::default(),
        }
    }

    /// Supersedes whatever verification is in flight and returns the new
    /// generation. Call once per successful connect, before `spawn`.
    pub fn begin_attempt(&self) -> u64 {
        self.generations.begin()
    }

    /// Starts a detached verification run. There is no handle to join or
    /// cancel it; a process exit strands it.
    pub fn spawn(self: &Arc<Self>, ssid: String, generation: u64) {
        let verifier = Arc::clone(self);
        tokio::spawn(async move {
            let run = verifier.run(ssid, generation).await;
            tracing::debug!(ssid = %run.ssid, outcome = ?run.outcome, attempts = run.attempts_made, "Verification finished");
        });
    }

    /// Drives one run to a terminal state.
    pub async fn run(&self, ssid: String, generation: u64) -> VerificationRun {
        let mut run = VerificationRun::new(ssid, generation, self.settings.max_attempts);
        self.log.record(
            LogLevel::Info,
            &format!("Verifying internet connectivity for {}...", run.ssid),
        ).await;

        sleep(self.settings.settle_delay).await;

        while run.attempts_made < run.max_attempts {
            if !self.generations.is_current(generation) {
                return self.superseded(run).await;
            }

            run.attempts_made += 1;
            self.log.record(
                LogLevel::Info,
                &format!(
                    "Connectivity check attempt {}/{}",
                    run.attempts_made, run.max_attempts
                ),
            ).await;

            if self.probe.is_reachable().await {
                if !self.generations.is_current(generation) {
                    return self.superseded(run).await;
                }
                run.outcome = VerificationOutcome::Verified;
                self.log.record(LogLevel::Success, "Internet connectivity verified!").await;
                self.disable_portal().await;
                return run;
            }

            if run.attempts_made < run.max_attempts {
                sleep(self.settings.retry_delay).await;
            }
        }

        run.outcome = VerificationOutcome::Exhausted;
        self.log.record(
            LogLevel::Warning,
            &format!(
                "Internet connectivity not verified after {} attempts.",
                run.max_attempts
            ),
        ).await;
        self.log.record(
            LogLevel::Warning,
            "Captive portal remains active. WiFi may not have internet access.",
        ).await;
        run
    }

    async fn superseded(&self, mut run: VerificationRun) -> VerificationRun {
        run.outcome = VerificationOutcome::Superseded;
        self.log.record(
            LogLevel::Info,
            &format!(
                "Verification for {} superseded by a newer connection attempt; portal left as is.",
                run.ssid
            ),
        ).await;
        run
    }

    // Called at most once per run. Failures are logged, never retried.
    async fn disable_portal(&self) {
        self.log.record(LogLevel::Info, "Disabling captive portal...").await;
        match self.disabler.disable().await {
            Ok(report) if report.succeeded() => {
                self.log.record(LogLevel::Success, "Captive portal disabled successfully!").await;
                self.log.record(LogLevel::Info, "Normal network access restored.").await;
                let stdout = report.stdout.trim();
                if !stdout.is_empty() {
                    self.log.record(LogLevel::Info, &format!("Script output: {}", stdout)).await;
                }
            }
            Ok(report) => {
                let code = report
                    .exit_code
                    .map_or_else(|| "killed by signal".to_string(), |c| c.to_string());
                self.log.record(
                    LogLevel::Error,
                    &format!("Failed to disable captive portal (exit code {})", code),
                ).await;
                let stderr = report.stderr.trim();
                if !stderr.is_empty() {
                    self.log.record(LogLevel::Error, &format!("Script error: {}", stderr)).await;
                }
            }
            Err(e) => {
                self.log.record(
                    LogLevel::Error,
                    &format!("Could not run portal disable script: {}", e),
                ).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingDisabler, DisableBehaviour, MemoryLog, ScriptedProbe};
    use tokio::time::Instant;

    struct Harness {
        verifier: Arc<Verifier>,
        probe: Arc<ScriptedProbe>,
        disabler: Arc<CountingDisabler>,
        log: Arc<MemoryLog>,
    }

    fn harness(probe: ScriptedProbe, behaviour: DisableBehaviour) -> Harness {
        let probe = Arc::new(probe);
        let disabler = Arc::new(CountingDisabler::new(behaviour));
        let log = Arc::new(MemoryLog::default());
        let verifier = Arc::new(Verifier::new(
            probe.clone(),
            disabler.clone(),
            log.clone(),
            VerifierSettings::default(),
        ));
        Harness {
            verifier,
            probe,
            disabler,
            log,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_failing_exhausts_without_disabling() {
        let h = harness(ScriptedProbe::new(vec![]), DisableBehaviour::Succeed);
        let generation = h.verifier.begin_attempt();
        let started = Instant::now();

        let run = h.verifier.run("Home".into(), generation).await;

        assert_eq!(run.outcome, VerificationOutcome::Exhausted);
        assert_eq!(run.attempts_made, 6);
        assert!(!run.verified());
        assert_eq!(h.probe.calls(), 6);
        assert_eq!(h.disabler.calls(), 0);
        assert!(h.log.has(LogLevel::Warning));
        // settle 5s + five gaps of 5s, none after the last attempt
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_third_attempt_disables_once() {
        let h = harness(ScriptedProbe::succeeding_on(3), DisableBehaviour::Succeed);
        let generation = h.verifier.begin_attempt();
        let started = Instant::now();

        let run = h.verifier.run("Home".into(), generation).await;

        assert_eq!(run.outcome, VerificationOutcome::Verified);
        assert_eq!(run.attempts_made, 3);
        assert_eq!(h.probe.calls(), 3);
        assert_eq!(h.disabler.calls(), 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
        assert!(h.log.has(LogLevel::Success));
        assert!(!h.log.has(LogLevel::Warning));
        assert!(
            h.log
                .entries()
                .iter()
                .any(|(_, m)| m == "Script output: access point removed")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_disable_script_keeps_verified_and_is_not_retried() {
        let h = harness(ScriptedProbe::succeeding_on(1), DisableBehaviour::ExitWith(2));
        let generation = h.verifier.begin_attempt();

        let run = h.verifier.run("Home".into(), generation).await;

        assert!(run.verified());
        assert_eq!(h.disabler.calls(), 1);
        let errors: Vec<String> = h
            .log
            .entries()
            .into_iter()
            .filter(|(l, _)| *l == LogLevel::Error)
            .map(|(_, m)| m)
            .collect();
        assert_eq!(
            errors,
            vec![
                "Failed to disable captive portal (exit code 2)".to_string(),
                "Script error: systemctl: unit not found".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disable_script_that_cannot_start_is_logged() {
        let h = harness(ScriptedProbe::succeeding_on(2), DisableBehaviour::FailToRun);
        let generation = h.verifier.begin_attempt();

        let run = h.verifier.run("Home".into(), generation).await;

        assert!(run.verified());
        assert_eq!(h.disabler.calls(), 1);
        assert!(h.log.has(LogLevel::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_never_probes_or_disables() {
        let h = harness(ScriptedProbe::succeeding_on(1), DisableBehaviour::Succeed);
        let stale = h.verifier.begin_attempt();
        h.verifier.begin_attempt();

        let run = h.verifier.run("Old".into(), stale).await;

        assert_eq!(run.outcome, VerificationOutcome::Superseded);
        assert_eq!(run.attempts_made, 0);
        assert_eq!(h.probe.calls(), 0);
        assert_eq!(h.disabler.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_attempt_mid_run_supersedes() {
        let h = harness(ScriptedProbe::new(vec![false, true]), DisableBehaviour::Succeed);
        let first = h.verifier.begin_attempt();

        let verifier = h.verifier.clone();
        let task = tokio::spawn(async move { verifier.run("First".into(), first).await });

        // attempt 1 happens at t=5s, attempt 2 would be at t=10s
        sleep(Duration::from_secs(7)).await;
        h.verifier.begin_attempt();

        let run = task.await.unwrap();
        assert_eq!(run.outcome, VerificationOutcome::Superseded);
        assert_eq!(run.attempts_made, 1);
        assert_eq!(h.probe.calls(), 1);
        assert_eq!(h.disabler.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_run_completes_in_background() {
        let h = harness(ScriptedProbe::succeeding_on(1), DisableBehaviour::Succeed);
        let generation = h.verifier.begin_attempt();

        h.verifier.spawn("Home".into(), generation);
        assert_eq!(h.probe.calls(), 0);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(h.probe.calls(), 1);
        assert_eq!(h.disabler.calls(), 1);
    }
}
