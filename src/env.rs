//! Scan environment with a reset/step interface.
//!
//! Each step runs one scan strategy against the target host, turns the
//! report into an [`Observation`] and scores it with [`RewardComputer`].

use crate::action::{ActionSpace, ScanAction};
use crate::config::EnvConfig;
use crate::observation::{Observation, ObservationSpace};
use crate::reward::RewardComputer;
use crate::scanner::{NmapScanner, ScanReport, Scanner};
use crate::{Result, ScanError};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

/// Where a failed step broke down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// nmap could not be started or exited with an error
    Process,
    /// A report came back but was unusable or did not cover the target
    Report,
}

impl From<&ScanError> for FailureKind {
    fn from(e: &ScanError) -> Self {
        if e.is_process_failure() {
            FailureKind::Process
        } else {
            FailureKind::Report
        }
    }
}

/// Diagnostic information attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Set when the scan failed and the episode was force-terminated
    pub failure: Option<String>,
    pub failure_kind: Option<FailureKind>,
    /// TCP entries that did not fit in the observation
    pub ports_dropped: usize,
}

impl StepInfo {
    fn failed(e: &ScanError) -> Self {
        Self {
            failure: Some(e.to_string()),
            failure_kind: Some(FailureKind::from(e)),
            ports_dropped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failure.is_none() && self.ports_dropped == 0
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// Whether the episode is over
    pub done: bool,
    pub info: StepInfo,
}

/// One logged scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Action index as passed to `step`
    pub action: i64,
    pub scan: ScanAction,
    pub report: ScanReport,
    pub recorded_at: DateTime<Utc>,
}

/// Reinforcement-learning environment around a scanner.
///
/// # Lifecycle
///
/// 1. Build with [`ScanEnvironment::new`] or [`ScanEnvironment::with_config`].
/// 2. Call [`ScanEnvironment::reset`] to start an episode.
/// 3. Call [`ScanEnvironment::step`] until `done`.
///
/// A failed scan never surfaces as an error: the environment resets itself
/// and reports a terminal step with zero reward.
#[derive(Debug)]
pub struct ScanEnvironment<S: Scanner = NmapScanner> {
    target: String,
    scanner: S,
    config: EnvConfig,
    history: Vec<HistoryEntry>,
    action_space: ActionSpace,
    observation_space: ObservationSpace,
}

impl ScanEnvironment<NmapScanner> {
    /// Environment backed by nmap, configured from `config`
    pub fn nmap(config: EnvConfig) -> Result<Self> {
        let scanner = NmapScanner::new(config.nmap.clone());
        Self::with_config(config, scanner)
    }
}

impl<S: Scanner> ScanEnvironment<S> {
    /// Environment with default settings for `target`
    pub fn new(target: impl Into<String>, scanner: S) -> Result<Self> {
        Self::with_config(EnvConfig::new(target), scanner)
    }

    /// Environment from a validated configuration
    pub fn with_config(config: EnvConfig, scanner: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            target: config.target.clone(),
            observation_space: ObservationSpace::new(config.max_ports),
            action_space: ActionSpace::default(),
            scanner,
            config,
            history: Vec::new(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    /// Clear history and return the zero observation.
    pub fn reset(&mut self) -> Observation {
        self.history.clear();
        Observation::zeros(self.config.max_ports)
    }

    /// Run the scan selected by `action` and score the result.
    pub fn step(&mut self, action: i64) -> StepResult {
        let scan = ScanAction::from_index(action);

        match self.run_scan(action, scan) {
            Ok(result) => result,
            Err(e) => {
                error!("Scan failed: {}", e);
                let observation = self.reset();
                StepResult {
                    observation,
                    reward: 0.0,
                    done: true,
                    info: StepInfo::failed(&e),
                }
            }
        }
    }

    fn run_scan(&mut self, action: i64, scan: ScanAction) -> Result<StepResult> {
        info!("Step action {} -> {} against {}", action, scan, self.target);
        let report = self.scanner.scan(&self.target, scan.arguments())?;

        let host = report
            .host(&self.target)
            .ok_or_else(|| ScanError::HostNotFound(self.target.clone()))?;

        let capacity = self.config.max_ports;
        let observation = Observation::from_host(host, capacity);
        let ports_dropped = host.tcp.len().saturating_sub(capacity);
        let reward = RewardComputer::compute(&observation, &self.config.reward);
        let done = RewardComputer::is_done(&observation, &self.config.reward);

        debug!(
            "Observed {} ports ({} open), reward {}, done {}",
            observation.slots_used,
            observation.open_count(),
            reward,
            done
        );

        self.history.push(HistoryEntry {
            action,
            scan,
            report,
            recorded_at: Utc::now(),
        });

        Ok(StepResult {
            observation,
            reward,
            done,
            info: StepInfo {
                ports_dropped,
                ..StepInfo::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{HostScan, PortInfo, ReplayScanner};

    #[test]
    fn test_reset_clears_history() {
        let report = ScanReport::single(
            HostScan::new("127.0.0.1").with_tcp(22, PortInfo::new("open", "ssh", "OpenSSH")),
        );
        let mut env = ScanEnvironment::new("127.0.0.1", ReplayScanner::from_reports(vec![report])).unwrap();

        let result = env.step(1);
        assert!(result.info.is_empty());
        assert_eq!(env.history().len(), 1);
        assert_eq!(env.history()[0].scan, ScanAction::Service);

        assert!(env.reset().is_zero());
        assert!(env.history().is_empty());
    }

    #[test]
    fn test_missing_host_is_a_scan_failure() {
        let report = ScanReport::single(HostScan::new("10.9.9.9"));
        let mut env = ScanEnvironment::new("127.0.0.1", ReplayScanner::from_reports(vec![report])).unwrap();

        let result = env.step(0);
        assert!(result.done);
        assert_eq!(result.reward, 0.0);
        assert!(result.observation.is_zero());
        assert_eq!(result.info.failure_kind, Some(FailureKind::Report));
        assert!(result.info.failure.unwrap().contains("127.0.0.1"));
        assert!(env.history().is_empty());
    }

    #[test]
    fn test_with_config_validates() {
        let config = EnvConfig::new("127.0.0.1").with_max_ports(0);
        assert!(ScanEnvironment::with_config(config, ReplayScanner::default()).is_err());
    }

    #[test]
    fn test_new_rejects_bad_targets() {
        for target in ["", "-oN /tmp/out", " 127.0.0.1", "127.0.0.1\n"] {
            assert!(
                matches!(
                    ScanEnvironment::new(target, ReplayScanner::default()),
                    Err(ScanError::InvalidTarget(_))
                ),
                "accepted {:?}",
                target
            );
        }
    }
}
