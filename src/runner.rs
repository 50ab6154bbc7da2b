//! Random-agent episode loop

use crate::env::{ScanEnvironment, StepResult};
use crate::scanner::Scanner;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Why an episode stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    /// Enough open ports were found
    Terminated,
    /// The scanner failed and the environment reset itself
    ScanFailed,
    /// The step limit was reached first
    StepLimit,
}

/// Totals for one finished episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: f64,
    pub outcome: EpisodeOutcome,
}

/// Per-step record handed to the progress callback
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord<'a> {
    /// 1-based step number within the episode
    pub step: usize,
    pub action: i64,
    pub result: &'a StepResult,
}

/// Run one episode with uniformly random actions.
///
/// Without `max_steps` the loop only ends when the environment reports
/// `done`.
pub fn run_episode<S, R, F>(
    env: &mut ScanEnvironment<S>,
    rng: &mut R,
    max_steps: Option<usize>,
    mut on_step: F,
) -> EpisodeSummary
where
    S: Scanner,
    R: Rng + ?Sized,
    F: FnMut(&StepRecord<'_>),
{
    env.reset();

    let mut steps = 0;
    let mut total_reward = 0.0;

    loop {
        if max_steps.is_some_and(|limit| steps >= limit) {
            return EpisodeSummary {
                steps,
                total_reward,
                outcome: EpisodeOutcome::StepLimit,
            };
        }

        let action = env.action_space().sample(rng);
        let result = env.step(action);
        steps += 1;
        total_reward += result.reward;

        on_step(&StepRecord {
            step: steps,
            action,
            result: &result,
        });

        if result.done {
            let outcome = if result.info.failure.is_some() {
                EpisodeOutcome::ScanFailed
            } else {
                EpisodeOutcome::Terminated
            };
            return EpisodeSummary {
                steps,
                total_reward,
                outcome,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{HostScan, PortInfo, ReplayScanner, ScanReport};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn report(open: u16) -> ScanReport {
        let mut host = HostScan::new("127.0.0.1");
        for i in 0..open {
            host = host.with_tcp(8000 + i, PortInfo::new("open", "http", "nginx"));
        }
        ScanReport::single(host)
    }

    #[test]
    fn test_episode_terminates_when_done() {
        let scanner = ReplayScanner::from_reports(vec![report(1), report(2), report(6)]);
        let mut env = ScanEnvironment::new("127.0.0.1", scanner).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let mut seen = Vec::new();
        let summary = run_episode(&mut env, &mut rng, None, |record| seen.push(record.step));

        assert_eq!(summary.outcome, EpisodeOutcome::Terminated);
        assert_eq!(summary.steps, 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_step_limit() {
        let scanner = ReplayScanner::from_reports(vec![report(1)]).cycling();
        let mut env = ScanEnvironment::new("127.0.0.1", scanner).unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        let summary = run_episode(&mut env, &mut rng, Some(4), |_| {});
        assert_eq!(summary.outcome, EpisodeOutcome::StepLimit);
        assert_eq!(summary.steps, 4);
        assert_eq!(env.scanner().calls().len(), 4);
    }

    #[test]
    fn test_scan_failure_ends_episode() {
        let mut scanner = ReplayScanner::default();
        scanner.push_failure("Failed to resolve target");
        let mut env = ScanEnvironment::new("127.0.0.1", scanner).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let summary = run_episode(&mut env, &mut rng, None, |_| {});
        assert_eq!(summary.outcome, EpisodeOutcome::ScanFailed);
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.total_reward, 0.0);
    }
}
