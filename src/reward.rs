//! Reward and termination for scan observations.

use crate::config::RewardConfig;
use crate::observation::{Observation, PORT_OPEN};

/// Computes rewards for the scan environment.
pub struct RewardComputer;

impl RewardComputer {
    /// Reward for a single observation.
    ///
    /// # Components
    ///
    /// 1. **Open ports**: `open_port_reward` per slot in the open state.
    /// 2. **Services**: `service_reward` per slot with a non-zero service bucket.
    /// 3. **Vulnerability bonus**: `vulnerability_bonus` per slot whose product
    ///    bucket is zero, i.e. a service nmap could not fingerprint. Unused
    ///    padding slots count too unless `count_padding_versions` is off.
    pub fn compute(observation: &Observation, config: &RewardConfig) -> f64 {
        let open = observation.open_count();
        let services = observation.services.iter().filter(|s| **s > 0).count();

        let considered = if config.count_padding_versions {
            observation.versions.len()
        } else {
            observation.slots_used
        };
        let unversioned = observation
            .versions
            .iter()
            .take(considered)
            .filter(|v| **v == 0)
            .count();

        config.open_port_reward * open as f64
            + config.service_reward * services as f64
            + config.vulnerability_bonus * unversioned as f64
    }

    /// Episode ends once enough open ports are observed.
    pub fn is_done(observation: &Observation, config: &RewardConfig) -> bool {
        observation
            .port_states
            .iter()
            .filter(|s| **s == PORT_OPEN)
            .count()
            >= config.done_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{HostScan, PortInfo};

    fn host_with_open_ports(count: u16) -> HostScan {
        let mut host = HostScan::new("127.0.0.1");
        for i in 0..count {
            host = host.with_tcp(1000 + i, PortInfo::new("open", "", ""));
        }
        host
    }

    #[test]
    fn test_zero_observation_reward_counts_padding() {
        let config = RewardConfig::default();
        let obs = Observation::zeros(10);
        assert_eq!(RewardComputer::compute(&obs, &config), 200.0);
        assert!(!RewardComputer::is_done(&obs, &config));
    }

    #[test]
    fn test_example_reward() {
        // ssh -> 55, http -> 72; product "" -> 0, "nginx" -> 3
        let host = HostScan::new("127.0.0.1")
            .with_tcp(22, PortInfo::new("open", "ssh", ""))
            .with_tcp(80, PortInfo::new("open", "http", "nginx"));
        let obs = Observation::from_host(&host, 10);

        let config = RewardConfig::default();
        // 2 open, 2 services, 9 zero versions (1 real + 8 padding)
        assert_eq!(RewardComputer::compute(&obs, &config), 20.0 + 10.0 + 180.0);

        let strict = RewardConfig {
            count_padding_versions: false,
            ..RewardConfig::default()
        };
        assert_eq!(RewardComputer::compute(&obs, &strict), 20.0 + 10.0 + 20.0);
    }

    #[test]
    fn test_done_boundary() {
        let config = RewardConfig::default();
        let four = Observation::from_host(&host_with_open_ports(4), 10);
        let five = Observation::from_host(&host_with_open_ports(5), 10);
        assert!(!RewardComputer::is_done(&four, &config));
        assert!(RewardComputer::is_done(&five, &config));
    }
}
