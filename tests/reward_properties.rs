//! Property tests for reward, termination and observation bounds

use proptest::prelude::*;
use scangym::{
    scanner::{HostScan, OsClass, PortInfo},
    Observation, ObservationSpace, RewardComputer, RewardConfig,
};

fn port_entry() -> impl Strategy<Value = (u16, bool, String, String)> {
    (
        any::<u16>(),
        any::<bool>(),
        "[a-z-]{0,12}",
        prop_oneof![Just(String::new()), "[A-Za-z ]{1,16}"],
    )
}

fn host_strategy() -> impl Strategy<Value = HostScan> {
    (
        prop::collection::vec(port_entry(), 0..30),
        prop::option::of("[A-Za-z]{0,10}"),
    )
        .prop_map(|(entries, family)| {
            let mut host = HostScan::new("127.0.0.1");
            for (port, open, name, product) in entries {
                let state = if open { "open" } else { "closed" };
                host = host.with_tcp(port, PortInfo::new(state, &name, &product));
            }
            if let Some(family) = family {
                host = host.with_osclass(OsClass::family(&family));
            }
            host
        })
}

proptest! {
    #[test]
    fn reward_matches_formula(host in host_strategy(), capacity in 1usize..16) {
        let obs = Observation::from_host(&host, capacity);
        let config = RewardConfig::default();

        let open = obs.port_states.iter().filter(|s| **s == 1).count() as f64;
        let services = obs.services.iter().filter(|s| **s > 0).count() as f64;
        let unversioned = obs.versions.iter().filter(|v| **v == 0).count() as f64;

        let reward = RewardComputer::compute(&obs, &config);
        prop_assert_eq!(reward, 10.0 * open + 5.0 * services + 20.0 * unversioned);
        prop_assert!(reward >= 0.0);
    }

    #[test]
    fn done_iff_five_open(host in host_strategy()) {
        let obs = Observation::from_host(&host, 10);
        let open = obs.port_states.iter().filter(|s| **s == 1).count();
        prop_assert_eq!(RewardComputer::is_done(&obs, &RewardConfig::default()), open >= 5);
    }

    #[test]
    fn observation_within_bounds(host in host_strategy(), capacity in 1usize..16) {
        let obs = Observation::from_host(&host, capacity);
        let space = ObservationSpace::new(capacity);

        prop_assert!(space.contains(&obs));
        prop_assert!(obs.slots_used <= capacity);
        prop_assert_eq!(obs.slots_used, host.tcp.len().min(capacity));
        prop_assert!(obs.script_outputs.iter().all(|s| *s == 0));
        prop_assert_eq!(obs.flatten().len(), space.flat_len());
    }

    #[test]
    fn strict_bonus_never_exceeds_padded(host in host_strategy()) {
        let obs = Observation::from_host(&host, 10);
        let padded = RewardComputer::compute(&obs, &RewardConfig::default());
        let strict = RewardComputer::compute(&obs, &RewardConfig {
            count_padding_versions: false,
            ..RewardConfig::default()
        });
        prop_assert!(strict <= padded);
        prop_assert_eq!(padded - strict, 20.0 * (10 - obs.slots_used) as f64);
    }
}
