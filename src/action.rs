//! Discrete scan actions and the action space

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven scan strategies an agent can pick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanAction {
    #[default]
    Syn,
    Service,
    OsDetection,
    Aggressive,
    Quick,
    Udp,
    FullPort,
}

impl ScanAction {
    /// Number of distinct actions
    pub const COUNT: usize = 7;

    /// All actions in index order
    pub fn all() -> [ScanAction; Self::COUNT] {
        [
            ScanAction::Syn,
            ScanAction::Service,
            ScanAction::OsDetection,
            ScanAction::Aggressive,
            ScanAction::Quick,
            ScanAction::Udp,
            ScanAction::FullPort,
        ]
    }

    /// Resolve a raw action index. Anything outside 0..=6 is a SYN scan.
    pub fn from_index(index: i64) -> Self {
        match index {
            0 => ScanAction::Syn,
            1 => ScanAction::Service,
            2 => ScanAction::OsDetection,
            3 => ScanAction::Aggressive,
            4 => ScanAction::Quick,
            5 => ScanAction::Udp,
            6 => ScanAction::FullPort,
            _ => ScanAction::Syn,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            ScanAction::Syn => 0,
            ScanAction::Service => 1,
            ScanAction::OsDetection => 2,
            ScanAction::Aggressive => 3,
            ScanAction::Quick => 4,
            ScanAction::Udp => 5,
            ScanAction::FullPort => 6,
        }
    }

    /// nmap arguments for this action
    pub fn arguments(&self) -> &'static str {
        match self {
            ScanAction::Syn => "-sS",
            ScanAction::Service => "-sV",
            ScanAction::OsDetection => "-O",
            ScanAction::Aggressive => "-A",
            ScanAction::Quick => "-T4",
            ScanAction::Udp => "-sU",
            ScanAction::FullPort => "-p 1-65535",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanAction::Syn => "SYN Scan",
            ScanAction::Service => "Service Scan",
            ScanAction::OsDetection => "OS Detection",
            ScanAction::Aggressive => "Aggressive Scan",
            ScanAction::Quick => "Quick Scan",
            ScanAction::Udp => "UDP Scan",
            ScanAction::FullPort => "Full Port Scan",
        }
    }
}

impl fmt::Display for ScanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.arguments())
    }
}

/// Discrete action space over `0..n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub n: usize,
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self {
            n: ScanAction::COUNT,
        }
    }
}

impl ActionSpace {
    /// Draw a uniformly random action index
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(0..self.n as i64)
    }

    pub fn contains(&self, action: i64) -> bool {
        action >= 0 && (action as u64) < self.n as u64
    }
}
