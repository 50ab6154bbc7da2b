//! scangym - nmap scan strategies as a reinforcement-learning environment
//!
//! An agent picks one of seven nmap scan strategies per step; the scan
//! report is flattened into a fixed-width observation and scored by open
//! ports, identified services and unfingerprinted services.

pub mod action;
pub mod config;
pub mod env;
pub mod error;
pub mod observation;
pub mod reward;
pub mod runner;
pub mod scanner;

// Re-export commonly used types
pub use action::{ActionSpace, ScanAction};
pub use config::{EnvConfig, NmapConfig, RewardConfig};
pub use env::{FailureKind, HistoryEntry, ScanEnvironment, StepInfo, StepResult};
pub use error::ScanError;
pub use observation::{bucket, Observation, ObservationSpace};
pub use reward::RewardComputer;
pub use runner::{run_episode, EpisodeOutcome, EpisodeSummary};
pub use scanner::{NmapScanner, ReplayScanner, ScanReport, Scanner};

pub type Result<T> = std::result::Result<T, ScanError>;
