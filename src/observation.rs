//! Fixed-width observation record and its encoding
//!
//! A scan report is flattened into parallel per-slot arrays. Strings are
//! encoded with [`bucket`], a SHA-256 based hash reduced modulo
//! [`BUCKETS`], so observations are identical across runs and processes.

use crate::scanner::HostScan;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hash buckets for encoded strings
pub const BUCKETS: u64 = 100;

/// Port state codes
pub const PORT_CLOSED: u8 = 0;
pub const PORT_OPEN: u8 = 1;
/// Declared in the observation space; extraction never emits it
pub const PORT_FILTERED: u8 = 2;

/// Encode a string into `0..BUCKETS`.
///
/// The empty string (no name, no product) always encodes to 0.
pub fn bucket(value: &str) -> u8 {
    if value.is_empty() {
        return 0;
    }
    let digest = Sha256::digest(value.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(head) % BUCKETS) as u8
}

/// One observation of the scanned host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Port numbers of the tracked TCP entries
    pub open_ports: Vec<u16>,
    /// Service name buckets
    pub services: Vec<u8>,
    /// Product string buckets
    pub versions: Vec<u8>,
    /// OS family bucket of the first OS class guess
    pub os_guess: u8,
    /// [`PORT_CLOSED`] or [`PORT_OPEN`] per slot
    pub port_states: Vec<u8>,
    /// Reserved for script output encoding, always zero
    pub script_outputs: Vec<u8>,
    /// Slots filled from the scan; the rest is padding
    pub slots_used: usize,
}

impl Observation {
    /// All-zero observation with `capacity` slots
    pub fn zeros(capacity: usize) -> Self {
        Self {
            open_ports: vec![0; capacity],
            services: vec![0; capacity],
            versions: vec![0; capacity],
            os_guess: 0,
            port_states: vec![PORT_CLOSED; capacity],
            script_outputs: vec![0; capacity],
            slots_used: 0,
        }
    }

    /// Build an observation from one host's scan data.
    ///
    /// TCP entries are taken in ascending port order; entries past
    /// `capacity` are dropped.
    pub fn from_host(host: &HostScan, capacity: usize) -> Self {
        let mut observation = Self::zeros(capacity);

        for (slot, (port, info)) in host.tcp.iter().take(capacity).enumerate() {
            observation.open_ports[slot] = *port;
            observation.port_states[slot] = if info.is_open() { PORT_OPEN } else { PORT_CLOSED };
            observation.services[slot] = bucket(&info.name);
            observation.versions[slot] = bucket(&info.product);
            observation.slots_used = slot + 1;
        }

        if let Some(first) = host.osclass.first() {
            observation.os_guess = bucket(&first.osfamily);
        }

        observation
    }

    pub fn capacity(&self) -> usize {
        self.open_ports.len()
    }

    pub fn open_count(&self) -> usize {
        self.port_states.iter().filter(|s| **s == PORT_OPEN).count()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zeros(self.capacity())
    }

    /// Flat feature vector: ports, services, versions, os_guess,
    /// port_states, script_outputs.
    pub fn flatten(&self) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.capacity() * 5 + 1);
        features.extend(self.open_ports.iter().map(|p| *p as f64));
        features.extend(self.services.iter().map(|s| *s as f64));
        features.extend(self.versions.iter().map(|v| *v as f64));
        features.push(self.os_guess as f64);
        features.extend(self.port_states.iter().map(|s| *s as f64));
        features.extend(self.script_outputs.iter().map(|s| *s as f64));
        features
    }
}

/// Declared bounds of every observation field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub capacity: usize,
    pub max_port: u16,
    pub max_bucket: u8,
    pub max_port_state: u8,
}

impl ObservationSpace {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            max_port: u16::MAX,
            max_bucket: (BUCKETS - 1) as u8,
            max_port_state: PORT_FILTERED,
        }
    }

    /// Length of [`Observation::flatten`] for this space
    pub fn flat_len(&self) -> usize {
        self.capacity * 5 + 1
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        let sized = [
            observation.open_ports.len(),
            observation.services.len(),
            observation.versions.len(),
            observation.port_states.len(),
            observation.script_outputs.len(),
        ]
        .iter()
        .all(|len| *len == self.capacity);

        sized
            && observation.slots_used <= self.capacity
            && observation.open_ports.iter().all(|p| *p <= self.max_port)
            && observation.services.iter().all(|s| *s <= self.max_bucket)
            && observation.versions.iter().all(|v| *v <= self.max_bucket)
            && observation.script_outputs.iter().all(|s| *s <= self.max_bucket)
            && observation.os_guess <= self.max_bucket
            && observation.port_states.iter().all(|s| *s <= self.max_port_state)
    }
}
