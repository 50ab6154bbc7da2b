//! Scan collaborator seam and the structured scan report
//!
//! The environment only talks to a [`Scanner`]. [`NmapScanner`] runs the
//! real nmap binary; [`ReplayScanner`] serves canned reports for offline
//! runs and tests. Both produce a [`ScanReport`] keyed by host address.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod nmap;
pub mod parser;
pub mod replay;

pub use nmap::NmapScanner;
pub use parser::parse_nmap_xml;
pub use replay::{ReplayEntry, ReplayScanner, ScanCall, CALL_LOG_LIMIT};

/// External scan collaborator
pub trait Scanner {
    /// Scan `target` with the given nmap-style argument string
    fn scan(&mut self, target: &str, arguments: &str) -> Result<ScanReport>;

    /// Get scanner name
    fn name(&self) -> &str;
}

impl<S: Scanner + ?Sized> Scanner for Box<S> {
    fn scan(&mut self, target: &str, arguments: &str) -> Result<ScanReport> {
        (**self).scan(target, arguments)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Result of one scanner invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Command line reported by the scanner, if any
    pub command_line: String,
    /// Scanned hosts keyed by address
    pub hosts: BTreeMap<String, HostScan>,
}

/// Per-host scan data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostScan {
    pub address: String,
    pub hostnames: Vec<String>,
    /// Host status as reported by nmap ("up", "down")
    pub status: String,
    pub tcp: BTreeMap<u16, PortInfo>,
    pub udp: BTreeMap<u16, PortInfo>,
    /// OS class guesses, best match first
    pub osclass: Vec<OsClass>,
}

/// A single port entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub state: String,
    pub reason: String,
    /// Service name, empty if unknown
    pub name: String,
    /// Product string, empty when no version was fingerprinted
    pub product: String,
    pub version: String,
    pub extrainfo: String,
    pub conf: String,
    pub cpe: String,
}

/// One OS class guess
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsClass {
    /// Device type ("general purpose", "router", ...)
    pub kind: String,
    pub vendor: String,
    pub osfamily: String,
    pub osgen: String,
    pub accuracy: u8,
}

impl ScanReport {
    /// Report containing a single host
    pub fn single(host: HostScan) -> Self {
        let mut hosts = BTreeMap::new();
        hosts.insert(host.address.clone(), host);
        Self {
            command_line: String::new(),
            hosts,
        }
    }

    /// Find a host by address, falling back to its hostnames
    pub fn host(&self, target: &str) -> Option<&HostScan> {
        self.hosts.get(target).or_else(|| {
            self.hosts
                .values()
                .find(|host| host.hostnames.iter().any(|name| name.eq_ignore_ascii_case(target)))
        })
    }
}

impl HostScan {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            status: "up".to_string(),
            ..Default::default()
        }
    }

    /// Add a TCP port entry
    pub fn with_tcp(mut self, port: u16, info: PortInfo) -> Self {
        self.tcp.insert(port, info);
        self
    }

    /// Append an OS class guess
    pub fn with_osclass(mut self, osclass: OsClass) -> Self {
        self.osclass.push(osclass);
        self
    }

    pub fn open_tcp_ports(&self) -> Vec<u16> {
        self.tcp
            .iter()
            .filter(|(_, info)| info.is_open())
            .map(|(port, _)| *port)
            .collect()
    }
}

impl PortInfo {
    /// Port entry with the fields the observation reads
    pub fn new(state: &str, name: &str, product: &str) -> Self {
        Self {
            state: state.to_string(),
            name: name.to_string(),
            product: product.to_string(),
            ..Default::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

impl OsClass {
    pub fn family(osfamily: &str) -> Self {
        Self {
            osfamily: osfamily.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_lookup_by_address_and_hostname() {
        let mut host = HostScan::new("45.33.32.156");
        host.hostnames.push("scanme.nmap.org".to_string());
        let report = ScanReport::single(host);

        assert!(report.host("45.33.32.156").is_some());
        assert!(report.host("SCANME.nmap.org").is_some());
        assert!(report.host("10.0.0.1").is_none());
    }

    #[test]
    fn test_tcp_ports_iterate_in_ascending_order() {
        let host = HostScan::new("127.0.0.1")
            .with_tcp(443, PortInfo::new("open", "https", ""))
            .with_tcp(22, PortInfo::new("open", "ssh", "OpenSSH"))
            .with_tcp(25, PortInfo::new("closed", "smtp", ""));

        let ports: Vec<u16> = host.tcp.keys().copied().collect();
        assert_eq!(ports, vec![22, 25, 443]);
        assert_eq!(host.open_tcp_ports(), vec![22, 443]);
    }
}
