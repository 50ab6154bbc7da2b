//! Replay scanner - serves prepared scan reports instead of running nmap

use super::{parse_nmap_xml, ScanReport, Scanner};
use crate::{Result, ScanError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// A queued response
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEntry {
    Report(ScanReport),
    /// Scripted failure carrying the error message
    Failure(String),
}

/// One recorded scanner invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCall {
    pub target: String,
    pub arguments: String,
}

/// Calls kept in the log before the oldest are dropped
pub const CALL_LOG_LIMIT: usize = 1024;

/// Scanner that answers from a queue of prepared entries
#[derive(Debug, Clone)]
pub struct ReplayScanner {
    entries: VecDeque<ReplayEntry>,
    cycle: bool,
    calls: VecDeque<ScanCall>,
    call_limit: usize,
}

impl Default for ReplayScanner {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReplayScanner {
    pub fn new(entries: Vec<ReplayEntry>) -> Self {
        Self {
            entries: entries.into(),
            cycle: false,
            calls: VecDeque::new(),
            call_limit: CALL_LOG_LIMIT,
        }
    }

    /// Queue of successful reports
    pub fn from_reports(reports: Vec<ScanReport>) -> Self {
        Self::new(reports.into_iter().map(ReplayEntry::Report).collect())
    }

    /// Load reports from saved `nmap -oX` files
    pub fn from_xml_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let xml = fs::read_to_string(path.as_ref())?;
            reports.push(parse_nmap_xml(&xml)?);
        }
        Ok(Self::from_reports(reports))
    }

    /// Serve the entries round-robin instead of running out
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Keep at most `limit` calls in the log; zero disables logging
    pub fn with_call_log_limit(mut self, limit: usize) -> Self {
        self.call_limit = limit;
        while self.calls.len() > limit {
            self.calls.pop_front();
        }
        self
    }

    pub fn push_report(&mut self, report: ScanReport) {
        self.entries.push_back(ReplayEntry::Report(report));
    }

    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.entries.push_back(ReplayEntry::Failure(message.into()));
    }

    /// The most recent `(target, arguments)` pairs, oldest first
    pub fn calls(&self) -> &VecDeque<ScanCall> {
        &self.calls
    }

    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Scanner for ReplayScanner {
    fn scan(&mut self, target: &str, arguments: &str) -> Result<ScanReport> {
        if self.call_limit > 0 {
            while self.calls.len() >= self.call_limit {
                self.calls.pop_front();
            }
            self.calls.push_back(ScanCall {
                target: target.to_string(),
                arguments: arguments.to_string(),
            });
        }

        let entry = self.entries.pop_front().ok_or(ScanError::ReplayExhausted)?;
        if self.cycle {
            self.entries.push_back(entry.clone());
        }

        debug!("Replaying scan of {} ({})", target, arguments);
        match entry {
            ReplayEntry::Report(report) => Ok(report),
            ReplayEntry::Failure(message) => Err(ScanError::NmapFailed {
                status: None,
                stderr: message,
            }),
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}
