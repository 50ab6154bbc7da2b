//! Nmap integration - runs the nmap binary and parses its XML report

use super::{parse_nmap_xml, ScanReport, Scanner};
use crate::config::{validate_target, NmapConfig};
use crate::{Result, ScanError};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Scanner backed by the nmap executable
#[derive(Debug, Clone)]
pub struct NmapScanner {
    config: NmapConfig,
}

impl Default for NmapScanner {
    fn default() -> Self {
        Self::new(NmapConfig::default())
    }
}

impl NmapScanner {
    /// Create new nmap scanner
    pub fn new(config: NmapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NmapConfig {
        &self.config
    }

    /// Full argument vector passed to nmap, excluding the binary itself
    pub fn command_args(&self, target: &str, arguments: &str) -> Vec<String> {
        // XML report on stdout for parsing
        let mut args = vec!["-oX".to_string(), "-".to_string()];

        args.extend(self.config.extra_args.iter().cloned());

        if let Some(secs) = self.config.host_timeout_secs {
            args.push("--host-timeout".to_string());
            args.push(format!("{}s", secs));
        }

        args.extend(arguments.split_whitespace().map(str::to_string));
        args.push(target.to_string());
        args
    }

    fn execute(&self, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(&self.config.nmap_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ScanError::NmapNotFound(self.config.nmap_path.clone()),
                _ => ScanError::IoError(e),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
        })
    }
}

impl Scanner for NmapScanner {
    fn scan(&mut self, target: &str, arguments: &str) -> Result<ScanReport> {
        validate_target(target)?;

        let args = self.command_args(target, arguments);
        info!("Starting nmap scan of {} with {:?}", target, arguments);
        debug!("Executing {} with args: {:?}", self.config.nmap_path, args);

        let start_time = Instant::now();
        let output = self.execute(&args)?;
        debug!("nmap finished in {:?}", start_time.elapsed());

        if !output.success && output.stdout.trim().is_empty() {
            return Err(ScanError::NmapFailed {
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        if !output.stderr.trim().is_empty() {
            warn!("nmap stderr: {}", output.stderr.trim());
        }

        parse_nmap_xml(&output.stdout)
    }

    fn name(&self) -> &str {
        "nmap"
    }
}

/// Command execution output
#[derive(Debug)]
struct CommandOutput {
    stdout: String,
    stderr: String,
    success: bool,
    exit_code: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_for_syn_scan() {
        let scanner = NmapScanner::default();
        assert_eq!(
            scanner.command_args("127.0.0.1", "-sS"),
            vec!["-oX", "-", "-sS", "127.0.0.1"]
        );
    }

    #[test]
    fn test_command_args_split_full_port_range() {
        let scanner = NmapScanner::new(NmapConfig {
            extra_args: vec!["-Pn".to_string(), "-n".to_string()],
            host_timeout_secs: Some(300),
            ..Default::default()
        });
        assert_eq!(
            scanner.command_args("10.0.0.7", "-p 1-65535"),
            vec!["-oX", "-", "-Pn", "-n", "--host-timeout", "300s", "-p", "1-65535", "10.0.0.7"]
        );
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let mut scanner = NmapScanner::new(NmapConfig {
            nmap_path: "/nonexistent/scangym-nmap".to_string(),
            ..Default::default()
        });
        let err = scanner.scan("127.0.0.1", "-sS").unwrap_err();
        assert!(matches!(err, ScanError::NmapNotFound(_)));
    }

    #[test]
    fn test_option_like_target_is_rejected_before_exec() {
        let mut scanner = NmapScanner::new(NmapConfig {
            nmap_path: "/nonexistent/scangym-nmap".to_string(),
            ..Default::default()
        });
        let err = scanner.scan("--script=evil", "-sS").unwrap_err();
        assert!(matches!(err, ScanError::InvalidTarget(_)));
    }
}
