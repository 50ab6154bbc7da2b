//! Error handling for scangym
//!
//! Every failure of the external scan collaborator is a `ScanError`. The
//! environment swallows these at the `step()` boundary, so callers of the
//! environment only see them through `StepInfo::failure` and
//! `StepInfo::failure_kind`.

use thiserror::Error;

/// Main error type for scanning and configuration
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("nmap binary not found: {0}")]
    NmapNotFound(String),

    #[error("nmap exited with status {status:?}: {stderr}")]
    NmapFailed {
        status: Option<i32>,
        stderr: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Host {0} not present in scan report")]
    HostNotFound(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Replay scanner has no more scan reports")]
    ReplayExhausted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    /// True when the failure came from the nmap process itself rather than
    /// from parsing or configuration.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            ScanError::NmapNotFound(_) | ScanError::NmapFailed { .. } | ScanError::IoError(_)
        )
    }
}

impl From<quick_xml::Error> for ScanError {
    fn from(e: quick_xml::Error) -> Self {
        ScanError::ParseError(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ScanError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ScanError::ParseError(e.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(e: toml::de::Error) -> Self {
        ScanError::ConfigError(format!("Failed to parse TOML: {}", e))
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(e: toml::ser::Error) -> Self {
        ScanError::ConfigError(format!("Config serialization error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failure_classification() {
        let failed = ScanError::NmapFailed {
            status: Some(1),
            stderr: "QUITTING!".to_string(),
        };
        assert!(failed.is_process_failure());
        assert!(ScanError::NmapNotFound("nmap".to_string()).is_process_failure());
        assert!(!ScanError::ParseError("bad xml".to_string()).is_process_failure());
        assert!(!ScanError::ReplayExhausted.is_process_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = ScanError::HostNotFound("10.0.0.1".to_string());
        assert_eq!(err.to_string(), "Host 10.0.0.1 not present in scan report");
    }
}
