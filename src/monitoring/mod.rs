//! Prometheus status file for the on-call rotation
//!
//! Writes a node-exporter textfile with one `oncall_rotation_status` gauge
//! per roster member: `1` for the person on duty, `0` for everyone else.
//!
//! ```text
//! # HELP oncall_rotation_status Positive if oncall.
//! # TYPE oncall_rotation_status gauge
//! oncall_rotation_status{oncaller="ab",scripthost="ops1",scriptname="onduty"} 1
//! oncall_rotation_status{oncaller="cd",scripthost="ops1",scriptname="onduty"} 0
//! ```

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::path::Path;

use crate::scheduler::roster::Roster;

/// Gauge name
pub const METRIC_NAME: &str = "oncall_rotation_status";

/// Gauge help text
pub const METRIC_HELP: &str = "Positive if oncall.";

/// Errors from rendering or writing the status file
#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    /// Metric registration or encoding failed
    #[error("Metrics error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Encoded output was not UTF-8
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Writing the file failed
    #[error("Failed to write status file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for monitoring operations
pub type MonitoringResult<T> = Result<T, MonitoringError>;

/// Labels identifying the host and program writing the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabels {
    /// Short host name
    pub host: String,
    /// Program base name
    pub script: String,
}

impl StatusLabels {
    /// Labels with explicit values
    pub fn new(host: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            script: script.into(),
        }
    }

    /// Labels of the running process
    pub fn current() -> Self {
        Self::new(crate::utils::short_hostname(), crate::utils::script_name())
    }
}

/// Render the status gauge in Prometheus text format
///
/// `oncaller` is compared case-insensitively; a code outside the roster
/// (the shadow, for example) leaves every gauge at zero.
pub fn render_status(
    roster: &Roster,
    oncaller: Option<&str>,
    labels: &StatusLabels,
) -> MonitoringResult<String> {
    let registry = Registry::new();
    let gauge = GaugeVec::new(
        Opts::new(METRIC_NAME, METRIC_HELP),
        &["scripthost", "oncaller", "scriptname"],
    )?;
    registry.register(Box::new(gauge.clone()))?;

    let current = oncaller.map(str::to_lowercase);
    for person in roster.people() {
        let value = if current.as_deref() == Some(person.code.as_str()) {
            1.0
        } else {
            0.0
        };
        gauge
            .with_label_values(&[labels.host.as_str(), person.code.as_str(), labels.script.as_str()])
            .set(value);
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Write the status file, replacing it atomically
pub fn write_status_file(
    path: &Path,
    roster: &Roster,
    oncaller: Option<&str>,
    labels: &StatusLabels,
) -> MonitoringResult<()> {
    let rendered = render_status(roster, oncaller, labels)?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    std::fs::write(&staging, rendered)?;
    std::fs::rename(&staging, path)?;

    tracing::info!(path = %path.display(), oncaller = ?oncaller, "Monitoring file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::roster::Person;

    fn roster() -> Roster {
        Roster::new(vec![Person::new(0, "ab"), Person::new(1, "cd")], "xx").unwrap()
    }

    fn labels() -> StatusLabels {
        StatusLabels::new("ops1", "onduty")
    }

    #[test]
    fn test_render_marks_oncaller() {
        let text = render_status(&roster(), Some("AB"), &labels()).unwrap();

        assert!(text.contains("# HELP oncall_rotation_status Positive if oncall."));
        assert!(text.contains("# TYPE oncall_rotation_status gauge"));
        assert!(text.contains(
            r#"oncall_rotation_status{oncaller="ab",scripthost="ops1",scriptname="onduty"} 1"#
        ));
        assert!(text.contains(
            r#"oncall_rotation_status{oncaller="cd",scripthost="ops1",scriptname="onduty"} 0"#
        ));
    }

    #[test]
    fn test_render_shadow_all_zero() {
        let text = render_status(&roster(), Some("xx"), &labels()).unwrap();
        assert!(!text.lines().any(|l| l.ends_with(" 1")));
        assert_eq!(text.lines().filter(|l| l.ends_with(" 0")).count(), 2);
    }

    #[test]
    fn test_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oncall.prom");
        std::fs::write(&path, "stale").unwrap();

        write_status_file(&path, &roster(), Some("cd"), &labels()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains(r#"oncaller="cd",scripthost="ops1",scriptname="onduty"} 1"#));
        assert!(!dir.path().join("oncall.prom.tmp").exists());
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("oncall.prom");
        let err = write_status_file(&path, &roster(), None, &labels()).unwrap_err();
        assert!(matches!(err, MonitoringError::Io(_)));
    }

    #[test]
    fn test_current_labels() {
        let labels = StatusLabels::current();
        assert!(!labels.host.contains('.'));
        assert!(!labels.script.is_empty());
    }
}
