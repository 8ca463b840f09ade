use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The result for one changed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Written { source: String, destination: PathBuf },
    Printed { source: String },
    NoTestNeeded { source: String },
    Skipped { source: String, reason: String },
    /// The model call failed for this file only
    Failed { source: String, error: String },
}

impl FileOutcome {
    pub fn source(&self) -> &str {
        match self {
            Self::Written { source, .. }
            | Self::Printed { source }
            | Self::NoTestNeeded { source }
            | Self::Skipped { source, .. }
            | Self::Failed { source, .. } => source,
        }
    }
}

/// The final outcome of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub range: String,
    pub files: Vec<FileOutcome>,
    /// Remote calls attempted, successful or not
    pub remote_calls: usize,
    /// Stopped by Ctrl+C before all files were processed
    pub interrupted: bool,
    pub total_duration_secs: f64,
}

impl RunReport {
    pub fn new(range: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            files: Vec::new(),
            remote_calls: 0,
            interrupted: false,
            total_duration_secs: 0.0,
        }
    }

    pub fn push(&mut self, outcome: FileOutcome) {
        self.files.push(outcome);
    }

    pub fn finish(&mut self, duration: Duration) {
        self.total_duration_secs = duration.as_secs_f64();
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written { .. }))
    }

    pub fn printed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Printed { .. }))
    }

    pub fn no_test_needed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::NoTestNeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed() == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|o| pred(o)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_succeeds() {
        let report = RunReport::new("HEAD..working tree");
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_failures_set_exit_code() {
        let mut report = RunReport::new("a..b");
        report.push(FileOutcome::Written {
            source: "a.py".into(),
            destination: PathBuf::from("tests/test_a.py"),
        });
        report.push(FileOutcome::Failed {
            source: "b.py".into(),
            error: "HTTP 500".into(),
        });

        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.files[1].source(), "b.py");
    }

    #[test]
    fn test_interrupted_exit_code() {
        let mut report = RunReport::new("a..b");
        report.interrupted = true;
        assert_eq!(report.exit_code(), 130);
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let mut report = RunReport::new("a..b");
        report.push(FileOutcome::Skipped {
            source: "big.py".into(),
            reason: "diff too large".into(),
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["status"], "skipped");
        assert_eq!(json["files"][0]["source"], "big.py");
    }
}
