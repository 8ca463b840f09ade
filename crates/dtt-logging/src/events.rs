use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for a test generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        range: String,
        working_dir: PathBuf,
        files: usize,
    },
    /// More files than the configured warning threshold
    LargeBatch {
        files: usize,
        limit: usize,
    },
    FileStarted {
        index: usize,
        total: usize,
        path: String,
        kind: String,
        insertions: usize,
        deletions: usize,
    },
    ModelResponded {
        index: usize,
        path: String,
        duration_secs: f64,
    },
    TestWritten {
        index: usize,
        path: String,
        destination: PathBuf,
    },
    TestPrinted {
        index: usize,
        path: String,
    },
    NoTestNeeded {
        index: usize,
        path: String,
    },
    FileSkipped {
        index: usize,
        path: String,
        reason: String,
    },
    FileFailed {
        index: usize,
        path: String,
        error: String,
    },
    RunInterrupted {
        processed: usize,
        total: usize,
    },
    RunCompleted {
        files: usize,
        written: usize,
        printed: usize,
        no_test_needed: usize,
        skipped: usize,
        failed: usize,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for dtt events - handles both console output and file logging.
///
/// Console output goes to stderr so stdout stays reserved for generated code.
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        let mut stderr = std::io::stderr();
        match self.format {
            LogFormat::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    let _ = writeln!(stderr, "{}", json);
                }
            }
            LogFormat::Pretty => {
                for line in Self::pretty_lines(event) {
                    let _ = writeln!(stderr, "{}", line);
                }
            }
            LogFormat::Compact => {
                let _ = writeln!(stderr, "{}", Self::compact_line(event));
            }
        }
    }

    fn pretty_lines(event: &LogEvent) -> Vec<String> {
        match event {
            LogEvent::RunStarted {
                range,
                working_dir,
                files,
            } => vec![
                String::new(),
                format!(
                    "{} {}",
                    "dtt".bold().bright_white(),
                    format!("({})", range).dimmed()
                ),
                format!(
                    "  {} {}",
                    "Dir:".dimmed(),
                    working_dir.display().to_string().dimmed()
                ),
                format!(
                    "  {} {} {}",
                    "Files:".dimmed(),
                    files,
                    if *files == 1 { "source file" } else { "source files" }
                ),
                String::new(),
            ],
            LogEvent::LargeBatch { files, limit } => vec![format!(
                "{} {} files changed, above the warning limit of {}",
                "⚠".bright_yellow(),
                files,
                limit
            )],
            LogEvent::FileStarted {
                index,
                total,
                path,
                kind,
                insertions,
                deletions,
            } => vec![format!(
                "{} {} {} {} {}",
                format!("[{}/{}]", index + 1, total).bright_blue().bold(),
                path.bright_white(),
                format!("({})", kind).dimmed(),
                format!("+{}", insertions).green(),
                format!("-{}", deletions).red()
            )],
            LogEvent::ModelResponded { duration_secs, .. } => vec![format!(
                "    {} {}",
                "│".dimmed(),
                format!("model responded ({:.1}s)", duration_secs).dimmed()
            )],
            LogEvent::TestWritten { destination, .. } => vec![format!(
                "    {} wrote {}",
                "✓".bright_green(),
                destination.display()
            )],
            LogEvent::TestPrinted { .. } => {
                vec![format!("    {} printed to stdout", "✓".bright_green())]
            }
            LogEvent::NoTestNeeded { .. } => {
                vec![format!("    {} {}", "○".dimmed(), "no test needed".dimmed())]
            }
            LogEvent::FileSkipped { reason, .. } => vec![format!(
                "    {} skipped: {}",
                "→".bright_yellow(),
                reason.bright_yellow()
            )],
            LogEvent::FileFailed { error, .. } => vec![format!(
                "    {} {}",
                "✗".bright_red(),
                error.bright_red()
            )],
            LogEvent::RunInterrupted { processed, total } => vec![
                String::new(),
                format!(
                    "{} Interrupted after {} of {} files",
                    "⚠".bright_yellow(),
                    processed,
                    total
                ),
            ],
            LogEvent::RunCompleted {
                files,
                written,
                printed,
                no_test_needed,
                skipped,
                failed,
                duration_secs,
            } => {
                if *files == 0 {
                    return vec![format!(
                        "{} {}",
                        "○".dimmed(),
                        "No changed source files; nothing to do.".dimmed()
                    )];
                }
                let failed_text = format!("{} failed", failed);
                vec![
                    String::new(),
                    format!(
                        "{} {} generated, {} no test needed, {} skipped, {} {}",
                        "Done:".bold(),
                        written + printed,
                        no_test_needed,
                        skipped,
                        if *failed > 0 {
                            failed_text.bright_red().to_string()
                        } else {
                            failed_text
                        },
                        format!("({:.1}s)", duration_secs).dimmed()
                    ),
                ]
            }
        }
    }

    fn compact_line(event: &LogEvent) -> String {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        match event {
            LogEvent::RunStarted { range, files, .. } => {
                format!("[{}] run:start {} files={}", timestamp, range, files)
            }
            LogEvent::LargeBatch { files, limit } => {
                format!("[{}] run:large files={} limit={}", timestamp, files, limit)
            }
            LogEvent::FileStarted {
                index, path, kind, ..
            } => format!("[{}] file:start:{} {} {}", timestamp, index + 1, path, kind),
            LogEvent::ModelResponded {
                index,
                duration_secs,
                ..
            } => format!("[{}] model:done:{} {:.1}s", timestamp, index + 1, duration_secs),
            LogEvent::TestWritten {
                index, destination, ..
            } => format!(
                "[{}] file:written:{} {}",
                timestamp,
                index + 1,
                destination.display()
            ),
            LogEvent::TestPrinted { index, .. } => {
                format!("[{}] file:printed:{}", timestamp, index + 1)
            }
            LogEvent::NoTestNeeded { index, .. } => {
                format!("[{}] file:no-test:{}", timestamp, index + 1)
            }
            LogEvent::FileSkipped { index, reason, .. } => {
                format!("[{}] file:skipped:{} {}", timestamp, index + 1, reason)
            }
            LogEvent::FileFailed { index, error, .. } => {
                format!("[{}] file:failed:{} {}", timestamp, index + 1, error)
            }
            LogEvent::RunInterrupted { processed, total } => {
                format!("[{}] run:interrupted {}/{}", timestamp, processed, total)
            }
            LogEvent::RunCompleted {
                files,
                failed,
                duration_secs,
                ..
            } => format!(
                "[{}] run:done files={} failed={} {:.1}s",
                timestamp, files, failed, duration_secs
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::FileSkipped {
            index: 0,
            path: "big.py".to_string(),
            reason: "diff too large".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "file_skipped");
        assert_eq!(json["path"], "big.py");
    }

    #[test]
    fn test_file_log_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("dtt.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::NoTestNeeded {
            index: 0,
            path: "a.py".to_string(),
        });
        logger.log(&LogEvent::RunInterrupted {
            processed: 1,
            total: 3,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "no_test_needed");
        assert!(first["timestamp"].is_string());
    }

    #[test]
    fn test_empty_run_summary() {
        let lines = Logger::pretty_lines(&LogEvent::RunCompleted {
            files: 0,
            written: 0,
            printed: 0,
            no_test_needed: 0,
            skipped: 0,
            failed: 0,
            duration_secs: 0.0,
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("nothing to do"));
    }
}
