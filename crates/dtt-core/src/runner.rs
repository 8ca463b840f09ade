use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use dtt_git::{DiffChange, DiffCollector};
use dtt_logging::{LogEvent, Logger};
use dtt_testgen::TestGenerator;

use crate::approval::{Approval, Approver};
use crate::error::PipelineError;
use crate::outcome::{FileOutcome, RunReport};
use crate::output::{Emitted, OutputSink};
use crate::RunContext;

/// Drives the diff → prompt → model → output pipeline, one file at a time
pub struct PipelineRunner<'a> {
    collector: DiffCollector,
    generator: TestGenerator<'a>,
    sink: OutputSink,
    approver: &'a dyn Approver,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        collector: DiffCollector,
        generator: TestGenerator<'a>,
        sink: OutputSink,
        approver: &'a dyn Approver,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            collector,
            generator,
            sink,
            approver,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Collect the diff for the context's range and process every file.
    ///
    /// Repository errors surface here, before any remote call is made.
    pub async fn run(&self, context: &RunContext) -> Result<RunReport, PipelineError> {
        let changes = self.collector.collect(&context.range)?;
        self.run_changes(context, changes).await
    }

    /// Process already-collected changes in order
    pub async fn run_changes(
        &self,
        context: &RunContext,
        changes: Vec<DiffChange>,
    ) -> Result<RunReport, PipelineError> {
        let total = changes.len();
        let mut report = RunReport::new(context.range.to_string());

        self.logger.log(&LogEvent::RunStarted {
            range: report.range.clone(),
            working_dir: self.collector.working_dir().to_path_buf(),
            files: total,
        });

        if total > 0 {
            context.ai_config()?;
        }

        if let Some(limit) = context.max_files.filter(|_| context.exceeds_max_files(total)) {
            self.logger.log(&LogEvent::LargeBatch {
                files: total,
                limit,
            });
            if !self.approver.approve_batch(total, limit)? {
                info!(files = total, limit, "Large batch declined");
                for (index, change) in changes.iter().enumerate() {
                    self.skip(&mut report, index, change, "batch declined");
                }
                return Ok(self.finish(report, context));
            }
        }

        let mut stopped = false;
        for (index, change) in changes.iter().enumerate() {
            if stopped {
                self.skip(&mut report, index, change, "stopped by user");
                continue;
            }

            if self.interrupted.load(Ordering::SeqCst) {
                info!("Run interrupted by user");
                self.logger.log(&LogEvent::RunInterrupted {
                    processed: index,
                    total,
                });
                report.interrupted = true;
                break;
            }

            self.logger.log(&LogEvent::FileStarted {
                index,
                total,
                path: change.path.clone(),
                kind: change.kind.to_string(),
                insertions: change.insertions(),
                deletions: change.deletions(),
            });

            let prompt = match self.generator.prepare(change) {
                Ok(prompt) => prompt,
                Err(e) => {
                    warn!(path = %change.path, error = %e, "Skipping file");
                    self.skip(&mut report, index, change, &e.to_string());
                    continue;
                }
            };

            match self.approver.approve_file(index, total, change)? {
                Approval::Generate => {}
                Approval::Skip => {
                    self.skip(&mut report, index, change, "skipped by user");
                    continue;
                }
                Approval::Quit => {
                    self.skip(&mut report, index, change, "stopped by user");
                    stopped = true;
                    continue;
                }
            }

            let outcome = self
                .process_file(&mut report, index, change, &prompt, context)
                .await?;
            report.push(outcome);
        }

        Ok(self.finish(report, context))
    }

    /// Remote call plus output for one file. Per-request failures become a
    /// `Failed` outcome; everything else aborts the run.
    async fn process_file(
        &self,
        report: &mut RunReport,
        index: usize,
        change: &DiffChange,
        prompt: &str,
        context: &RunContext,
    ) -> Result<FileOutcome, PipelineError> {
        let config = context.ai_config()?;
        let source = change.path.clone();
        debug!(path = %source, client = self.generator.client_name(), "Requesting test");

        report.remote_calls += 1;
        let start = Instant::now();
        let test = match self
            .generator
            .complete(change, prompt, config)
            .await
        {
            Ok(test) => test,
            Err(e) if e.is_per_request() => {
                warn!(path = %source, error = %e, "Model call failed");
                self.logger.log(&LogEvent::FileFailed {
                    index,
                    path: source.clone(),
                    error: e.to_string(),
                });
                return Ok(FileOutcome::Failed {
                    source,
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.logger.log(&LogEvent::ModelResponded {
            index,
            path: source.clone(),
            duration_secs: start.elapsed().as_secs_f64(),
        });

        let outcome = match self.sink.emit(&test)? {
            Emitted::Written(destination) => {
                self.logger.log(&LogEvent::TestWritten {
                    index,
                    path: source.clone(),
                    destination: destination.clone(),
                });
                FileOutcome::Written {
                    source,
                    destination,
                }
            }
            Emitted::Printed => {
                self.logger.log(&LogEvent::TestPrinted {
                    index,
                    path: source.clone(),
                });
                FileOutcome::Printed { source }
            }
            Emitted::NoTestNeeded => {
                self.logger.log(&LogEvent::NoTestNeeded {
                    index,
                    path: source.clone(),
                });
                FileOutcome::NoTestNeeded { source }
            }
            Emitted::Empty => {
                let reason = "model returned an empty code block".to_string();
                self.logger.log(&LogEvent::FileSkipped {
                    index,
                    path: source.clone(),
                    reason: reason.clone(),
                });
                FileOutcome::Skipped { source, reason }
            }
        };

        Ok(outcome)
    }

    fn skip(&self, report: &mut RunReport, index: usize, change: &DiffChange, reason: &str) {
        self.logger.log(&LogEvent::FileSkipped {
            index,
            path: change.path.clone(),
            reason: reason.to_string(),
        });
        report.push(FileOutcome::Skipped {
            source: change.path.clone(),
            reason: reason.to_string(),
        });
    }

    fn finish(&self, mut report: RunReport, context: &RunContext) -> RunReport {
        report.finish(context.total_duration());
        self.logger.log(&LogEvent::RunCompleted {
            files: report.files.len(),
            written: report.written(),
            printed: report.printed(),
            no_test_needed: report.no_test_needed(),
            skipped: report.skipped(),
            failed: report.failed(),
            duration_secs: report.total_duration_secs,
        });
        report
    }
}
