use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dtt_git::SourceFilter;
use dtt_testgen::{GeneratedTest, TestBody};
use tracing::debug;

use crate::PipelineError;

/// What happened to one generated test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    Written(PathBuf),
    Printed,
    NoTestNeeded,
    /// Empty code block; nothing to emit
    Empty,
}

enum Destination {
    Console(Mutex<Box<dyn Write + Send>>),
    Directory(PathBuf),
}

/// Where generated tests go: a console stream, or files mirrored under a
/// directory
pub struct OutputSink {
    destination: Destination,
    filter: SourceFilter,
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self::writer(io::stdout())
    }

    /// Print to an arbitrary stream
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            destination: Destination::Console(Mutex::new(Box::new(writer))),
            filter: SourceFilter::default(),
        }
    }

    /// Write `test_*` files mirroring the source layout under `root`
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::Directory(root.into()),
            filter: SourceFilter::default(),
        }
    }

    pub fn emit(&self, test: &GeneratedTest) -> Result<Emitted, PipelineError> {
        match &self.destination {
            Destination::Console(writer) => self.print(writer, test),
            Destination::Directory(root) => self.write_file(root, test),
        }
    }

    fn print(
        &self,
        writer: &Mutex<Box<dyn Write + Send>>,
        test: &GeneratedTest,
    ) -> Result<Emitted, PipelineError> {
        let text = match &test.body {
            TestBody::Code { code } => {
                format!(
                    "# Generated tests for {}\n{}\n\n",
                    test.source_path,
                    code.trim_end_matches('\n')
                )
            }
            TestBody::NoTestNeeded => format!("no test needed for {}\n", test.source_path),
            TestBody::Empty => return Ok(Emitted::Empty),
        };

        let io_error = |source| PipelineError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        };
        let mut out = writer
            .lock()
            .map_err(|_| PipelineError::Interaction("output stream lock poisoned".to_string()))?;
        out.write_all(text.as_bytes()).map_err(io_error)?;
        out.flush().map_err(io_error)?;

        Ok(match test.body {
            TestBody::NoTestNeeded => Emitted::NoTestNeeded,
            _ => Emitted::Printed,
        })
    }

    fn write_file(&self, root: &Path, test: &GeneratedTest) -> Result<Emitted, PipelineError> {
        let code = match &test.body {
            TestBody::Code { code } => code,
            TestBody::NoTestNeeded => return Ok(Emitted::NoTestNeeded),
            TestBody::Empty => return Ok(Emitted::Empty),
        };

        let path = self
            .filter
            .mirrored_test_path(root, &test.source_path)
            .ok_or_else(|| PipelineError::Io {
                path: PathBuf::from(&test.source_path),
                source: io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name"),
            })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Existing files are replaced, not merged
        let mut contents = code.clone();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        fs::write(&path, contents).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(source = %test.source_path, destination = %path.display(), "Wrote test file");
        Ok(Emitted::Written(path))
    }
}
