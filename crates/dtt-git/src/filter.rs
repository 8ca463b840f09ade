use std::path::{Path, PathBuf};

/// Decides which changed files are source files worth generating tests for,
/// and how their test files are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    /// Source extension, without the dot
    extension: String,
    /// Prefix marking a file as a test file
    test_prefix: String,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::python()
    }
}

impl SourceFilter {
    /// Python sources with pytest's `test_` naming convention
    pub fn python() -> Self {
        Self {
            extension: "py".to_string(),
            test_prefix: "test_".to_string(),
        }
    }

    /// Whether the file at `path` is a source file to generate tests for
    pub fn accepts(&self, path: &str) -> bool {
        let path = Path::new(path);
        let has_extension = path
            .extension()
            .is_some_and(|ext| ext == self.extension.as_str());

        has_extension && !self.is_test_file(path)
    }

    pub fn is_test_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&self.test_prefix))
    }

    /// Test file name for a source file: `pkg/mod.py` -> `test_mod.py`
    pub fn test_file_name(&self, source: &Path) -> Option<String> {
        let name = source.file_name()?.to_str()?;
        Some(format!("{}{}", self.test_prefix, name))
    }

    /// Mirror `source` under `output_dir` with the test prefix applied:
    /// `a/b/mod.py` under `out` -> `out/a/b/test_mod.py`
    pub fn mirrored_test_path(&self, output_dir: &Path, source: &str) -> Option<PathBuf> {
        let source = Path::new(source);
        let file_name = self.test_file_name(source)?;
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        Some(output_dir.join(parent).join(file_name))
    }
}
