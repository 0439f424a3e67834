//! Source file discovery

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::debug;

/// Directory names never descended into
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".mypy_cache",
    ".nox",
    ".tox",
    ".venv",
    "__pycache__",
    "build",
    "dist",
    "venv",
];

/// Expands command-line paths into the list of files to process
#[derive(Debug, Clone)]
pub struct Discovery {
    extensions: Vec<String>,
    exclude: Option<Regex>,
}

impl Discovery {
    pub fn new() -> Self {
        Self {
            extensions: vec!["py".to_string(), "pyi".to_string()],
            exclude: None,
        }
    }

    /// Set the file extensions to collect from directories
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Skip paths matching `pattern`
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("invalid exclude pattern `{pattern}`"))?;
        self.exclude = Some(regex);
        Ok(self)
    }

    /// Files named directly are kept whatever their extension; directories are
    /// walked recursively. The result is sorted and free of duplicates.
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                self.walk(path, &mut files)?;
            } else if path.is_file() {
                if !self.is_excluded(path) {
                    files.push(path.clone());
                }
            } else {
                return Err(anyhow!("Path does not exist: {}", path.display()));
            }
        }
        files.sort();
        files.dedup();
        debug!(files = files.len(), "discovered source files");
        Ok(files)
    }

    fn walk(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if self.is_excluded(&path) {
                debug!(path = %path.display(), "excluded");
                continue;
            }
            // Symlinked directories are not followed; they can point back up the tree.
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if !is_skipped_dir(&path) {
                    self.walk(&path, files)?;
                }
            } else if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "skipping symlinked directory");
            } else if self.should_process_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(exclude) = &self.exclude else {
            return false;
        };
        // Match on forward slashes so one pattern works on every platform.
        let text = path.to_string_lossy().replace('\\', "/");
        exclude.is_match(&text)
    }

    fn should_process_file(&self, path: &Path) -> bool {
        match path.extension() {
            Some(extension) => {
                let extension = extension.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|ext| ext.to_lowercase() == extension)
            }
            None => false,
        }
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| SKIPPED_DIRS.contains(&name.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "x = 1\n").unwrap();
        path
    }

    fn relative(root: &Path, files: Vec<PathBuf>) -> Vec<String> {
        files
            .into_iter()
            .map(|path| {
                path.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_walks_directories_for_python_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "app/schemas.py");
        touch(root, "app/nested/types.pyi");
        touch(root, "app/README.md");
        touch(root, "app/__pycache__/schemas.py");
        touch(root, ".venv/lib/site.py");
        touch(root, "top.py");

        let files = Discovery::new().discover(&[root.to_path_buf()]).unwrap();
        assert_eq!(
            relative(root, files),
            vec!["app/nested/types.pyi", "app/schemas.py", "top.py"]
        );
    }

    #[test]
    fn test_exclude_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "app/schemas.py");
        touch(root, "app/migrations/0001.py");
        touch(root, "app/api_pb2.py");

        let discovery = Discovery::new().exclude("migrations/|_pb2\\.py$").unwrap();
        let files = discovery.discover(&[root.to_path_buf()]).unwrap();
        assert_eq!(relative(root, files), vec!["app/schemas.py"]);
    }

    #[test]
    fn test_explicit_files_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let script = touch(root, "bin/tool");
        let module = touch(root, "mod.py");

        let files = Discovery::new()
            .discover(&[script.clone(), module.clone(), root.to_path_buf()])
            .unwrap();
        assert_eq!(files, vec![script, module]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "app/schemas.py");
        std::os::unix::fs::symlink(root, root.join("app/loop")).unwrap();
        std::os::unix::fs::symlink(root.join("app/schemas.py"), root.join("linked.py")).unwrap();

        let files = Discovery::new().discover(&[root.to_path_buf()]).unwrap();
        assert_eq!(relative(root, files), vec!["app/schemas.py", "linked.py"]);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.py");
        assert!(Discovery::new().discover(&[missing]).is_err());
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        assert!(Discovery::new().exclude("(unclosed").is_err());
    }
}
