use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{NinjaError, NinjaResult};

/// File name the composite is offered under unless the caller picks another.
pub const DEFAULT_FILENAME: &str = "ninja.png";

/// Save/download collaborator receiving the encoded composite.
///
/// Called at most once per pipeline run, and only with fully encoded bytes.
pub trait SaveSink {
    /// Persist `bytes` under `filename`.
    fn save(&mut self, filename: &str, bytes: &[u8]) -> NinjaResult<()>;
}

/// Sink writing `<dir>/<filename>` on the local filesystem.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    overwrite: bool,
    last_path: Option<PathBuf>,
}

impl DirectorySink {
    /// Write into `dir`, replacing existing files.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overwrite: true,
            last_path: None,
        }
    }

    /// Refuse to replace an existing file when `overwrite` is `false`.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the most recently written file.
    pub fn last_path(&self) -> Option<&Path> {
        self.last_path.as_deref()
    }
}

impl SaveSink for DirectorySink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> NinjaResult<()> {
        validate_filename(filename)?;
        let path = self.dir.join(filename);

        ensure_parent_dir(&path)?;
        if !self.overwrite && path.exists() {
            return Err(NinjaError::save(format!(
                "output file '{}' already exists",
                path.display()
            )));
        }

        std::fs::write(&path, bytes)
            .with_context(|| format!("write '{}'", path.display()))
            .map_err(NinjaError::save_from)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved composite");
        self.last_path = Some(path);
        Ok(())
    }
}

/// One file captured by [`InMemorySink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedFile {
    /// Name the file was saved under.
    pub filename: String,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySink {
    files: Vec<SavedFile>,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Files saved so far, in call order.
    pub fn files(&self) -> &[SavedFile] {
        &self.files
    }
}

impl SaveSink for InMemorySink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> NinjaResult<()> {
        validate_filename(filename)?;
        self.files.push(SavedFile {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

/// A bare file name: non-empty, no separators, not `.`/`..`.
pub(crate) fn validate_filename(filename: &str) -> NinjaResult<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
    {
        return Err(NinjaError::validation(format!(
            "invalid output file name '{filename}'"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> NinjaResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))
            .map_err(NinjaError::save_from)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
