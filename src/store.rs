//! Reading and writing PEM artifacts on disk.
//!
//! New files are created with `create_new`, so an existing file is never
//! overwritten.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{CertsmithError, Result};

/// The kinds of files the tool writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Csr,
    Certificate,
    Key,
}

impl ArtifactKind {
    /// File extension appended to the base name the user types.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Csr => "csr",
            ArtifactKind::Certificate => "crt",
            ArtifactKind::Key => "pem",
        }
    }
}

/// Files under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    out_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Path of the file `base` with the extension of `kind` appended.
    pub fn path_for(&self, base: &str, kind: ArtifactKind) -> PathBuf {
        self.out_dir.join(format!("{base}.{}", kind.extension()))
    }

    /// Writes `contents` to a new file named `base` plus the extension of `kind`.
    ///
    /// Fails with [`CertsmithError::FileExists`] if that file is already there.
    pub fn write_new(&self, base: &str, kind: ArtifactKind, contents: &[u8]) -> Result<PathBuf> {
        let base = base.trim();
        if base.is_empty() {
            return Err(CertsmithError::InvalidInput(
                "file name must not be empty".to_string(),
            ));
        }
        let path = self.path_for(base, kind);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CertsmithError::FileExists(path));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(contents)?;
        file.flush()?;
        log::info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Reads a text file typed in full by the user.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CertsmithError::FileNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;
    log::debug!("Read {} ({} bytes)", path.display(), contents.len());
    Ok(contents)
}
