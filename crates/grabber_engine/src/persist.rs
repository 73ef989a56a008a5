use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{} exists and is not a folder", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot create folder {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Makes sure downloads have somewhere to land, creating parents as needed.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(PersistError::NotADirectory(dir.to_path_buf()));
    }
    std::fs::create_dir_all(dir).map_err(|source| PersistError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Replaces `path` with `content` in one rename, so readers never see half a file.
pub fn write_file_atomically(path: &Path, content: &str) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_output_dir(dir)?;

    let write_err = |source: io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file_mut().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
