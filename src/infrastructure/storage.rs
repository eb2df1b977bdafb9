use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::domain::error::{AppError, Result};

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))?;
    }
    Ok(())
}

/// A temp file next to `target` that replaces it atomically on [`StagedFile::commit`].
///
/// Until committed the target is never touched. Dropping an uncommitted
/// staged file removes the temp file.
pub struct StagedFile {
    target: PathBuf,
    tmp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl StagedFile {
    pub fn create(target: &Path) -> Result<Self> {
        let file_name = target
            .file_name()
            .ok_or_else(|| io_err(format!("Not a file path: {}", target.display())))?;

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp-{}", Uuid::new_v4()));
        let tmp_path = target.with_file_name(tmp_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .map_err(|e| {
                io_err(format!(
                    "Failed to create temp file {}: {e}",
                    tmp_path.display()
                ))
            })?;

        debug!(tmp = %tmp_path.display(), target = %target.display(), "Staged temp file");

        Ok(Self {
            target: target.to_path_buf(),
            tmp_path,
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Give the temp file the same permissions as `source`
    pub fn inherit_permissions(&self, source: &Path) -> Result<()> {
        let permissions = fs::metadata(source)
            .map_err(|e| io_err(format!("Failed to stat {}: {e}", source.display())))?
            .permissions();
        fs::set_permissions(&self.tmp_path, permissions).map_err(|e| {
            io_err(format!(
                "Failed to set permissions on {}: {e}",
                self.tmp_path.display()
            ))
        })
    }

    /// Flush, fsync and rename the temp file over the target
    pub fn commit(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| {
                io_err(format!(
                    "Failed to flush temp file {}: {}",
                    self.tmp_path.display(),
                    e.error()
                ))
            })?;
            file.sync_all().map_err(|e| {
                io_err(format!(
                    "Failed to sync temp file {}: {e}",
                    self.tmp_path.display()
                ))
            })?;
        }

        fs::rename(&self.tmp_path, &self.target).map_err(|e| {
            io_err(format!(
                "Failed to rename temp file {} to {}: {e}",
                self.tmp_path.display(),
                self.target.display()
            ))
        })?;

        self.committed = true;
        Ok(self.target.clone())
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "staged file already closed"))
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.writer.take());
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}
