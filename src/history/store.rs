// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! File-backed history store: one JSON array per thread.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::get_data_home;
use crate::error::HistoryError;
use crate::types::HistoryEntry;

use super::{HistoryStore, ThreadPattern};

/// Extension of thread files.
pub const HISTORY_EXTENSION: &str = "json";

/// History store writing `<dir>/<thread>.json`.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
    thread: String,
}

impl FileHistoryStore {
    /// Open the store in the default data home (`~/.parley/history`).
    pub fn open(thread: &str) -> Result<Self, HistoryError> {
        let dir = get_data_home().ok_or_else(|| {
            HistoryError::IoError("could not determine home directory".to_string())
        })?;
        Self::open_at(dir, thread)
    }

    /// Open the store in a specific directory, creating it if needed.
    pub fn open_at(dir: impl Into<PathBuf>, thread: &str) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            thread: thread.to_string(),
        })
    }

    /// Directory holding the thread files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn thread_path(&self, thread: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", thread, HISTORY_EXTENSION))
    }

    fn thread_files(&self) -> Result<Vec<(String, PathBuf)>, HistoryError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(HISTORY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path.clone()));
            }
        }
        files.sort();
        Ok(files)
    }
}

impl HistoryStore for FileHistoryStore {
    fn read_thread(&self, thread: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let path = self.thread_path(thread);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HistoryError::NotFound(thread.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| HistoryError::Corrupted(format!("{}: {}", path.display(), e)))
    }

    fn write(&mut self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let path = self.thread_path(&self.thread);
        let data = serde_json::to_vec_pretty(entries)?;

        let mut file = open_private(&path)?;
        file.write_all(&data)?;
        file.flush()?;

        debug!(thread = %self.thread, entries = entries.len(), "Wrote history");
        Ok(())
    }

    fn thread(&self) -> String {
        self.thread.clone()
    }

    fn set_thread(&mut self, thread: &str) {
        self.thread = thread.to_string();
    }

    fn list_threads(&self) -> Result<Vec<String>, HistoryError> {
        Ok(self
            .thread_files()?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn delete_thread(&mut self, pattern: &str) -> Result<(), HistoryError> {
        let selected = ThreadPattern::parse(pattern)?;
        let mut deleted = 0;
        for (name, path) in self.thread_files()? {
            if selected.matches(&name) {
                fs::remove_file(&path)?;
                deleted += 1;
            }
        }

        if deleted == 0 {
            return Err(HistoryError::NotFound(pattern.to_string()));
        }
        debug!(pattern, deleted, "Deleted history");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
