//! File sink: one append-only text file per (kind, local node, peer).
//!
//! Files are named `<kind>_<local host>_<peer host>.log` inside the stats
//! directory and hold one `"<unix timestamp> <value>"` line per event.
//! Handles are opened lazily on the first event for a file and kept open
//! for the lifetime of the reporter. Writes go through a `LineWriter`, so
//! each line reaches the file as soon as it is complete.

use crate::error::{MonitorError, Result};
use crate::reporting::Reporter;
use crate::types::{StatEvent, StatKind};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only stat files
pub struct StatsFileReporter {
    dir: PathBuf,
    local_host: String,
    files: HashMap<PathBuf, LineWriter<File>>,
    lines_written: u64,
}

impl StatsFileReporter {
    /// Create the reporter, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>, local_host: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            MonitorError::Config(format!("Failed to create stats directory {:?}: {}", dir, e))
        })?;

        Ok(Self {
            dir,
            local_host: local_host.into(),
            files: HashMap::new(),
            lines_written: 0,
        })
    }

    /// Path of the file holding `kind` events about `peer_host`
    pub fn file_path(&self, kind: StatKind, peer_host: &str) -> PathBuf {
        stat_file_path(&self.dir, kind, &self.local_host, peer_host)
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    fn writer_for(&mut self, path: PathBuf) -> Option<&mut LineWriter<File>> {
        if !self.files.contains_key(&path) {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    tracing::debug!("Opened stats file {:?}", path);
                    self.files.insert(path.clone(), LineWriter::new(file));
                }
                Err(e) => {
                    tracing::error!("Failed to open stats file {:?}: {}", path, e);
                    return None;
                }
            }
        }
        self.files.get_mut(&path)
    }
}

/// `<dir>/<kind>_<local>_<peer>.log`
pub fn stat_file_path(dir: &Path, kind: StatKind, local_host: &str, peer_host: &str) -> PathBuf {
    dir.join(format!("{}_{}_{}.log", kind.as_str(), local_host, peer_host))
}

impl Reporter for StatsFileReporter {
    fn name(&self) -> &'static str {
        "file"
    }

    fn write(&mut self, event: &StatEvent) {
        let path = self.file_path(event.kind(), event.peer.host());
        let line = format!("{:.6} {}\n", event.unix_seconds(), event.measurement);

        let Some(writer) = self.writer_for(path.clone()) else {
            return;
        };

        match writer.write_all(line.as_bytes()) {
            Ok(()) => self.lines_written += 1,
            Err(e) => {
                tracing::error!("Failed to write stats file {:?}: {}", path, e);
                // Reopen on the next event
                self.files.remove(&path);
            }
        }
    }

    fn flush(&mut self) {
        for (path, writer) in &mut self.files {
            if let Err(e) = writer.flush() {
                tracing::warn!("Failed to flush stats file {:?}: {}", path, e);
            }
        }
        if self.lines_written > 0 {
            tracing::info!(
                "File reporter flushed {} files after {} lines",
                self.files.len(),
                self.lines_written
            );
        }
    }
}
