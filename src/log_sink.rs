//! Flat-file outputs: one append-only stream per project plus the run summary.

use crate::common::time::log_timestamp;
use crate::metrics::CycleSummary;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

pub struct LogSink {
    dir: PathBuf,
    summary_path: PathBuf,
    streams: HashMap<String, ProjectLog>,
}

impl LogSink {
    pub fn new(dir: impl Into<PathBuf>, summary_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            summary_path: summary_path.into(),
            streams: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Prunes aged files from the log directory. Never fails the caller.
    pub fn clean_old_logs(&self, max_age: Duration) -> usize {
        match clean_old_logs(&self.dir, max_age, SystemTime::now()) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "could not scan log directory");
                0
            }
        }
    }

    /// Stream for `project_name`, opened on first use. Names that sanitize
    /// to the same key share a stream.
    pub fn project(&mut self, project_name: &str) -> &mut ProjectLog {
        let key = sanitize_filename(project_name);
        let dir = &self.dir;
        self.streams.entry(key).or_insert_with_key(|key| {
            ProjectLog::open(project_name, dir.join(format!("{key}.log")))
        })
    }

    pub fn open_streams(&self) -> usize {
        self.streams.len()
    }

    /// Closes every project file; they reopen lazily on the next pass.
    pub fn close_streams(&mut self) {
        self.streams.clear();
    }

    pub fn append_summary(&self, summary: &CycleSummary) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.summary_path)?;
        file.write_all(format!("{summary}\n").as_bytes())?;
        file.flush()
    }
}

pub struct ProjectLog {
    project: String,
    path: PathBuf,
    file: Option<File>,
}

impl ProjectLog {
    fn open(project: &str, path: PathBuf) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(err) => {
                error!(
                    project,
                    path = %path.display(),
                    error = %err,
                    "could not open project log, lines go to the process log only"
                );
                None
            }
        };
        Self {
            project: project.to_string(),
            path,
            file,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, ts: &DateTime<Local>, message: &str) {
        info!(project = %self.project, "{message}");
        self.append(ts, message);
    }

    pub fn error(&mut self, ts: &DateTime<Local>, message: &str) {
        error!(project = %self.project, "{message}");
        self.append(ts, message);
    }

    fn append(&mut self, ts: &DateTime<Local>, message: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let line = format!("{} {message}\n", log_timestamp(ts));
        if let Err(err) = file.write_all(line.as_bytes()) {
            error!(path = %self.path.display(), error = %err, "project log write failed");
        }
    }
}

/// Replaces every non-alphanumeric character with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Deletes regular files in `dir` last modified more than `max_age` before
/// `now`. Per-file failures are logged and skipped.
pub fn clean_old_logs(dir: &Path, max_age: Duration, now: SystemTime) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping unreadable log entry");
                continue;
            }
        };

        let age = match file_age(&path, now) {
            Ok(Some(age)) => age,
            Ok(None) => continue,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not stat log file");
                continue;
            }
        };
        if age <= max_age {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Deleted old log file");
                removed += 1;
            }
            Err(err) => warn!(path = %path.display(), error = %err, "could not delete old log file"),
        }
    }
    debug!(dir = %dir.display(), removed, "log housekeeping finished");
    Ok(removed)
}

/// `None` for anything that is not a regular file.
fn file_age(path: &Path, now: SystemTime) -> io::Result<Option<Duration>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }
    let modified = metadata.modified()?;
    Ok(Some(now.duration_since(modified).unwrap_or_default()))
}
