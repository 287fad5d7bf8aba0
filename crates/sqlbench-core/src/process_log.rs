//! Audit trail shared by every worker and judge task of a run.
//!
//! Sinks are injected; `record` writes one whole line under a single lock.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub trait ProcessLog: Send + Sync {
    /// Opens the log for a run. Clears anything left from a previous run.
    fn begin(&self, run_id: &str);
    fn record(&self, line: &str);
    fn entries(&self) -> Vec<String>;
    fn flush(&self) -> anyhow::Result<()>;
    fn clear(&self);
}

pub type SharedProcessLog = Arc<dyn ProcessLog>;

fn stamp(line: &str) -> String {
    format!("[{}] {}", Local::now().format(TIMESTAMP_FORMAT), line)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryProcessLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryProcessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl ProcessLog for MemoryProcessLog {
    fn begin(&self, run_id: &str) {
        let mut lines = lock(&self.lines);
        lines.clear();
        lines.push(stamp(&format!("run {} started", run_id)));
    }

    fn record(&self, line: &str) {
        lock(&self.lines).push(stamp(line));
    }

    fn entries(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn clear(&self) {
        lock(&self.lines).clear();
    }
}

/// Buffers lines in memory and appends them to `path` on `flush`.
pub struct FileProcessLog {
    path: PathBuf,
    inner: Mutex<FileState>,
}

#[derive(Default)]
struct FileState {
    pending: Vec<String>,
    written: Vec<String>,
}

impl FileProcessLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            inner: Mutex::new(FileState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?)
    }
}

impl ProcessLog for FileProcessLog {
    fn begin(&self, run_id: &str) {
        let mut st = lock(&self.inner);
        st.pending.clear();
        st.written.clear();
        st.pending.push(stamp(&format!("run {} started", run_id)));
    }

    fn record(&self, line: &str) {
        lock(&self.inner).pending.push(stamp(line));
    }

    fn entries(&self) -> Vec<String> {
        let st = lock(&self.inner);
        st.written.iter().chain(st.pending.iter()).cloned().collect()
    }

    fn flush(&self) -> anyhow::Result<()> {
        let mut st = lock(&self.inner);
        if st.pending.is_empty() {
            return Ok(());
        }
        let mut w = BufWriter::new(self.open()?);
        for line in &st.pending {
            writeln!(w, "{}", line)?;
        }
        w.flush()?;
        let drained: Vec<String> = st.pending.drain(..).collect();
        st.written.extend(drained);
        Ok(())
    }

    fn clear(&self) {
        let mut st = lock(&self.inner);
        st.pending.clear();
        st.written.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_writers_never_interleave_lines() {
        let log = MemoryProcessLog::shared();
        log.begin("r1");
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.record(&format!("worker={} line={} {}", t, i, "x".repeat(64)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 1 + 8 * 50);
        for line in &entries[1..] {
            assert!(line.ends_with(&"x".repeat(64)), "corrupted line: {}", line);
            assert_eq!(line.matches("worker=").count(), 1);
        }
    }

    #[test]
    fn file_log_appends_on_flush_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/process.log");
        let log = FileProcessLog::new(&path);

        log.begin("r2");
        log.record("[c1] Run 1/3");
        log.flush().unwrap();
        log.record("[c1] Run 2/3");
        log.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("run r2 started"));
        assert_eq!(log.entries().len(), 3);

        log.clear();
        assert!(log.entries().is_empty());
    }
}
