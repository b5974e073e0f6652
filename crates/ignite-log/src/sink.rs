//! Sinks (§4.4 "Sinks"): write targets with an optional rotation policy.
//! `stdout`/`stderr` are sentinel sinks with no rotation; everything else is
//! a size/backup/age/compression-rotated file.
//!
//! The rotating writer reuses `tracing_appender`'s non-blocking writer
//! machinery — a background thread draining a channel, returning a
//! `WorkerGuard` that must outlive the sink — exactly as the teacher's
//! `loco_rs::logger::init` does for its own file appender. What differs is
//! the rotation policy itself: `tracing_appender::rolling` only rotates on a
//! clock boundary, so the policy below is hand-rolled to match the
//! size+backup+age+gzip contract this logger needs.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

use crate::options::RotationOptions;

/// A log write target. A failing sink must not prevent delivery to others.
pub trait Sink: Send + Sync {
    fn write_record(&self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
}

/// `stdout`, serialised with a per-sink mutex so concurrent emitters never
/// interleave within a single record (§3 invariant).
pub struct StdoutSink(Mutex<io::Stdout>);

impl StdoutSink {
    pub fn new() -> Self {
        Self(Mutex::new(io::stdout()))
    }
}

impl Sink for StdoutSink {
    fn write_record(&self, bytes: &[u8]) -> io::Result<()> {
        self.0.lock().write_all(bytes)
    }

    fn flush(&self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

/// `stderr`, same ordering guarantee as [`StdoutSink`].
pub struct StderrSink(Mutex<io::Stderr>);

impl StderrSink {
    pub fn new() -> Self {
        Self(Mutex::new(io::stderr()))
    }
}

impl Sink for StderrSink {
    fn write_record(&self, bytes: &[u8]) -> io::Result<()> {
        self.0.lock().write_all(bytes)
    }

    fn flush(&self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

/// A rotated, optionally gzip-compressed file sink.
pub struct RotatingFileSink {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl RotatingFileSink {
    pub fn new(path: impl Into<PathBuf>, policy: RotationOptions) -> io::Result<Self> {
        let raw = RotatingWriter::open(path.into(), policy)?;
        let (writer, guard) = tracing_appender::non_blocking(raw);
        Ok(Self {
            writer,
            _guard: guard,
        })
    }
}

impl Sink for RotatingFileSink {
    fn write_record(&self, bytes: &[u8]) -> io::Result<()> {
        self.writer.clone().write_all(bytes)
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.clone().flush()
    }
}

struct RotatingWriter {
    path: PathBuf,
    file: File,
    size: u64,
    policy: RotationOptions,
}

impl RotatingWriter {
    fn open(path: PathBuf, policy: RotationOptions) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            size,
            policy,
        })
    }

    fn max_size_bytes(&self) -> u64 {
        self.policy.max_size_mb * 1024 * 1024
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S-%3f");
        let rotated = PathBuf::from(format!("{}.{timestamp}", self.path.display()));
        fs::rename(&self.path, &rotated)?;

        if self.policy.compress {
            compress_and_remove(&rotated)?;
        }

        prune_backups(&self.path, &self.policy)?;

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let limit = self.max_size_bytes();
        if limit > 0 && self.size + buf.len() as u64 > limit {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn compress_and_remove(path: &Path) -> io::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let data = fs::read(path)?;
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    let gz_file = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(gz_file, Compression::default());
    encoder.write_all(&data)?;
    encoder.finish()?;
    fs::remove_file(path)?;
    Ok(())
}

/// Deletes rotated backups beyond `max_backups` (newest kept) and any older
/// than `max_age`.
fn prune_backups(active_path: &Path, policy: &RotationOptions) -> io::Result<()> {
    let dir = active_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = active_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mut backups: Vec<(PathBuf, SystemTime)> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path != active_path
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(stem) && n.len() > stem.len())
        })
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((path, modified))
        })
        .collect();

    backups.sort_by(|a, b| b.1.cmp(&a.1));

    let now = SystemTime::now();
    let max_age: Duration = policy.max_age;

    for (index, (path, modified)) in backups.iter().enumerate() {
        let too_old = max_age > Duration::ZERO
            && now.duration_since(*modified).unwrap_or(Duration::ZERO) > max_age;
        let too_many = policy.max_backups > 0 && index >= policy.max_backups;
        if too_old || too_many {
            let _ = fs::remove_file(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_when_size_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationOptions {
            max_size_mb: 1,
            max_backups: 5,
            max_age: Duration::from_secs(3600),
            compress: false,
        };
        let mut writer = RotatingWriter::open(path.clone(), policy).unwrap();
        writer.write_all(&vec![b'x'; 2 * 1024 * 1024]).unwrap();

        assert!(path.exists());
        let rotated_count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(rotated_count, 2, "expected the active file plus one rotated backup");
    }

    #[test]
    fn compress_and_remove_produces_gz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log.20240101-000000");
        fs::write(&path, b"hello").unwrap();
        compress_and_remove(&path).unwrap();
        assert!(!path.exists());
        assert!(dir.path().join("app.log.20240101-000000.gz").exists());
    }
}
