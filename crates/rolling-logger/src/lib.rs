//! Rolling File Logger
//!
//! Installs a `tracing` subscriber that writes to `<dir>/<app>.log`, rolling the
//! file once it grows past a size limit and keeping a bounded number of archives
//! (`<app>.1.log` is the newest). Every line is also mirrored into an in-memory
//! circular buffer so a host can show recent log output without touching disk.
//!
//! `log` records are bridged into the same subscriber.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Default size at which the active log file is rolled
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
/// Default number of rolled archives kept next to the active file
pub const DEFAULT_MAX_FILES: usize = 5;
/// Default number of lines held in the in-memory buffer
pub const DEFAULT_BUFFER_LINES: usize = 500;

static RECENT: OnceLock<Arc<Mutex<LineBuffer>>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to prepare log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
    #[error("logger not initialized")]
    NotInitialized,
}

/// Tunables for [`init_logger_with`]
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
    pub level: Level,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
            level: Level::INFO,
        }
    }
}

/// Initialize the global logger with default options
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LoggerOptions::default())
}

/// Initialize the global logger
///
/// Fails if a global subscriber is already installed.
pub fn init_logger_with(
    log_dir: PathBuf,
    app_name: &str,
    options: LoggerOptions,
) -> Result<(), LoggerError> {
    let writer = RollingWriter::open(&log_dir, app_name, &options)?;
    let recent = writer.recent.clone();

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_max_level(options.level)
        .try_init()
        .map_err(|e| LoggerError::Subscriber(e.to_string()))?;

    // A second successful install is impossible, so the buffer is only set once.
    let _ = RECENT.set(recent);
    Ok(())
}

/// Log an info line through the global logger
pub fn info(msg: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    log::info!("{}", msg);
    Ok(())
}

/// Log an error line through the global logger
pub fn error(msg: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    log::error!("{}", msg);
    Ok(())
}

/// Lines currently held in the in-memory buffer, oldest first
pub fn recent_lines() -> Vec<String> {
    RECENT
        .get()
        .and_then(|buffer| buffer.lock().ok().map(|b| b.lines()))
        .unwrap_or_default()
}

fn ensure_initialized() -> Result<(), LoggerError> {
    if RECENT.get().is_some() {
        Ok(())
    } else {
        Err(LoggerError::NotInitialized)
    }
}

/// Fixed-capacity ring of complete log lines
#[derive(Debug)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    pending: String,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            pending: String::new(),
        }
    }

    /// Feed raw bytes; only newline-terminated lines are stored
    pub fn push_bytes(&mut self, buf: &[u8]) {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        while let Some(idx) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=idx).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                self.push_line(line.to_string());
            }
        }
    }

    fn push_line(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// Size-rolled log file
#[derive(Debug)]
struct RollingFile {
    dir: PathBuf,
    app_name: String,
    max_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
}

impl RollingFile {
    fn open(dir: &Path, app_name: &str, max_bytes: u64, max_files: usize) -> Result<Self, LoggerError> {
        fs::create_dir_all(dir).map_err(|source| LoggerError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = active_path(dir, app_name);
        let file = open_append(&path).map_err(|source| LoggerError::Io {
            path: path.clone(),
            source,
        })?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            max_bytes,
            max_files,
            file,
            written,
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.roll()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files > 0 {
            let oldest = archive_path(&self.dir, &self.app_name, self.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..self.max_files).rev() {
                let from = archive_path(&self.dir, &self.app_name, n);
                if from.exists() {
                    fs::rename(&from, archive_path(&self.dir, &self.app_name, n + 1))?;
                }
            }
            fs::rename(
                active_path(&self.dir, &self.app_name),
                archive_path(&self.dir, &self.app_name, 1),
            )?;
        } else {
            fs::remove_file(active_path(&self.dir, &self.app_name))?;
        }

        self.file = open_append(&active_path(&self.dir, &self.app_name))?;
        let header = format!(
            "--- {} log rolled at {} ---\n",
            self.app_name,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        self.file.write_all(header.as_bytes())?;
        self.written = header.len() as u64;
        Ok(())
    }
}

fn active_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{}.log", app_name))
}

fn archive_path(dir: &Path, app_name: &str, n: usize) -> PathBuf {
    dir.join(format!("{}.{}.log", app_name, n))
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writer handed to `tracing-subscriber`; cheap to clone
#[derive(Clone)]
pub struct RollingWriter {
    file: Arc<Mutex<RollingFile>>,
    recent: Arc<Mutex<LineBuffer>>,
}

impl RollingWriter {
    pub fn open(dir: &Path, app_name: &str, options: &LoggerOptions) -> Result<Self, LoggerError> {
        let file = RollingFile::open(dir, app_name, options.max_file_bytes, options.max_files)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            recent: Arc::new(Mutex::new(LineBuffer::new(options.buffer_lines))),
        })
    }

    pub fn recent_lines(&self) -> Vec<String> {
        self.recent.lock().map(|b| b.lines()).unwrap_or_default()
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| io::Error::other("log file lock poisoned"))?;
            file.write_all(buf)?;
        }
        if let Ok(mut recent) = self.recent.lock() {
            recent.push_bytes(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .file
            .flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_options(max_file_bytes: u64, max_files: usize) -> LoggerOptions {
        LoggerOptions {
            max_file_bytes,
            max_files,
            buffer_lines: 3,
            level: Level::DEBUG,
        }
    }

    #[test]
    fn test_line_buffer_keeps_newest() {
        let mut buffer = LineBuffer::new(2);
        buffer.push_bytes(b"one\ntwo\nthree\n");
        assert_eq!(buffer.lines(), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_line_buffer_joins_partial_writes() {
        let mut buffer = LineBuffer::new(4);
        buffer.push_bytes(b"hal");
        assert!(buffer.lines().is_empty());
        buffer.push_bytes(b"f line\r\n");
        assert_eq!(buffer.lines(), vec!["half line".to_string()]);
    }

    #[test]
    fn test_writer_creates_active_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::open(dir.path(), "Board", &small_options(1024, 2)).unwrap();

        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("Board.log")).unwrap();
        assert_eq!(content, "hello\n");
        assert_eq!(writer.recent_lines(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_writer_rolls_and_caps_archives() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::open(dir.path(), "Board", &small_options(16, 2)).unwrap();

        for i in 0..6 {
            writer.write_all(format!("line number {}\n", i).as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        assert!(dir.path().join("Board.log").exists());
        assert!(dir.path().join("Board.1.log").exists());
        assert!(dir.path().join("Board.2.log").exists());
        assert!(!dir.path().join("Board.3.log").exists());

        let active = fs::read_to_string(dir.path().join("Board.log")).unwrap();
        assert!(active.contains("line number 5"));

        // Only the last three lines survive in memory
        let recent = writer.recent_lines();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.last().map(String::as_str), Some("line number 5"));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut writer = RollingWriter::open(dir.path(), "Board", &small_options(1024, 2)).unwrap();
            writer.write_all(b"first\n").unwrap();
        }
        let mut writer = RollingWriter::open(dir.path(), "Board", &small_options(1024, 2)).unwrap();
        writer.write_all(b"second\n").unwrap();

        let content = fs::read_to_string(dir.path().join("Board.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_helpers_require_init() {
        if RECENT.get().is_none() {
            assert!(matches!(info("nope"), Err(LoggerError::NotInitialized)));
        }
    }
}
