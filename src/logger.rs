//! Console + file log sink behind the `log` facade.
//!
//! Every record becomes one line `[<monotonic-ms> ms] <message>`, printed to
//! the console and appended to the log file. The file is truncated when the
//! logger is created. File errors never reach the caller.

use crate::clock::{Clock, SystemClock};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub struct FileLogger {
    clock: SystemClock,
    file: Mutex<Option<File>>,
    level: LevelFilter,
}

impl FileLogger {
    pub fn create(path: impl AsRef<Path>, clock: SystemClock, level: LevelFilter) -> Self {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok();
        Self {
            clock,
            file: Mutex::new(file),
            level,
        }
    }

    /// Console-only logger, used when the filesystem is unavailable.
    pub fn console_only(clock: SystemClock, level: LevelFilter) -> Self {
        Self {
            clock,
            file: Mutex::new(None),
            level,
        }
    }

    pub fn has_file(&self) -> bool {
        self.file.lock().map(|file| file.is_some()).unwrap_or(false)
    }

    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn write_line(&self, line: &str) {
        println!("{line}");
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = writeln!(file, "{line}");
            }
        }
    }
}

pub fn format_line(ms: u64, message: &str) -> String {
    format!("[{ms} ms] {message}")
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.clock.now_ms(), &record.args().to_string());
        self.write_line(&line);
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}
