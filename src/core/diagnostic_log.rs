//! Append-only diagnostic log kept next to the shop so merchants can send it
//! to support.
//!
//! Each kind of entry lives in its own file (`error`, `warning`, `success`)
//! inside one flat directory. A file holds one `{"<unix seconds>": entry}`
//! JSON object per line and is emptied on the first write of a new UTC day.

use crate::utils::error::{Result, ShippingError};
use crate::utils::fs::ensure_dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zip::write::{FileOptions, ZipWriter};

pub const BUNDLE_NAME: &str = "mdsWoocommerceLogs.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Error,
    Warning,
    Success,
}

impl LogKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            LogKind::Error => "error",
            LogKind::Warning => "warning",
            LogKind::Success => "success",
        }
    }
}

impl std::str::FromStr for LogKind {
    type Err = ShippingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "error" => Ok(LogKind::Error),
            "warning" => Ok(LogKind::Warning),
            "success" => Ok(LogKind::Success),
            other => Err(ShippingError::InvalidConfigValueError {
                field: "log kind".to_string(),
                value: other.to_string(),
                reason: "expected one of: error, warning, success".to_string(),
            }),
        }
    }
}

/// What is written under each timestamp key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredEntry {
    function: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: i64,
    pub kind: LogKind,
    pub function: String,
    pub message: String,
    pub settings: Option<serde_json::Value>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    dir: PathBuf,
}

impl DiagnosticLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, kind: LogKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    fn io_failure(path: &Path, e: impl std::fmt::Display) -> ShippingError {
        ShippingError::LogIoFailure {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }

    pub fn error(
        &self,
        function: &str,
        message: &str,
        settings: Option<serde_json::Value>,
        data: Option<serde_json::Value>,
    ) -> Result<()> {
        self.record(LogKind::Error, function, message, settings, data)
    }

    pub fn warning(
        &self,
        function: &str,
        message: &str,
        settings: Option<serde_json::Value>,
        data: Option<serde_json::Value>,
    ) -> Result<()> {
        self.record(LogKind::Warning, function, message, settings, data)
    }

    pub fn success(&self, function: &str, message: &str, data: Option<serde_json::Value>) -> Result<()> {
        self.record(LogKind::Success, function, message, None, data)
    }

    /// Appends one entry to the file for `kind`, emptying the file first when
    /// it was last written before today.
    ///
    /// The file stays exclusively locked from the staleness check until the
    /// entry is written, so concurrent writers cannot interleave a rotation
    /// with an append.
    pub fn record(
        &self,
        kind: LogKind,
        function: &str,
        message: &str,
        settings: Option<serde_json::Value>,
        data: Option<serde_json::Value>,
    ) -> Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.path(kind);
        let now = Utc::now();

        let mut line = BTreeMap::new();
        line.insert(
            now.timestamp().to_string(),
            StoredEntry {
                function: function.to_string(),
                message: message.to_string(),
                settings: settings.filter(|v| !v.is_null()),
                data: data.filter(|v| !v.is_null()),
            },
        );
        let mut encoded = serde_json::to_string(&line)?;
        encoded.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Self::io_failure(&path, e))?;
        file.lock().map_err(|e| Self::io_failure(&path, e))?;

        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| Self::io_failure(&path, e))?;
        if written_before_today(modified, now) {
            tracing::debug!("Rotating {} log", kind.file_name());
            file.set_len(0).map_err(|e| Self::io_failure(&path, e))?;
        }

        file.write_all(encoded.as_bytes())
            .map_err(|e| Self::io_failure(&path, e))?;
        file.unlock().map_err(|e| Self::io_failure(&path, e))?;
        Ok(())
    }

    pub fn has(&self, kind: LogKind) -> bool {
        fs::metadata(self.path(kind))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Entries of one kind in write order; empty when nothing was logged yet.
    pub fn read(&self, kind: LogKind) -> Result<Vec<LogEntry>> {
        let path = self.path(kind);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_failure(&path, e)),
        };
        file.lock_shared().map_err(|e| Self::io_failure(&path, e))?;

        let mut entries = Vec::new();
        for line in BufReader::new(&file).lines() {
            let line = line.map_err(|e| Self::io_failure(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let parsed: BTreeMap<String, StoredEntry> = match serde_json::from_str(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("Skipping unreadable {} log line: {}", kind.file_name(), e);
                    continue;
                }
            };

            for (timestamp, stored) in parsed {
                entries.push(LogEntry {
                    timestamp: timestamp.parse().unwrap_or_default(),
                    kind,
                    function: stored.function,
                    message: stored.message,
                    settings: stored.settings,
                    data: stored.data,
                });
            }
        }

        Ok(entries)
    }

    /// Path of the error log, when there is one to download.
    pub fn error_file_path(&self) -> Option<PathBuf> {
        let path = self.path(LogKind::Error);
        path.is_file().then_some(path)
    }

    /// Zips whichever of the `warning` and `error` logs exist into a fresh
    /// archive and returns its path. With neither present the archive is
    /// written empty.
    ///
    /// A failure is also recorded as an error entry.
    pub fn bundle(&self) -> Result<PathBuf> {
        let zip_path = self.dir.join(BUNDLE_NAME);

        match self.write_bundle(&zip_path) {
            Ok(count) => {
                tracing::info!("Bundled {} log files into {}", count, zip_path.display());
                Ok(zip_path)
            }
            Err(e) => {
                tracing::error!("Unable to create log bundle: {}", e);
                if let Err(log_err) = self.error(
                    "DiagnosticLog::bundle",
                    "Unable to create zip file",
                    None,
                    Some(serde_json::json!({ "reason": e.to_string() })),
                ) {
                    tracing::error!("Unable to record bundle failure: {}", log_err);
                }
                Err(Self::io_failure(&zip_path, e))
            }
        }
    }

    fn write_bundle(&self, zip_path: &Path) -> Result<usize> {
        ensure_dir(&self.dir)?;

        let sources: Vec<LogKind> = [LogKind::Warning, LogKind::Error]
            .into_iter()
            .filter(|kind| self.path(*kind).is_file())
            .collect();

        if zip_path.exists() {
            fs::remove_file(zip_path)?;
        }

        let mut zip = ZipWriter::new(File::create(zip_path)?);
        for kind in &sources {
            let mut source = File::open(self.path(*kind))?;
            source.lock_shared()?;
            zip.start_file::<_, ()>(kind.file_name(), FileOptions::default())?;
            std::io::copy(&mut source, &mut zip)?;
        }
        zip.finish()?;

        Ok(sources.len())
    }
}

/// True when `modified` lies before UTC midnight of `now`'s day.
fn written_before_today(modified: SystemTime, now: DateTime<Utc>) -> bool {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|m| m.and_utc())
        .unwrap_or(now);
    DateTime::<Utc>::from(modified) < midnight
}
