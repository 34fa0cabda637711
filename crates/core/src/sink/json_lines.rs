//! Newline-delimited JSON results file.
//!
//! Layout: an optional `{"run_timestamp": ...}` line, then one
//! `{"target": ..., "elapsed_seconds": ...}` object per line.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::SinkConfig;
use crate::job::FetchResult;

use super::{RunHeader, Sink, SinkError, SinkRecord};

#[derive(Serialize)]
struct HeaderLine<'a> {
    run_timestamp: &'a str,
}

/// Appends one JSON object per line to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    write_run_header: bool,
    sync_on_append: bool,
    file: Option<File>,
    records_written: usize,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_run_header: true,
            sync_on_append: false,
            file: None,
            records_written: 0,
        }
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self::new(config.results_path.clone())
            .with_run_header(config.write_run_header)
            .with_sync_on_append(config.sync_on_append)
    }

    pub fn with_run_header(mut self, enabled: bool) -> Self {
        self.write_run_header = enabled;
        self
    }

    pub fn with_sync_on_append(mut self, enabled: bool) -> Self {
        self.sync_on_append = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended since the last `begin_run`.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    async fn ensure_parent(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Writes a complete line in a single call.
    async fn write_line(&mut self, mut line: String) -> Result<(), SinkError> {
        line.push('\n');

        if self.file.is_none() {
            self.ensure_parent().await?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            if self.sync_on_append {
                file.sync_data().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    fn name(&self) -> &str {
        "json_lines"
    }

    async fn begin_run(&mut self, header: &RunHeader) -> Result<(), SinkError> {
        self.ensure_parent().await?;
        // Truncate; later writes reopen in append mode.
        self.file = Some(File::create(&self.path).await?);
        self.records_written = 0;

        if self.write_run_header {
            let timestamp = header.run_timestamp();
            let line = serde_json::to_string(&HeaderLine {
                run_timestamp: &timestamp,
            })?;
            self.write_line(line).await?;
        }

        debug!(path = %self.path.display(), "Results file reinitialized");
        Ok(())
    }

    async fn append(&mut self, result: &FetchResult) -> Result<(), SinkError> {
        let line = serde_json::to_string(&SinkRecord::from(result))?;
        self.write_line(line).await?;
        self.records_written += 1;
        Ok(())
    }
}

/// Parsed contents of a results file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsFile {
    pub run_timestamp: Option<String>,
    pub records: Vec<SinkRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    Header { run_timestamp: String },
    Record(SinkRecord),
}

/// Read a results file written by [`JsonLinesSink`].
pub async fn read_results(path: &Path) -> Result<ResultsFile, SinkError> {
    let contents = fs::read_to_string(path).await?;
    let mut parsed = ResultsFile::default();

    for (idx, raw) in contents.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line: Line = serde_json::from_str(raw).map_err(|e| SinkError::Malformed {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        match line {
            Line::Header { run_timestamp } if idx == 0 => {
                parsed.run_timestamp = Some(run_timestamp);
            }
            Line::Header { .. } => {
                return Err(SinkError::Malformed {
                    line: idx + 1,
                    reason: "run header after the first line".to_string(),
                });
            }
            Line::Record(record) => parsed.records.push(record),
        }
    }

    Ok(parsed)
}
