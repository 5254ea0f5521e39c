//! JSON-lines batch reader.

use chartsync_proto::ChangeBatch;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Configuration for the file source.
#[derive(Debug, Clone)]
pub struct FileSourceConfig {
    /// File to read; `None` reads stdin
    pub path: Option<PathBuf>,
    /// Capacity of the batch channel
    pub channel_capacity: usize,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            channel_capacity: 100,
        }
    }
}

/// Change-stream source backed by a JSON-lines file or stdin.
pub struct FileSource {
    config: FileSourceConfig,
}

impl FileSource {
    /// Create a new file source.
    #[must_use]
    pub fn new(config: FileSourceConfig) -> Self {
        Self { config }
    }

    /// Start reading batches.
    ///
    /// Returns a channel receiver for parsed batches. Malformed lines are
    /// delivered as errors and reading continues; the channel closes at end of
    /// input, after an I/O error, or when the receiver is dropped.
    #[must_use]
    pub fn start(self) -> mpsc::Receiver<Result<ChangeBatch, SourceError>> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        tokio::spawn(async move {
            let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &self.config.path {
                Some(path) => match tokio::fs::File::open(path).await {
                    Ok(file) => Box::new(BufReader::new(file)),
                    Err(e) => {
                        let err = SourceError::Open {
                            path: path.display().to_string(),
                            reason: e.to_string(),
                        };
                        tracing::error!(error = %err, "Failed to open change stream");
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                },
                None => Box::new(BufReader::new(tokio::io::stdin())),
            };

            let source = self
                .config
                .path
                .as_ref()
                .map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
            tracing::info!(source = %source, "Reading change batches");

            let mut lines = reader.lines();
            let mut line_no = 0;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::info!(source = %source, lines = line_no, "Change stream ended");
                        break;
                    }
                    Err(e) => {
                        let err = SourceError::Read {
                            line: line_no + 1,
                            reason: e.to_string(),
                        };
                        tracing::error!(source = %source, error = %err, "Failed to read change stream");
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                };
                line_no += 1;

                let Some(batch) = parse_line(&line, line_no).transpose() else {
                    continue;
                };
                match &batch {
                    Ok(parsed) => tracing::debug!(
                        line = line_no,
                        collection = %parsed.collection,
                        changes = parsed.changes.len(),
                        "Parsed change batch"
                    ),
                    Err(err) => tracing::warn!(error = %err, "Failed to parse change batch"),
                }

                if tx.send(batch).await.is_err() {
                    tracing::warn!("Batch receiver dropped, stopping source");
                    break;
                }
            }
        });

        rx
    }
}

/// Read every batch of a JSON-lines file.
///
/// # Errors
///
/// Returns error if the file cannot be read or any line is malformed.
pub fn read_batches(path: &Path) -> Result<Vec<ChangeBatch>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| parse_line(line, index + 1).transpose())
        .collect()
}

/// Parse one line; blank lines yield `None`.
fn parse_line(line: &str, line_no: usize) -> Result<Option<ChangeBatch>, SourceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    ChangeBatch::from_json_line(line)
        .map(Some)
        .map_err(|e| SourceError::Parse {
            line: line_no,
            reason: e.to_string(),
        })
}

/// Errors that can occur reading a change stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Input could not be opened
    #[error("cannot open {path}: {reason}")]
    Open {
        /// Path of the input
        path: String,
        /// Underlying I/O error
        reason: String,
    },
    /// Input could not be read
    #[error("line {line}: read error: {reason}")]
    Read {
        /// 1-based number of the line being read
        line: usize,
        /// Underlying I/O error
        reason: String,
    },
    /// A line is not a valid batch
    #[error("line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Parse failure
        reason: String,
    },
}
