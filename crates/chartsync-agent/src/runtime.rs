//! Agent runtime orchestration.

use crate::config::AgentConfig;
use crate::render::SummaryRenderer;
use crate::worker::{SyncHandle, SyncWorker, WorkerError};
use anyhow::{Context, Result};
use chartsync_adapter_file::{FileSource, FileSourceConfig, SourceError};
use chartsync_charts::{Activity, Collection, Dish, Employee, Expense, Summarize, SummaryOptions};
use chartsync_core::CollectionSynchronizer;
use chartsync_proto::{initial_load, ChangeBatch, Document};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Batches submitted to the synchronizer
    pub batches: usize,
    /// Changes rejected while decoding
    pub rejected: usize,
    /// Lines or batches skipped before decoding
    pub skipped_batches: usize,
    /// Anomalies recovered by the synchronizer
    pub anomalies: usize,
    /// Batches whose render failed
    pub render_failures: usize,
    /// Records mirrored at the end of the run
    pub final_len: usize,
}

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    subscription_id: Uuid,
}

impl Agent {
    /// Create a new agent.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        let subscription_id = config.subscription_id.unwrap_or_else(Uuid::new_v4);
        Self {
            config,
            subscription_id,
        }
    }

    /// Run until the change stream ends or Ctrl+C is received.
    ///
    /// # Errors
    ///
    /// Returns error if the seed cannot be loaded or the worker fails.
    pub async fn run(self) -> Result<RunStats> {
        tracing::info!(
            subscription_id = %self.subscription_id,
            collection = %self.config.collection,
            "Starting subscription"
        );

        let source = FileSource::new(FileSourceConfig {
            path: self.config.source.clone(),
            channel_capacity: self.config.queue_capacity,
        })
        .start();

        let stats = match self.config.collection {
            Collection::Expenses => run_collection::<Expense>(&self.config, source).await?,
            Collection::Activities => run_collection::<Activity>(&self.config, source).await?,
            Collection::Employees => run_collection::<Employee>(&self.config, source).await?,
            Collection::Dishes => run_collection::<Dish>(&self.config, source).await?,
        };

        tracing::info!(
            subscription_id = %self.subscription_id,
            batches = stats.batches,
            rejected = stats.rejected,
            render_failures = stats.render_failures,
            final_len = stats.final_len,
            "Subscription ended"
        );
        Ok(stats)
    }
}

/// Mirror one collection from a batch channel.
///
/// # Errors
///
/// Returns error if the seed cannot be loaded or the worker task fails.
pub async fn run_collection<T>(
    config: &AgentConfig,
    mut source: mpsc::Receiver<Result<ChangeBatch, SourceError>>,
) -> Result<RunStats>
where
    T: Summarize + DeserializeOwned + Clone + Send + 'static,
{
    let collection = config.collection.as_str();
    let renderer = SummaryRenderer::<T>::new(SummaryOptions {
        activity: config.activity.clone(),
    });
    let sync = CollectionSynchronizer::new(renderer)
        .with_name(collection)
        .with_render_empty_batches(config.render_empty_batches);
    let (handle, worker) = SyncWorker::spawn(sync, config.queue_capacity);

    let mut stats = RunStats::default();

    if let Some(seed) = &config.seed {
        let batch = load_seed(seed, collection)?;
        tracing::info!(documents = batch.changes.len(), "Loaded seed documents");
        submit_batch::<T>(&handle, &batch, &mut stats).await?;
    }

    loop {
        tokio::select! {
            item = source.recv() => {
                match item {
                    None => break,
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "Skipping unreadable batch");
                        stats.skipped_batches += 1;
                    }
                    Some(Ok(batch)) if batch.collection != collection => {
                        tracing::warn!(
                            expected = collection,
                            received = %batch.collection,
                            "Skipping batch for another collection"
                        );
                        stats.skipped_batches += 1;
                    }
                    Some(Ok(batch)) => submit_batch::<T>(&handle, &batch, &mut stats).await?,
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    drop(handle);
    let sync = worker.await.context("Sync worker panicked")?;
    stats.final_len = sync.len();
    Ok(stats)
}

async fn submit_batch<T>(
    handle: &SyncHandle<Document<T>>,
    batch: &ChangeBatch,
    stats: &mut RunStats,
) -> Result<()>
where
    T: DeserializeOwned,
{
    let decoded = batch.decode::<T>();
    stats.rejected += decoded.rejected.len();
    stats.batches += 1;

    match handle.submit(decoded.events).await {
        Ok(report) => {
            stats.anomalies += report.anomalies.len();
            tracing::debug!(
                events = report.events,
                len = report.len,
                rendered = report.rendered,
                "Batch applied"
            );
            Ok(())
        }
        Err(WorkerError::Render(reason)) => {
            stats.render_failures += 1;
            tracing::warn!(reason = %reason, "Batch applied but chart not updated");
            Ok(())
        }
        Err(err @ WorkerError::Closed) => Err(err).context("Sync worker stopped unexpectedly"),
    }
}

/// Load a JSON array of documents (each with an `id` field) as an initial batch.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not an array of documents
/// with string ids.
pub fn load_seed(path: &Path, collection: &str) -> Result<ChangeBatch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed {}", path.display()))?;
    let docs: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&content).context("Seed must be a JSON array of objects")?;

    let docs = docs
        .into_iter()
        .enumerate()
        .map(|(index, mut doc)| match doc.remove("id") {
            Some(serde_json::Value::String(id)) => Ok((id, serde_json::Value::Object(doc))),
            _ => anyhow::bail!("Seed document {index} has no string id"),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(initial_load(collection, docs))
}
