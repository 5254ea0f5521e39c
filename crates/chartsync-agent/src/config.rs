//! Agent configuration.

use anyhow::{Context, Result};
use chartsync_charts::Collection;
use std::path::PathBuf;
use uuid::Uuid;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Subscription identifier, used to correlate log records
    pub subscription_id: Option<Uuid>,

    /// Collection to mirror
    pub collection: Collection,

    /// Change stream input (`None` = stdin)
    pub source: Option<PathBuf>,

    /// JSON array of documents loaded before the stream starts
    pub seed: Option<PathBuf>,

    /// Activity shown by the fitness chart
    pub activity: String,

    /// Render after empty batches
    pub render_empty_batches: bool,

    /// Capacity of the source and worker queues
    pub queue_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            subscription_id: None,
            collection: Collection::Expenses,
            source: None,
            seed: None,
            activity: "cycling".to_string(),
            render_empty_batches: false,
            queue_capacity: 100,
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CHARTSYNC_SUBSCRIPTION_ID`: Subscription UUID
    /// - `CHARTSYNC_COLLECTION`: "expenses", "activities", "employees" or "dishes"
    /// - `CHARTSYNC_SOURCE`: JSON-lines change stream path ("-" for stdin)
    /// - `CHARTSYNC_SEED`: JSON array of initial documents
    /// - `CHARTSYNC_ACTIVITY`: Activity for the fitness chart
    /// - `CHARTSYNC_RENDER_EMPTY`: "true" to render after empty batches
    /// - `CHARTSYNC_QUEUE_CAPACITY`: Queue capacity
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(id) = lookup("CHARTSYNC_SUBSCRIPTION_ID") {
            config.subscription_id =
                Some(Uuid::parse_str(&id).context("Invalid CHARTSYNC_SUBSCRIPTION_ID")?);
        }

        if let Some(collection) = lookup("CHARTSYNC_COLLECTION") {
            config.collection = collection
                .parse()
                .context("Invalid CHARTSYNC_COLLECTION")?;
        }

        if let Some(source) = lookup("CHARTSYNC_SOURCE") {
            config.source = (source != "-").then(|| PathBuf::from(source));
        }

        if let Some(seed) = lookup("CHARTSYNC_SEED") {
            config.seed = Some(PathBuf::from(seed));
        }

        if let Some(activity) = lookup("CHARTSYNC_ACTIVITY") {
            config.activity = activity;
        }

        if let Some(flag) = lookup("CHARTSYNC_RENDER_EMPTY") {
            config.render_empty_batches = flag
                .parse()
                .context("Invalid CHARTSYNC_RENDER_EMPTY (expected true or false)")?;
        }

        if let Some(capacity) = lookup("CHARTSYNC_QUEUE_CAPACITY") {
            config.queue_capacity = capacity
                .parse()
                .context("Invalid CHARTSYNC_QUEUE_CAPACITY")?;
            anyhow::ensure!(config.queue_capacity > 0, "CHARTSYNC_QUEUE_CAPACITY must be positive");
        }

        Ok(config)
    }
}
