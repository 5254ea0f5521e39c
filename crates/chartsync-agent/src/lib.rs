//! # ChartSync Agent
//!
//! Mirrors one chart collection from a change stream.
//!
//! ## Architecture
//!
//! The agent runs two concurrent loops:
//! 1. **Ingress**: the file source parses JSON-lines batches into a channel
//! 2. **Sync**: a single worker task owns the synchronizer and applies
//!    batches strictly in arrival order, rendering once per batch

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod render;
pub mod runtime;
pub mod worker;

pub use config::AgentConfig;
pub use render::{RenderError, SummaryRenderer};
pub use runtime::{Agent, RunStats};
pub use worker::{SyncHandle, SyncWorker, WorkerError};
