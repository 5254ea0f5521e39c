//! # ChartSync Core
//!
//! Keeps a local, id-unique list of records consistent with a remote
//! change stream and notifies a renderer once per applied batch.
//!
//! This crate provides:
//! - `Record` and `ChangeEvent`, the typed shape of remote changes
//! - `LocalState`, an ordered, id-indexed mirror of a collection
//! - `CollectionSynchronizer`, which applies batches and drives the renderer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod state;
pub mod sync;

pub use event::{ChangeEvent, ChangeKind, Record};
pub use state::{LocalState, Upsert};
pub use sync::{BatchReport, CollectionSynchronizer, Renderer, SyncAnomaly};
