//! # ChartSync Protocol
//!
//! Wire format of change batches and their validation into typed events.
//!
//! ## Messages
//!
//! - `RawChange`: one change record as delivered by the database
//!   (`{"type": "added", "id": "...", "doc": {...}}`)
//! - `ChangeBatch`: all changes of one remote snapshot for one collection
//!
//! Batches travel as JSON lines or CBOR.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod messages;

pub use document::Document;
pub use messages::{
    decode_change, initial_load, ChangeBatch, DecodeError, DecodedBatch, MessageError, RawChange,
};
