//! # File Adapter
//!
//! Change-stream source reading batches from a JSON-lines file or stdin.
//!
//! Each non-blank line holds one `ChangeBatch`:
//!
//! ```text
//! {"collection":"expenses","changes":[{"type":"added","id":"e1","doc":{"name":"rent","cost":300}}]}
//! {"collection":"expenses","changes":[{"type":"removed","id":"e1"}]}
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod source;

pub use source::{read_batches, FileSource, FileSourceConfig, SourceError};
