//! Documents as tracked by the synchronizer.

use chartsync_core::Record;
use serde::{Deserialize, Serialize};

/// A database document: its id plus the document fields.
///
/// On the wire the id sits next to the payload fields, the way the
/// charts consume it (`{"id": "...", "name": "rent", "cost": 300}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    /// Document identifier
    pub id: String,
    /// Document fields
    #[serde(flatten)]
    pub data: T,
}

impl<T> Document<T> {
    /// Create a new document.
    #[must_use]
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

impl<T: Clone> Record for Document<T> {
    fn id(&self) -> &str {
        &self.id
    }
}
