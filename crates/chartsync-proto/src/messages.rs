//! Change batch messages and their decoding into typed events.

use crate::document::Document;
use chartsync_core::{ChangeEvent, ChangeKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One change record as delivered by the change stream.
///
/// The record is duck-typed on the wire; [`decode_change`] validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    /// Change type: `added`, `modified` or `removed`
    #[serde(rename = "type")]
    pub change_type: String,
    /// Document identifier
    pub id: String,
    /// Document fields (absent for removals)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

impl RawChange {
    /// An `added` change.
    #[must_use]
    pub fn added(id: impl Into<String>, doc: Value) -> Self {
        Self::with_doc(ChangeKind::Added, id, doc)
    }

    /// A `modified` change.
    #[must_use]
    pub fn modified(id: impl Into<String>, doc: Value) -> Self {
        Self::with_doc(ChangeKind::Modified, id, doc)
    }

    /// A `removed` change.
    #[must_use]
    pub fn removed(id: impl Into<String>) -> Self {
        Self {
            change_type: ChangeKind::Removed.to_string(),
            id: id.into(),
            doc: None,
        }
    }

    fn with_doc(kind: ChangeKind, id: impl Into<String>, doc: Value) -> Self {
        Self {
            change_type: kind.to_string(),
            id: id.into(),
            doc: Some(doc),
        }
    }
}

/// Decode one raw change into a typed event.
///
/// # Errors
///
/// Returns error if the change type is unknown, the id is empty, the
/// document is missing, or the document does not match `T`.
pub fn decode_change<T: DeserializeOwned>(
    raw: &RawChange,
) -> Result<ChangeEvent<Document<T>>, DecodeError> {
    let kind = ChangeKind::from_wire(&raw.change_type)
        .ok_or_else(|| DecodeError::UnknownChangeType(raw.change_type.clone()))?;

    if raw.id.is_empty() {
        return Err(DecodeError::EmptyId);
    }

    if kind == ChangeKind::Removed {
        return Ok(ChangeEvent::Removed(raw.id.clone()));
    }

    let doc = raw
        .doc
        .clone()
        .ok_or_else(|| DecodeError::MissingDocument(raw.id.clone()))?;
    let data: T = serde_json::from_value(doc).map_err(|e| DecodeError::Payload {
        id: raw.id.clone(),
        reason: e.to_string(),
    })?;
    let document = Document::new(raw.id.clone(), data);

    Ok(match kind {
        ChangeKind::Added => ChangeEvent::Added(document),
        _ => ChangeEvent::Modified(document),
    })
}

/// All changes of one remote snapshot for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Collection name (e.g., "expenses")
    pub collection: String,
    /// Changes in delivery order
    #[serde(default)]
    pub changes: Vec<RawChange>,
}

impl ChangeBatch {
    /// Create a new batch.
    #[must_use]
    pub fn new(collection: impl Into<String>, changes: Vec<RawChange>) -> Self {
        Self {
            collection: collection.into(),
            changes,
        }
    }

    /// Decode every change, keeping valid events in order.
    ///
    /// Invalid changes are skipped and reported in
    /// [`DecodedBatch::rejected`].
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self) -> DecodedBatch<T> {
        let mut decoded = DecodedBatch {
            events: Vec::with_capacity(self.changes.len()),
            rejected: Vec::new(),
        };

        for (index, raw) in self.changes.iter().enumerate() {
            match decode_change(raw) {
                Ok(event) => decoded.events.push(event),
                Err(err) => {
                    tracing::warn!(
                        collection = %self.collection,
                        index,
                        id = %raw.id,
                        error = %err,
                        "Rejected change"
                    );
                    decoded.rejected.push((index, err));
                }
            }
        }

        decoded
    }

    /// Parse a batch from one line of a JSON-lines stream.
    ///
    /// # Errors
    ///
    /// Returns error if the line is not a valid batch.
    pub fn from_json_line(line: &str) -> Result<Self, MessageError> {
        serde_json::from_str(line).map_err(|e| MessageError::Deserialize(e.to_string()))
    }

    /// Serialize to a single JSON line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json_line(&self) -> Result<String, MessageError> {
        serde_json::to_string(self).map_err(|e| MessageError::Serialize(e.to_string()))
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// Build the batch for a one-shot fetch of a whole collection.
///
/// Every fetched document becomes an `added` change, so a synchronizer can
/// be seeded the same way it is kept up to date.
#[must_use]
pub fn initial_load<I>(collection: impl Into<String>, docs: I) -> ChangeBatch
where
    I: IntoIterator<Item = (String, Value)>,
{
    let changes = docs
        .into_iter()
        .map(|(id, doc)| RawChange::added(id, doc))
        .collect();
    ChangeBatch::new(collection, changes)
}

/// A batch decoded into typed events.
#[derive(Debug)]
pub struct DecodedBatch<T> {
    /// Valid events in delivery order
    pub events: Vec<ChangeEvent<Document<T>>>,
    /// Index within the batch and reason of each rejected change
    pub rejected: Vec<(usize, DecodeError)>,
}

/// Errors that can occur decoding a single change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Change type is not `added`, `modified` or `removed`
    #[error("unknown change type: {0}")]
    UnknownChangeType(String),
    /// Document id is empty
    #[error("empty document id")]
    EmptyId,
    /// `added` or `modified` without document fields
    #[error("missing document for id {0}")]
    MissingDocument(String),
    /// Document fields do not match the collection payload
    #[error("invalid document {id}: {reason}")]
    Payload {
        /// Document identifier
        id: String,
        /// Deserialization failure
        reason: String,
    },
}

/// Errors for batch (de)serialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialize error: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialize error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Expense {
        name: String,
        cost: f64,
    }

    fn rent(cost: f64) -> Document<Expense> {
        Document::new(
            "e1",
            Expense {
                name: "rent".to_string(),
                cost,
            },
        )
    }

    #[test]
    fn decode_added_and_modified() {
        let added = RawChange::added("e1", json!({"name": "rent", "cost": 300.0}));
        let modified = RawChange::modified("e1", json!({"name": "rent", "cost": 320.0}));

        assert_eq!(
            decode_change::<Expense>(&added).unwrap(),
            ChangeEvent::Added(rent(300.0))
        );
        assert_eq!(
            decode_change::<Expense>(&modified).unwrap(),
            ChangeEvent::Modified(rent(320.0))
        );
    }

    #[test]
    fn decode_removed_ignores_document() {
        let mut raw = RawChange::removed("e1");
        raw.doc = Some(json!({"name": "rent"}));

        assert_eq!(
            decode_change::<Expense>(&raw).unwrap(),
            ChangeEvent::Removed("e1".to_string())
        );
    }

    #[test]
    fn wire_id_overrides_id_inside_document() {
        let raw = RawChange::added("e1", json!({"id": "stale", "name": "rent", "cost": 1.0}));
        let ChangeEvent::Added(doc) = decode_change::<Expense>(&raw).unwrap() else {
            panic!("expected added");
        };
        assert_eq!(doc.id, "e1");
    }

    #[test]
    fn decode_rejects_malformed_changes() {
        let unknown = RawChange {
            change_type: "renamed".to_string(),
            id: "e1".to_string(),
            doc: None,
        };
        assert_eq!(
            decode_change::<Expense>(&unknown),
            Err(DecodeError::UnknownChangeType("renamed".to_string()))
        );

        let no_doc = RawChange {
            change_type: "added".to_string(),
            id: "e1".to_string(),
            doc: None,
        };
        assert_eq!(
            decode_change::<Expense>(&no_doc),
            Err(DecodeError::MissingDocument("e1".to_string()))
        );

        assert_eq!(
            decode_change::<Expense>(&RawChange::removed("")),
            Err(DecodeError::EmptyId)
        );

        let wrong_shape = RawChange::added("e2", json!({"name": "food"}));
        assert!(matches!(
            decode_change::<Expense>(&wrong_shape),
            Err(DecodeError::Payload { id, .. }) if id == "e2"
        ));
    }

    #[test]
    fn batch_decode_keeps_order_and_collects_rejections() {
        let line = r#"{"collection":"expenses","changes":[
            {"type":"added","id":"e1","doc":{"name":"rent","cost":300.0}},
            {"type":"bogus","id":"e9"},
            {"type":"removed","id":"e1"}
        ]}"#
        .replace('\n', "");

        let batch = ChangeBatch::from_json_line(&line).unwrap();
        let decoded = batch.decode::<Expense>();

        assert_eq!(
            decoded.events,
            vec![
                ChangeEvent::Added(rent(300.0)),
                ChangeEvent::Removed("e1".to_string())
            ]
        );
        assert_eq!(decoded.rejected.len(), 1);
        assert_eq!(decoded.rejected[0].0, 1);
    }

    #[test]
    fn batch_without_changes_is_empty() {
        let batch = ChangeBatch::from_json_line(r#"{"collection":"dishes"}"#).unwrap();
        assert!(batch.changes.is_empty());
        assert!(batch.decode::<Expense>().events.is_empty());
    }

    #[test]
    fn json_line_and_cbor_encoding() {
        let batch = ChangeBatch::new(
            "expenses",
            vec![
                RawChange::added("e1", json!({"name": "rent", "cost": 300})),
                RawChange::removed("e0"),
            ],
        );

        let line = batch.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains(r#""type":"removed""#));
        assert!(!line.contains(r#""doc":null"#));
        assert_eq!(ChangeBatch::from_json_line(&line).unwrap(), batch);

        let bytes = batch.to_cbor().unwrap();
        assert_eq!(ChangeBatch::from_cbor(&bytes).unwrap(), batch);
    }

    #[test]
    fn initial_load_adds_every_document() {
        let batch = initial_load(
            "dishes",
            vec![
                ("d1".to_string(), json!({"name": "curry", "orders": 3})),
                ("d2".to_string(), json!({"name": "ramen", "orders": 5})),
            ],
        );

        assert_eq!(batch.collection, "dishes");
        assert!(batch.changes.iter().all(|c| c.change_type == "added"));
        assert_eq!(batch.changes[1].id, "d2");
    }
}
