//! Local mirror of a remote collection.
//!
//! Records are kept in insertion order in a vector, with an id -> position
//! index next to it so that every change applies without a linear search.

use crate::event::Record;
use std::collections::HashMap;

/// Outcome of [`LocalState::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The record was appended
    Inserted,
    /// A record with the same id was replaced at its position
    Replaced,
}

/// Ordered sequence of records, unique by id.
#[derive(Debug, Clone)]
pub struct LocalState<R> {
    records: Vec<R>,
    /// Position of each record in `records`
    index: HashMap<String, usize>,
}

impl<R: Record> Default for LocalState<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> LocalState<R> {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a record, or replace the record with the same id in place.
    pub fn upsert(&mut self, record: R) -> Upsert {
        if let Some(&position) = self.index.get(record.id()) {
            self.records[position] = record;
            Upsert::Replaced
        } else {
            self.index
                .insert(record.id().to_string(), self.records.len());
            self.records.push(record);
            Upsert::Inserted
        }
    }

    /// Replace an existing record in place.
    ///
    /// Returns the record back if no record with its id is present.
    pub fn replace(&mut self, record: R) -> Result<R, R> {
        match self.index.get(record.id()) {
            Some(&position) => Ok(std::mem::replace(&mut self.records[position], record)),
            None => Err(record),
        }
    }

    /// Remove the record with this id.
    ///
    /// Returns `None` if it was not present.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let position = self.index.remove(id)?;
        let removed = self.records.remove(position);

        // Everything after the hole moved one slot to the left.
        for record in &self.records[position..] {
            if let Some(slot) = self.index.get_mut(record.id()) {
                *slot -= 1;
            }
        }

        Some(removed)
    }

    /// Get a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&R> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    /// Check if a record with this id is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ordered view of all records.
    #[must_use]
    pub fn as_slice(&self) -> &[R] {
        &self.records
    }

    /// Iterate over records in order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the state is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
