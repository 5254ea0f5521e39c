//! Batch application and render notification.
//!
//! A [`CollectionSynchronizer`] owns the [`LocalState`] of one subscription.
//! Each call to [`CollectionSynchronizer::apply_batch`] applies every event in
//! order and then calls the [`Renderer`] exactly once with the resulting
//! snapshot. Partial application is never visible to the renderer.
//!
//! # Recovery Rules
//!
//! | Event | Record present | Record absent |
//! |-------|----------------|---------------|
//! | `Added` | overwrite in place (`DuplicateAdd`) | append |
//! | `Modified` | replace in place | append (`UnknownModify`) |
//! | `Removed` | remove | ignore (`UnknownRemove`) |

use crate::event::{ChangeEvent, Record};
use crate::state::{LocalState, Upsert};

/// Consumer of snapshots, typically a chart redraw.
pub trait Renderer<R> {
    /// Error raised by a failed render.
    type Error;

    /// Render the full, consistent contents of the collection.
    ///
    /// # Errors
    ///
    /// Implementation specific; the error is returned from `apply_batch`.
    fn render(&mut self, snapshot: &[R]) -> Result<(), Self::Error>;
}

impl<R, E, F> Renderer<R> for F
where
    F: FnMut(&[R]) -> Result<(), E>,
{
    type Error = E;

    fn render(&mut self, snapshot: &[R]) -> Result<(), E> {
        self(snapshot)
    }
}

/// A contract violation by the change stream that was recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncAnomaly {
    /// `Added` for an id that is already present
    #[error("duplicate add for id {0}")]
    DuplicateAdd(String),
    /// `Modified` for an id that is not present
    #[error("modify of unknown id {0}")]
    UnknownModify(String),
    /// `Removed` for an id that is not present
    #[error("remove of unknown id {0}")]
    UnknownRemove(String),
}

/// Summary of one applied batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of events in the batch
    pub events: usize,
    /// Records appended
    pub inserted: usize,
    /// Records replaced in place
    pub replaced: usize,
    /// Records removed
    pub removed: usize,
    /// Recovered contract violations, in event order
    pub anomalies: Vec<SyncAnomaly>,
    /// Whether the renderer was invoked
    pub rendered: bool,
    /// Number of records after the batch
    pub len: usize,
}

impl BatchReport {
    /// Check if the batch applied without anomalies.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Mirrors a remote collection and notifies a renderer per batch.
pub struct CollectionSynchronizer<R, F> {
    name: String,
    state: LocalState<R>,
    renderer: F,
    render_empty_batches: bool,
}

impl<R, F> CollectionSynchronizer<R, F>
where
    R: Record,
    F: Renderer<R>,
{
    /// Create a synchronizer with an empty state.
    #[must_use]
    pub fn new(renderer: F) -> Self {
        Self {
            name: "collection".to_string(),
            state: LocalState::new(),
            renderer,
            render_empty_batches: false,
        }
    }

    /// Name used in log records (usually the collection name).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Render after empty batches too.
    ///
    /// Off by default: an empty batch leaves the state unchanged, so there is
    /// nothing new to draw.
    #[must_use]
    pub fn with_render_empty_batches(mut self, enabled: bool) -> Self {
        self.render_empty_batches = enabled;
        self
    }

    /// Apply a batch of events in order, then render once.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error. The state has already been updated when
    /// this happens.
    pub fn apply_batch<I>(&mut self, events: I) -> Result<BatchReport, F::Error>
    where
        I: IntoIterator<Item = ChangeEvent<R>>,
    {
        let mut report = BatchReport::default();
        for event in events {
            self.apply_event(event, &mut report);
        }
        report.len = self.state.len();

        tracing::debug!(
            collection = %self.name,
            events = report.events,
            inserted = report.inserted,
            replaced = report.replaced,
            removed = report.removed,
            anomalies = report.anomalies.len(),
            len = report.len,
            "Applied batch"
        );

        if report.events == 0 && !self.render_empty_batches {
            return Ok(report);
        }

        self.renderer.render(self.state.as_slice())?;
        report.rendered = true;
        Ok(report)
    }

    fn apply_event(&mut self, event: ChangeEvent<R>, report: &mut BatchReport) {
        report.events += 1;
        match event {
            ChangeEvent::Added(record) => {
                let id = record.id().to_string();
                match self.state.upsert(record) {
                    Upsert::Inserted => report.inserted += 1,
                    Upsert::Replaced => {
                        tracing::warn!(collection = %self.name, id = %id, "Duplicate add, overwriting");
                        report.replaced += 1;
                        report.anomalies.push(SyncAnomaly::DuplicateAdd(id));
                    }
                }
            }
            ChangeEvent::Modified(record) => match self.state.replace(record) {
                Ok(_) => report.replaced += 1,
                Err(record) => {
                    let id = record.id().to_string();
                    tracing::warn!(collection = %self.name, id = %id, "Modify of unknown id, inserting");
                    self.state.upsert(record);
                    report.inserted += 1;
                    report.anomalies.push(SyncAnomaly::UnknownModify(id));
                }
            },
            ChangeEvent::Removed(id) => {
                if self.state.remove(&id).is_some() {
                    report.removed += 1;
                } else {
                    tracing::debug!(collection = %self.name, id = %id, "Remove of unknown id ignored");
                    report.anomalies.push(SyncAnomaly::UnknownRemove(id));
                }
            }
        }
    }

    /// Current ordered contents.
    #[must_use]
    pub fn snapshot(&self) -> &[R] {
        self.state.as_slice()
    }

    /// Owned copy of the current contents.
    #[must_use]
    pub fn to_snapshot(&self) -> Vec<R> {
        self.state.as_slice().to_vec()
    }

    /// Get a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&R> {
        self.state.get(id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Check if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Name used in log records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &F {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut F {
        &mut self.renderer
    }

    /// Split into state and renderer.
    #[must_use]
    pub fn into_parts(self) -> (LocalState<R>, F) {
        (self.state, self.renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::convert::Infallible;

    #[derive(Debug, Clone, PartialEq)]
    struct Expense {
        id: String,
        cost: u32,
    }

    impl Record for Expense {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn expense(id: &str, cost: u32) -> Expense {
        Expense {
            id: id.to_string(),
            cost,
        }
    }

    use ChangeEvent::{Added, Modified, Removed};

    fn removed(id: &str) -> ChangeEvent<Expense> {
        Removed(id.to_string())
    }

    /// Keeps a copy of every snapshot it was given.
    #[derive(Default)]
    struct Recorder {
        renders: Vec<Vec<Expense>>,
    }

    impl Renderer<Expense> for Recorder {
        type Error = Infallible;

        fn render(&mut self, snapshot: &[Expense]) -> Result<(), Infallible> {
            self.renders.push(snapshot.to_vec());
            Ok(())
        }
    }

    fn synchronizer() -> CollectionSynchronizer<Expense, Recorder> {
        CollectionSynchronizer::new(Recorder::default()).with_name("expenses")
    }

    #[test]
    fn added_record_is_appended() {
        let mut sync = synchronizer();
        let report = sync.apply_batch([Added(expense("a", 10))]).unwrap();

        assert_eq!(sync.snapshot(), &[expense("a", 10)]);
        assert_eq!(report.inserted, 1);
        assert!(report.rendered);
        assert!(report.is_clean());
    }

    #[test]
    fn modified_record_keeps_position() {
        let mut sync = synchronizer();
        sync.apply_batch([Added(expense("a", 10)), Added(expense("b", 1))])
            .unwrap();
        let report = sync.apply_batch([Modified(expense("a", 20))]).unwrap();

        assert_eq!(sync.snapshot(), &[expense("a", 20), expense("b", 1)]);
        assert_eq!(report.replaced, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn removed_record_disappears() {
        let mut sync = synchronizer();
        sync.apply_batch([Added(expense("a", 1)), Added(expense("b", 2))])
            .unwrap();
        sync.apply_batch([removed("a")]).unwrap();

        assert_eq!(sync.snapshot(), &[expense("b", 2)]);
    }

    #[test]
    fn remove_of_unknown_id_is_a_noop() {
        let mut sync = synchronizer();
        let report = sync.apply_batch([removed("z")]).unwrap();

        assert!(sync.snapshot().is_empty());
        assert_eq!(
            report.anomalies,
            vec![SyncAnomaly::UnknownRemove("z".to_string())]
        );
    }

    #[test]
    fn whole_lifecycle_in_one_batch_renders_once() {
        let mut sync = synchronizer();
        let report = sync
            .apply_batch([
                Added(expense("a", 0)),
                Modified(expense("a", 5)),
                removed("a"),
            ])
            .unwrap();

        assert!(sync.is_empty());
        assert_eq!(report.events, 3);
        assert_eq!(sync.renderer().renders, vec![Vec::<Expense>::new()]);
    }

    #[test]
    fn one_render_per_batch_regardless_of_size() {
        let mut sync = synchronizer();
        let batch: Vec<_> = (0..100)
            .map(|i| Added(expense(&format!("e{i}"), i)))
            .collect();
        sync.apply_batch(batch).unwrap();
        sync.apply_batch([removed("e0"), removed("e1")]).unwrap();

        let renders = &sync.renderer().renders;
        assert_eq!(renders.len(), 2);
        assert_eq!(renders[0].len(), 100);
        assert_eq!(renders[1].len(), 98);
    }

    #[test]
    fn empty_batch_does_not_render_by_default() {
        let mut sync = synchronizer();
        sync.apply_batch([Added(expense("a", 1))]).unwrap();
        let report = sync.apply_batch(Vec::new()).unwrap();

        assert!(!report.rendered);
        assert_eq!(report.len, 1);
        assert_eq!(sync.renderer().renders.len(), 1);
    }

    #[test]
    fn empty_batch_renders_when_enabled() {
        let mut sync = synchronizer().with_render_empty_batches(true);
        let report = sync.apply_batch(Vec::new()).unwrap();

        assert!(report.rendered);
        assert_eq!(sync.renderer().renders, vec![Vec::<Expense>::new()]);
    }

    #[test]
    fn duplicate_add_overwrites_in_place() {
        let mut sync = synchronizer();
        sync.apply_batch([Added(expense("a", 1)), Added(expense("b", 2))])
            .unwrap();
        let report = sync.apply_batch([Added(expense("a", 9))]).unwrap();

        assert_eq!(sync.snapshot(), &[expense("a", 9), expense("b", 2)]);
        assert_eq!(
            report.anomalies,
            vec![SyncAnomaly::DuplicateAdd("a".to_string())]
        );
    }

    #[test]
    fn modify_of_unknown_id_inserts() {
        let mut sync = synchronizer();
        sync.apply_batch([Added(expense("a", 1))]).unwrap();
        let report = sync.apply_batch([Modified(expense("b", 7))]).unwrap();

        assert_eq!(sync.snapshot(), &[expense("a", 1), expense("b", 7)]);
        assert_eq!(report.inserted, 1);
        assert_eq!(
            report.anomalies,
            vec![SyncAnomaly::UnknownModify("b".to_string())]
        );
    }

    #[test]
    fn repeated_remove_is_idempotent() {
        let mut once = synchronizer();
        let mut twice = synchronizer();
        for sync in [&mut once, &mut twice] {
            sync.apply_batch([Added(expense("a", 1)), Added(expense("b", 2))])
                .unwrap();
        }

        once.apply_batch([removed("a")]).unwrap();
        twice.apply_batch([removed("a"), removed("a")]).unwrap();
        twice.apply_batch([removed("a")]).unwrap();

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn renderer_failure_propagates_after_state_update() {
        let mut sync = CollectionSynchronizer::new(|_: &[Expense]| -> Result<(), &'static str> {
            Err("canvas gone")
        });
        let result = sync.apply_batch([Added(expense("a", 3))]);

        assert_eq!(result, Err("canvas gone"));
        assert_eq!(sync.snapshot(), &[expense("a", 3)]);
    }

    #[test]
    fn closure_renderer_sees_consistent_snapshots() {
        let mut seen = Vec::new();
        let mut sync = CollectionSynchronizer::new(|snapshot: &[Expense]| {
            seen.push(snapshot.iter().map(|e| e.cost).sum::<u32>());
            Ok::<(), Infallible>(())
        });
        sync.apply_batch([Added(expense("a", 10)), Added(expense("b", 5))])
            .unwrap();
        sync.apply_batch([Modified(expense("a", 1))]).unwrap();
        drop(sync);

        assert_eq!(seen, vec![15, 6]);
    }

    fn change(id: u8, cost: u32, kind: u8) -> ChangeEvent<Expense> {
        let id = format!("r{id}");
        match kind {
            0 => Added(expense(&id, cost)),
            1 => Modified(expense(&id, cost)),
            _ => Removed(id),
        }
    }

    fn event() -> impl Strategy<Value = ChangeEvent<Expense>> {
        (0u8..6, 0u32..1000, 0u8..3).prop_map(|(id, cost, kind)| change(id, cost, kind))
    }

    fn batches() -> impl Strategy<Value = Vec<Vec<ChangeEvent<Expense>>>> {
        prop::collection::vec(prop::collection::vec(event(), 0..8), 0..20)
    }

    /// One event per id, in generation order and shuffled.
    fn distinct_ids() -> impl Strategy<Value = (Vec<ChangeEvent<Expense>>, Vec<ChangeEvent<Expense>>)>
    {
        prop::collection::btree_map(0u8..12, (0u32..1000, 0u8..3), 0..12)
            .prop_map(|picks| {
                picks
                    .into_iter()
                    .map(|(id, (cost, kind))| change(id, cost, kind))
                    .collect::<Vec<_>>()
            })
            .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle()))
    }

    fn sorted(sync: &CollectionSynchronizer<Expense, Recorder>) -> Vec<(String, u32)> {
        let mut records: Vec<_> = sync
            .snapshot()
            .iter()
            .map(|e| (e.id.clone(), e.cost))
            .collect();
        records.sort();
        records
    }

    proptest! {
        #[test]
        fn snapshot_matches_net_effect_per_id(history in batches()) {
            let mut sync = synchronizer();
            let mut model = BTreeMap::new();

            for batch in history {
                for event in &batch {
                    match event {
                        Added(e) | Modified(e) => {
                            model.insert(e.id.clone(), e.cost);
                        }
                        Removed(id) => {
                            model.remove(id);
                        }
                    }
                }
                sync.apply_batch(batch).unwrap();
            }

            let expected: Vec<_> = model.into_iter().collect();
            prop_assert_eq!(sorted(&sync), expected);
        }

        #[test]
        fn remove_is_idempotent_after_any_history(history in batches(), target in 0u8..6) {
            let id = format!("r{target}");
            let mut once = synchronizer();
            let mut twice = synchronizer();
            for batch in history {
                once.apply_batch(batch.clone()).unwrap();
                twice.apply_batch(batch).unwrap();
            }

            once.apply_batch([removed(&id)]).unwrap();
            twice.apply_batch([removed(&id), removed(&id)]).unwrap();
            twice.apply_batch([removed(&id)]).unwrap();

            prop_assert!(once.get(&id).is_none());
            prop_assert_eq!(once.snapshot(), twice.snapshot());
        }

        #[test]
        fn order_of_distinct_ids_in_a_batch_does_not_matter(
            history in batches(),
            (ordered, shuffled) in distinct_ids()
        ) {
            let mut first = synchronizer();
            let mut second = synchronizer();
            for batch in history {
                first.apply_batch(batch.clone()).unwrap();
                second.apply_batch(batch).unwrap();
            }

            first.apply_batch(ordered).unwrap();
            second.apply_batch(shuffled).unwrap();

            prop_assert_eq!(sorted(&first), sorted(&second));
        }
    }

    #[test]
    fn into_parts_returns_state() {
        let mut sync = synchronizer();
        sync.apply_batch([Added(expense("a", 1))]).unwrap();
        assert_eq!(sync.to_snapshot(), vec![expense("a", 1)]);
        assert_eq!(sync.get("a"), Some(&expense("a", 1)));

        let (state, recorder) = sync.into_parts();
        assert_eq!(state.len(), 1);
        assert_eq!(recorder.renders.len(), 1);
    }
}
