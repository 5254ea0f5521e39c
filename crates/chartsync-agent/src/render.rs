//! Renderer that logs chart summaries.

use chartsync_charts::{ChartSummary, Summarize, SummaryOptions};
use chartsync_core::Renderer;
use chartsync_proto::Document;
use std::marker::PhantomData;

/// Prepares each snapshot for its chart and logs the result.
///
/// Stands in for the drawing layer: it performs the same data preparation
/// and rejects snapshots the chart could not draw.
pub struct SummaryRenderer<T> {
    options: SummaryOptions,
    last: Option<ChartSummary>,
    renders: u64,
    _payload: PhantomData<fn() -> T>,
}

impl<T> SummaryRenderer<T> {
    /// Create a renderer.
    #[must_use]
    pub fn new(options: SummaryOptions) -> Self {
        Self {
            options,
            last: None,
            renders: 0,
            _payload: PhantomData,
        }
    }

    /// Summary of the last successful render.
    #[must_use]
    pub fn last(&self) -> Option<&ChartSummary> {
        self.last.as_ref()
    }

    /// Number of render calls, including failed ones.
    #[must_use]
    pub fn renders(&self) -> u64 {
        self.renders
    }
}

impl<T: Summarize> Renderer<Document<T>> for SummaryRenderer<T> {
    type Error = RenderError;

    fn render(&mut self, snapshot: &[Document<T>]) -> Result<(), RenderError> {
        self.renders += 1;
        let summary = T::summarize(snapshot, &self.options);

        if let ChartSummary::Hierarchy(check) = &summary {
            if !snapshot.is_empty() && !check.is_valid() {
                return Err(RenderError::InvalidHierarchy(summary.to_string()));
            }
        }

        tracing::info!(records = snapshot.len(), summary = %summary, "Chart updated");
        self.last = Some(summary);
        Ok(())
    }
}

/// Errors raised while rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Employees do not form a single-rooted tree without cycles
    #[error("cannot draw {0}")]
    InvalidHierarchy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsync_charts::{Employee, Expense};

    fn employee(name: &str, parent: &str) -> Document<Employee> {
        Document::new(
            name,
            Employee {
                name: name.to_string(),
                parent: parent.to_string(),
                department: "ops".to_string(),
            },
        )
    }

    #[test]
    fn keeps_last_summary() {
        let mut renderer = SummaryRenderer::<Expense>::new(SummaryOptions::default());
        let snapshot = [Document::new(
            "e1",
            Expense {
                name: "rent".to_string(),
                cost: 300.0,
            },
        )];

        renderer.render(&snapshot).unwrap();

        assert_eq!(renderer.renders(), 1);
        assert!(matches!(renderer.last(), Some(ChartSummary::Budget(_))));
    }

    #[test]
    fn rejects_forest_of_employees() {
        let mut renderer = SummaryRenderer::<Employee>::new(SummaryOptions::default());

        renderer
            .render(&[employee("Ada", ""), employee("Grace", "Ada")])
            .unwrap();
        let err = renderer
            .render(&[employee("Ada", ""), employee("Alan", "")])
            .unwrap_err();

        assert!(matches!(err, RenderError::InvalidHierarchy(_)));
        assert_eq!(renderer.renders(), 2);
        assert!(matches!(
            renderer.last(),
            Some(ChartSummary::Hierarchy(check)) if check.root() == Some("Ada")
        ));
    }

    #[test]
    fn rejects_cycle_detached_from_root() {
        let mut renderer = SummaryRenderer::<Employee>::new(SummaryOptions::default());
        let err = renderer
            .render(&[employee("Ada", ""), employee("Bob", "Cy"), employee("Cy", "Bob")])
            .unwrap_err();

        assert!(matches!(err, RenderError::InvalidHierarchy(_)));
        assert!(renderer.last().is_none());
    }

    #[test]
    fn empty_hierarchy_renders() {
        let mut renderer = SummaryRenderer::<Employee>::new(SummaryOptions::default());
        assert!(renderer.render(&[]).is_ok());
    }
}
