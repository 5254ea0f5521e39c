//! Snapshot preparation for each chart.
//!
//! These functions cover what each chart computes from a snapshot before
//! handing data to the drawing library: legend domains, filtering, ordering
//! and maxima. Scales, layouts and shapes stay with the drawing layer.

use crate::collection::{Activity, Dish, Employee, Expense};
use chartsync_proto::Document;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};

/// Budget pie chart input.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    /// Legend labels in snapshot order
    pub labels: Vec<String>,
    /// Sum of all costs
    pub total_cost: f64,
}

/// Summarize expenses for the pie chart.
#[must_use]
pub fn budget_summary(snapshot: &[Document<Expense>]) -> BudgetSummary {
    BudgetSummary {
        labels: snapshot.iter().map(|doc| doc.data.name.clone()).collect(),
        total_cost: snapshot.iter().map(|doc| doc.data.cost).sum(),
    }
}

/// One point of the fitness line.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPoint {
    /// Document identifier
    pub id: String,
    /// Parsed workout date (UTC)
    pub date: NaiveDateTime,
    /// Distance covered
    pub distance: f64,
}

/// Fitness line chart input for one activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySeries {
    /// The selected activity
    pub activity: String,
    /// Points sorted by date, oldest first
    pub points: Vec<ActivityPoint>,
    /// Largest distance (0 when empty)
    pub max_distance: f64,
    /// Matching records whose date could not be parsed
    pub skipped: usize,
}

/// Select one activity's workouts and order them by date.
#[must_use]
pub fn activity_series(snapshot: &[Document<Activity>], activity: &str) -> ActivitySeries {
    let mut points = Vec::new();
    let mut skipped = 0;

    for doc in snapshot.iter().filter(|doc| doc.data.activity == activity) {
        let Some(date) = parse_activity_date(&doc.data.date) else {
            tracing::warn!(id = %doc.id, date = %doc.data.date, "Unparsable activity date");
            skipped += 1;
            continue;
        };
        points.push(ActivityPoint {
            id: doc.id.clone(),
            date,
            distance: doc.data.distance,
        });
    }

    points.sort_by_key(|point| point.date);
    let max_distance = points.iter().map(|p| p.distance).fold(0.0, f64::max);

    ActivitySeries {
        activity: activity.to_string(),
        points,
        max_distance,
        skipped,
    }
}

/// Parse a stored activity date.
///
/// Accepts RFC 3339, plain `YYYY-MM-DD`, and the browser's
/// `Date.prototype.toString` form (`Tue Mar 05 2024 18:30:00 GMT+0100 (CET)`).
#[must_use]
pub fn parse_activity_date(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.naive_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // Drop the trailing "(Zone Name)".
    let browser = input.split(" (").next().unwrap_or(input);
    DateTime::parse_from_str(browser, "%a %b %d %Y %H:%M:%S GMT%z")
        .ok()
        .map(|date| date.naive_utc())
}

/// Hierarchy tree input checks.
///
/// The tree layout needs exactly one root and every parent present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyCheck {
    /// Employees without a parent, in snapshot order
    pub roots: Vec<String>,
    /// Departments in first-seen order (colour domain)
    pub departments: Vec<String>,
    /// Employees whose parent is not in the snapshot
    pub orphans: Vec<String>,
    /// Names that occur more than once
    pub duplicates: Vec<String>,
    /// Employees no root leads to, such as members of a parent cycle
    pub unreachable: Vec<String>,
}

impl HierarchyCheck {
    /// The single root, if the hierarchy has exactly one.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        match self.roots.as_slice() {
            [root] => Some(root.as_str()),
            _ => None,
        }
    }

    /// Check if the snapshot forms a drawable tree.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.root().is_some()
            && self.orphans.is_empty()
            && self.duplicates.is_empty()
            && self.unreachable.is_empty()
    }
}

/// Check that employees form a single-rooted hierarchy.
#[must_use]
pub fn hierarchy_check(snapshot: &[Document<Employee>]) -> HierarchyCheck {
    let mut check = HierarchyCheck::default();
    let mut names = HashSet::new();
    let mut departments = HashSet::new();

    for doc in snapshot {
        let employee = &doc.data;
        if !names.insert(employee.name.as_str()) {
            check.duplicates.push(employee.name.clone());
        }
        if departments.insert(employee.department.as_str()) {
            check.departments.push(employee.department.clone());
        }
    }

    for doc in snapshot {
        let employee = &doc.data;
        if employee.parent.is_empty() {
            check.roots.push(employee.name.clone());
        } else if !names.contains(employee.parent.as_str()) {
            check.orphans.push(employee.name.clone());
        }
    }

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for doc in snapshot {
        let employee = &doc.data;
        if !employee.parent.is_empty() {
            children
                .entry(employee.parent.as_str())
                .or_default()
                .push(employee.name.as_str());
        }
    }

    let mut reached = HashSet::new();
    let mut pending: Vec<&str> = snapshot
        .iter()
        .filter(|doc| doc.data.parent.is_empty())
        .map(|doc| doc.data.name.as_str())
        .collect();
    while let Some(name) = pending.pop() {
        if reached.insert(name) {
            if let Some(next) = children.get(name) {
                pending.extend(next.iter().copied());
            }
        }
    }

    for doc in snapshot {
        let name = doc.data.name.as_str();
        if reached.insert(name) {
            check.unreachable.push(name.to_string());
        }
    }

    check
}

/// Dishes bar chart input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DishSummary {
    /// Band domain in snapshot order
    pub names: Vec<String>,
    /// Largest order count (0 when empty)
    pub max_orders: u64,
    /// Sum of all orders
    pub total_orders: u64,
}

/// Summarize dishes for the bar chart.
#[must_use]
pub fn dish_summary(snapshot: &[Document<Dish>]) -> DishSummary {
    DishSummary {
        names: snapshot.iter().map(|doc| doc.data.name.clone()).collect(),
        max_orders: snapshot.iter().map(|doc| doc.data.orders).max().unwrap_or(0),
        total_orders: snapshot
            .iter()
            .fold(0, |total, doc| total.saturating_add(doc.data.orders)),
    }
}

/// Prepared input of any chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartSummary {
    /// Budget pie chart
    Budget(BudgetSummary),
    /// Fitness line chart
    Activity(ActivitySeries),
    /// Hierarchy tree
    Hierarchy(HierarchyCheck),
    /// Dishes bar chart
    Dishes(DishSummary),
}

impl std::fmt::Display for ChartSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartSummary::Budget(s) => write!(
                f,
                "budget: {} items, total cost {:.2}",
                s.labels.len(),
                s.total_cost
            ),
            ChartSummary::Activity(s) => write!(
                f,
                "{}: {} points, max distance {}",
                s.activity,
                s.points.len(),
                s.max_distance
            ),
            ChartSummary::Hierarchy(s) => match s.root() {
                Some(root) if s.is_valid() => write!(
                    f,
                    "hierarchy: root {root}, {} departments",
                    s.departments.len()
                ),
                _ => write!(
                    f,
                    "hierarchy: invalid ({} roots, {} orphans, {} duplicates, {} unreachable)",
                    s.roots.len(),
                    s.orphans.len(),
                    s.duplicates.len(),
                    s.unreachable.len()
                ),
            },
            ChartSummary::Dishes(s) => write!(
                f,
                "dishes: {} items, max orders {}",
                s.names.len(),
                s.max_orders
            ),
        }
    }
}

/// Options shared by chart preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Activity shown by the fitness chart
    pub activity: String,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            activity: "cycling".to_string(),
        }
    }
}

/// A collection payload that knows how to prepare its chart.
pub trait Summarize: Sized {
    /// Prepare the chart input for a snapshot.
    fn summarize(snapshot: &[Document<Self>], options: &SummaryOptions) -> ChartSummary;
}

impl Summarize for Expense {
    fn summarize(snapshot: &[Document<Self>], _: &SummaryOptions) -> ChartSummary {
        ChartSummary::Budget(budget_summary(snapshot))
    }
}

impl Summarize for Activity {
    fn summarize(snapshot: &[Document<Self>], options: &SummaryOptions) -> ChartSummary {
        ChartSummary::Activity(activity_series(snapshot, &options.activity))
    }
}

impl Summarize for Employee {
    fn summarize(snapshot: &[Document<Self>], _: &SummaryOptions) -> ChartSummary {
        ChartSummary::Hierarchy(hierarchy_check(snapshot))
    }
}

impl Summarize for Dish {
    fn summarize(snapshot: &[Document<Self>], _: &SummaryOptions) -> ChartSummary {
        ChartSummary::Dishes(dish_summary(snapshot))
    }
}
