//! # ChartSync Charts
//!
//! The collections behind the budget, fitness, hierarchy and dishes charts,
//! and the data preparation each chart performs on a snapshot before it is
//! handed to the drawing layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod prepare;

pub use collection::{Activity, Collection, CollectionParseError, Dish, Employee, Expense};
pub use prepare::{
    activity_series, budget_summary, dish_summary, hierarchy_check, parse_activity_date,
    ActivityPoint, ActivitySeries, BudgetSummary, ChartSummary, DishSummary, HierarchyCheck,
    Summarize, SummaryOptions,
};
