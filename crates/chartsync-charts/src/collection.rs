//! Database collections and their document payloads.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A synchronized collection and the chart it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Budget planner expenses (pie chart)
    Expenses,
    /// Fitness tracker activities (line chart)
    Activities,
    /// Employee hierarchy (tree)
    Employees,
    /// Restaurant dishes (bar chart)
    Dishes,
}

impl Collection {
    /// All known collections.
    pub const ALL: [Collection; 4] = [
        Collection::Expenses,
        Collection::Activities,
        Collection::Employees,
        Collection::Dishes,
    ];

    /// Collection name in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Expenses => "expenses",
            Collection::Activities => "activities",
            Collection::Employees => "employees",
            Collection::Dishes => "dishes",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = CollectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| CollectionParseError(s.to_string()))
    }
}

/// Unknown collection name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection: {0}")]
pub struct CollectionParseError(pub String);

/// An expense in the budget planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Item name, also the legend label
    pub name: String,
    /// Cost of the item
    pub cost: f64,
}

/// A logged workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity kind (e.g., "cycling", "running")
    pub activity: String,
    /// Distance covered
    pub distance: f64,
    /// When the workout happened, as stored by the client
    pub date: String,
}

/// An employee node of the organisation chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Employee name, unique within the hierarchy
    pub name: String,
    /// Name of the manager; empty for the root
    #[serde(default)]
    pub parent: String,
    /// Department, used for colouring
    pub department: String,
}

/// A dish and how often it was ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    /// Dish name
    pub name: String,
    /// Number of orders
    pub orders: u64,
}
