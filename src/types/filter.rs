//! Category filter
//!
//! Selection made from the category selector.

use serde::{Deserialize, Serialize};

/// Sentinel the selector uses for "every category"
pub const ALL_CATEGORIES: &str = "all";

/// Which quotes are eligible for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// Parse a selector value; `"all"` or blank means no filtering
    pub fn from_selector(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_CATEGORIES {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(value.to_string())
        }
    }

    /// Value written back to the selector and to storage
    pub fn as_selector(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Only(category) => category,
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}
