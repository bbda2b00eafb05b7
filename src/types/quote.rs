//! Quote types
//!
//! The quote record, the sync conflict pair, and the single validation
//! entry point shared by add, import and sync merge.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single quote
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// The quote itself; identity key when matching local and remote records
    pub text: String,
    /// Free-form category, mutable metadata
    pub category: String,
}

impl Quote {
    /// Create a quote without validation
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Key used to detect duplicates on import
    pub fn dedupe_key(&self) -> String {
        format!("{}{}{}", self.text, DEDUPE_SEPARATOR, self.category)
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

const DEDUPE_SEPARATOR: &str = "||";

/// A local and a server quote sharing `text` but not `category`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub local: Quote,
    pub server: Quote,
}

/// Rejected quote input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Quote text is required")]
    EmptyText,
    #[error("Quote category is required")]
    EmptyCategory,
    #[error("Quote text and category are required")]
    EmptyBoth,
    #[error("Not a quote record: {0}")]
    Malformed(String),
}

/// Validate and trim a `(text, category)` pair
pub fn validate(text: &str, category: &str) -> Result<Quote, ValidationError> {
    let text = text.trim();
    let category = category.trim();

    match (text.is_empty(), category.is_empty()) {
        (true, true) => Err(ValidationError::EmptyBoth),
        (true, false) => Err(ValidationError::EmptyText),
        (false, true) => Err(ValidationError::EmptyCategory),
        (false, false) => Ok(Quote::new(text, category)),
    }
}

/// Validate an untyped JSON record (imported files, stored data)
///
/// Both `text` and `category` must be strings; their values then go through
/// [`validate`].
pub fn validate_value(value: &Value) -> Result<Quote, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::Malformed("expected an object".into()))?;

    let text = obj
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::Malformed("`text` must be a string".into()))?;
    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::Malformed("`category` must be a string".into()))?;

    validate(text, category)
}

/// Quotes used when nothing valid is stored yet
pub fn default_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        Quote::new(
            "Life is what happens while you’re busy making other plans.",
            "Life",
        ),
        Quote::new("Do one thing every day that scares you.", "Inspiration"),
    ]
}
