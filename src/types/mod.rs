//! Shared type definitions
//!
//! This module contains the data types used across the library.

pub mod filter;
pub mod quote;

pub use filter::CategoryFilter;
pub use quote::{default_quotes, validate, validate_value, Conflict, Quote, ValidationError};
