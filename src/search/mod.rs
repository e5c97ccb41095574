//! Listing and filtering support shared across entity families.

mod filter;

pub use filter::{ListFilter, SortDirection, SortOrder};
