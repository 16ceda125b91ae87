//! Shared utilities and common types for the Event Manager backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Page/offset pagination math
//! - Common validation logic (email, time of day, calendar dates, slugs)

pub mod pagination;
pub mod validation;
