//! Domain layer for the Event Manager backend.
//!
//! This crate contains:
//! - Domain models (Event, Rsvp, Category, QuerySpec)
//! - The record store abstraction the core is written against
//! - The event catalog (read path) and RSVP admission engine (write path)
//! - The notification dispatch seam for admitted RSVPs

pub mod models;
pub mod services;
