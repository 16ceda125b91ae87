//! HTTP route handlers.

pub mod admin;
pub mod categories;
pub mod events;
pub mod health;
pub mod rsvps;
