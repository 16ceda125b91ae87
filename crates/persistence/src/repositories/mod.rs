//! Repository implementations for database operations.

pub mod category;
pub mod event;
pub mod rsvp;

pub use category::CategoryRepository;
pub use event::EventRepository;
pub use rsvp::{RsvpInsert, RsvpRepository};
