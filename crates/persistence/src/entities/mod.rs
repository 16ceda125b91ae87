//! Database entity definitions.

pub mod category;
pub mod event;
pub mod rsvp;

pub use category::{CategoryEntity, EventCategoryEntity};
pub use event::EventEntity;
pub use rsvp::{RsvpCountEntity, RsvpEntity};
