//! Domain models for the Event Manager.

pub mod category;
pub mod event;
pub mod query;
pub mod rsvp;

pub use category::{Category, CategoryId, CategoryRef, CreateCategoryRequest, NewCategory};
pub use event::{
    AvailableSlots, CreateEventRequest, Event, EventChanges, EventId, EventStatus, EventView,
    NewEvent, UpdateEventRequest,
};
pub use query::{
    DateRange, EventFilter, EventPage, EventSort, InvalidQuery, QuerySpec, SortDirection, SortKey,
};
pub use rsvp::{NewRsvp, Rsvp, RsvpFormRequest, RsvpId, RsvpResponse, SubmitRsvpRequest};
