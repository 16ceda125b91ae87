//! Domain services for the Event Manager.
//!
//! Services contain business logic that operates on domain models.

pub mod admission;
pub mod admission_lock;
pub mod catalog;
pub mod notification;
pub mod record_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use admission::{
    AdmissionConfig, AdmissionEngine, AdmissionError, AdmissionState, InvalidInputReason,
};
pub use admission_lock::{AdmissionGuard, AdmissionLocks, LockTimeout};
pub use catalog::{CatalogConfig, CatalogError, EventCatalog};
pub use notification::{
    spawn_notification_worker, MockNotificationDispatcher, NotificationDispatcher,
    NotificationQueue, NotificationResult, PublishError, RsvpCreated,
};
pub use record_store::{with_timeout, EventScan, RecordStore, StoreError};
