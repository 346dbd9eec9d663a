//! Client state-management core: event-sourced controllers, the events bus,
//! the remote-call error pipeline and keyed paging, plus the report features
//! built on them.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod events_bus;
pub mod features;
pub mod guard;
pub mod paging;
pub mod session;
pub mod transport;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use api::{AttachmentUpload, ReportsApi, ReportsPageSource};
pub use config::{load_settings, Settings};
pub use controller::{Controller, Effects, Feature, TaskRegistry};
pub use error::{Classifier, ErrorCatalog};
pub use events_bus::{BusEvent, EventsBus, GlobalEvent, NavigationRequest, Notification, Route};
pub use guard::{GuardConfigError, RemoteCallGuard};
pub use paging::{PageKey, PageSource, PagingEngine};
pub use session::SessionStore;
pub use transport::{ApiRequest, ApiResponse, HttpFailure, HttpTransport, Transport, TransportError};
