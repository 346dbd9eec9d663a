//! Feature controllers built on [`crate::controller::Controller`].

pub mod app;
pub mod create_report;
pub mod login;
pub mod report_detail;
pub mod reports;

use shared::error::{ErrorException, SimpleError};

use crate::{
    controller::Effects,
    events_bus::{GlobalEvent, Notification},
};

/// Handles the parts of a failure that are not shown inline: Unauthorized
/// forces a logout and non-verification errors are notified once. Returns
/// the verification errors for the caller to attach to its fields.
pub(crate) fn surface_failure<E: Send + 'static>(
    error: &ErrorException,
    effects: &mut Effects<E>,
) -> Vec<SimpleError> {
    if error.is_unauthorized() {
        effects.post_global(GlobalEvent::LogoutRequested);
        return Vec::new();
    }
    let (verification, other) = error.partition();
    for error in other {
        effects.notify(Notification::new(error.message).with_detail(error.code));
    }
    verification
}

/// Notifies verification errors that have no field on the current screen.
pub(crate) fn notify_unplaced<E: Send + 'static>(error: SimpleError, effects: &mut Effects<E>) {
    effects.notify(Notification::new(error.message).with_detail(error.code));
}

#[cfg(test)]
#[path = "../tests/features_tests.rs"]
mod tests;
