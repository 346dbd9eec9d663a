//! Top-level controller: owns the route stack, the session lifecycle and the
//! notification queue. It stays attached for the whole process lifetime.

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    controller::{Effects, Feature},
    events_bus::{BusEvent, GlobalEvent, NavigationRequest, Notification, Route},
    session::SessionStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub route_stack: Vec<Route>,
    pub signed_in: bool,
    pub logging_out: bool,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppUiEvent {
    BackPressed,
    NotificationDismissed(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Ui(AppUiEvent),
    CheckSession,
    SessionChecked(bool),
    Navigate(NavigationRequest),
    LoginCompleted,
    LogoutRequested,
    LoggedOut,
    Notify(Notification),
    NotificationExpired(Uuid),
}

impl From<AppUiEvent> for AppEvent {
    fn from(value: AppUiEvent) -> Self {
        Self::Ui(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUiState {
    /// `None` until the stored session has been checked.
    pub route: Option<Route>,
    pub can_go_back: bool,
    pub signed_in: bool,
    pub notifications: Vec<Notification>,
}

pub struct AppFeature {
    session: SessionStore,
    notification_ttl: Duration,
}

impl AppFeature {
    pub fn new(session: SessionStore, notification_ttl: Duration) -> Self {
        Self {
            session,
            notification_ttl,
        }
    }
}

fn navigate(stack: &mut Vec<Route>, request: NavigationRequest) {
    match request {
        NavigationRequest::NavigateTo(route @ (Route::Login | Route::Reports)) => {
            stack.clear();
            stack.push(route);
        }
        NavigationRequest::NavigateTo(route) => {
            if stack.last() != Some(&route) {
                stack.push(route);
            }
        }
        NavigationRequest::NavigateBack => {
            if stack.len() > 1 {
                stack.pop();
            }
        }
    }
}

impl Feature for AppFeature {
    type State = AppState;
    type Event = AppEvent;
    type UiEvent = AppUiEvent;
    type UiState = AppUiState;

    fn name(&self) -> &'static str {
        "app"
    }

    fn fold(&self, state: &AppState, event: AppEvent, effects: &mut Effects<AppEvent>) -> AppState {
        let mut next = state.clone();
        match event {
            AppEvent::CheckSession => {
                let session = self.session.clone();
                effects.spawn(async move {
                    match session.has_session().await {
                        Ok(present) => AppEvent::SessionChecked(present),
                        Err(err) => {
                            warn!(error = %format!("{err:#}"), "app: session check failed");
                            AppEvent::SessionChecked(false)
                        }
                    }
                });
            }
            AppEvent::SessionChecked(present) => {
                next.signed_in = present;
                let root = if present { Route::Reports } else { Route::Login };
                navigate(&mut next.route_stack, NavigationRequest::NavigateTo(root));
            }
            AppEvent::Navigate(request) => navigate(&mut next.route_stack, request),
            AppEvent::Ui(AppUiEvent::BackPressed) => {
                navigate(&mut next.route_stack, NavigationRequest::NavigateBack)
            }
            AppEvent::LoginCompleted => next.signed_in = true,
            AppEvent::LogoutRequested => {
                if state.logging_out {
                    return next;
                }
                next.logging_out = true;
                let session = self.session.clone();
                effects.spawn(async move {
                    if let Err(err) = session.clear_session().await {
                        warn!(error = %format!("{err:#}"), "app: failed to clear session");
                    }
                    AppEvent::LoggedOut
                });
            }
            AppEvent::LoggedOut => {
                info!("app: logged out");
                next.logging_out = false;
                next.signed_in = false;
                navigate(&mut next.route_stack, NavigationRequest::NavigateTo(Route::Login));
            }
            AppEvent::Notify(notification) => {
                let id = notification.id;
                next.notifications.push(notification);
                let ttl = self.notification_ttl;
                effects.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    AppEvent::NotificationExpired(id)
                });
            }
            AppEvent::NotificationExpired(id) | AppEvent::Ui(AppUiEvent::NotificationDismissed(id)) => {
                next.notifications
                    .retain(|notification| notification.id != id);
            }
        }
        next
    }

    fn map_to_ui_state(&self, state: &AppState) -> AppUiState {
        AppUiState {
            route: state.route_stack.last().cloned(),
            can_go_back: state.route_stack.len() > 1,
            signed_in: state.signed_in,
            notifications: state.notifications.clone(),
        }
    }

    fn on_attach(&self, _state: &AppState) -> Option<AppEvent> {
        Some(AppEvent::CheckSession)
    }

    fn on_bus_event(&self, event: &BusEvent) -> Option<AppEvent> {
        match event {
            BusEvent::Navigation(request) => Some(AppEvent::Navigate(request.clone())),
            BusEvent::Global(GlobalEvent::LoginCompleted) => Some(AppEvent::LoginCompleted),
            BusEvent::Global(GlobalEvent::LogoutRequested) => Some(AppEvent::LogoutRequested),
            BusEvent::Global(GlobalEvent::Notification(notification)) => {
                Some(AppEvent::Notify(notification.clone()))
            }
            BusEvent::Global(_) => None,
        }
    }
}
