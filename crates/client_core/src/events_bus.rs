//! Broadcast channels for cross-controller signaling.
//!
//! Two independent channels: navigation requests and global application
//! events. Posts are fire-and-forget; a post with no live subscriber is
//! dropped and late subscribers never see earlier posts.

use shared::{domain::ReportId, error::UiMessage};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Reports,
    ReportDetail(ReportId),
    CreateReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationRequest {
    NavigateTo(Route),
    NavigateBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub message: UiMessage,
    pub detail: Option<String>,
}

impl Notification {
    pub fn new(message: UiMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalEvent {
    LoginCompleted,
    LogoutRequested,
    Notification(Notification),
    SaveRequested,
    ReportCreated(ReportId),
    ReportChanged(ReportId),
}

/// Anything a controller may receive from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Navigation(NavigationRequest),
    Global(GlobalEvent),
}

#[derive(Debug, Clone)]
pub struct EventsBus {
    navigation: broadcast::Sender<NavigationRequest>,
    global: broadcast::Sender<GlobalEvent>,
}

impl EventsBus {
    pub fn new(capacity: usize) -> Self {
        let (navigation, _) = broadcast::channel(capacity.max(1));
        let (global, _) = broadcast::channel(capacity.max(1));
        Self { navigation, global }
    }

    pub fn post_navigate_to(&self, target: Route) {
        self.post_navigation(NavigationRequest::NavigateTo(target));
    }

    pub fn post_navigate_back(&self) {
        self.post_navigation(NavigationRequest::NavigateBack);
    }

    pub fn post_notification(&self, notification: Notification) {
        self.post_global_event(GlobalEvent::Notification(notification));
    }

    pub fn post_global_event(&self, event: GlobalEvent) {
        if self.global.send(event).is_err() {
            debug!("events bus: dropped global event without subscribers");
        }
    }

    fn post_navigation(&self, request: NavigationRequest) {
        if self.navigation.send(request).is_err() {
            debug!("events bus: dropped navigation request without subscribers");
        }
    }

    pub fn subscribe_navigation(&self) -> broadcast::Receiver<NavigationRequest> {
        self.navigation.subscribe()
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<GlobalEvent> {
        self.global.subscribe()
    }

    /// Subscribes to both channels at once.
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            navigation: Some(self.navigation.subscribe()),
            global: Some(self.global.subscribe()),
        }
    }
}

impl Default for EventsBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

pub struct BusSubscription {
    navigation: Option<broadcast::Receiver<NavigationRequest>>,
    global: Option<broadcast::Receiver<GlobalEvent>>,
}

impl BusSubscription {
    /// Next event from either channel; `None` once both channels are closed.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            let (navigation, global) = match (&mut self.navigation, &mut self.global) {
                (None, None) => return None,
                (Some(nav), None) => (Some(nav.recv().await), None),
                (None, Some(glob)) => (None, Some(glob.recv().await)),
                (Some(nav), Some(glob)) => tokio::select! {
                    result = nav.recv() => (Some(result), None),
                    result = glob.recv() => (None, Some(result)),
                },
            };

            if let Some(result) = navigation {
                match result {
                    Ok(request) => return Some(BusEvent::Navigation(request)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "events bus: navigation subscriber lagged");
                    }
                    Err(RecvError::Closed) => self.navigation = None,
                }
            }
            if let Some(result) = global {
                match result {
                    Ok(event) => return Some(BusEvent::Global(event)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "events bus: global subscriber lagged");
                    }
                    Err(RecvError::Closed) => self.global = None,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/events_bus_tests.rs"]
mod tests;
