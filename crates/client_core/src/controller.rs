//! Event-sourced controller engine.
//!
//! A [`Controller`] owns one feature's `State` and folds every submitted
//! event into it on a single worker task, so the fold never runs
//! concurrently with itself. Asynchronous work is only ever scheduled from a
//! fold through [`Effects`]; its result comes back as a new event on the same
//! queue. Every fold publishes a fresh `UiState` on a replay-of-one channel.

use std::{
    future::Future,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use futures::future::BoxFuture;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info};

use crate::events_bus::{BusEvent, EventsBus, GlobalEvent, NavigationRequest, Notification, Route};

/// Behavior of one feature: a pure fold, a pure projection and lifecycle
/// callbacks. The engine supplies queueing, task ownership and publication.
pub trait Feature: Send + Sync + 'static {
    type State: Clone + Default + Send + Sync + 'static;
    type Event: Send + 'static;
    /// User-triggered subset of `Event`.
    type UiEvent: Into<Self::Event> + Send + 'static;
    type UiState: Clone + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn fold(
        &self,
        state: &Self::State,
        event: Self::Event,
        effects: &mut Effects<Self::Event>,
    ) -> Self::State;

    fn map_to_ui_state(&self, state: &Self::State) -> Self::UiState;

    /// Bootstrap event submitted on every UI attachment.
    fn on_attach(&self, _state: &Self::State) -> Option<Self::Event> {
        None
    }

    fn on_detach(&self, _state: &Self::State) {}

    /// Maps bus traffic received while attached into feature events.
    fn on_bus_event(&self, _event: &BusEvent) -> Option<Self::Event> {
        None
    }
}

/// Work recorded by a fold step, started by the worker once the fold returns.
pub struct Effects<E> {
    scheduled: Vec<Scheduled<E>>,
}

enum Scheduled<E> {
    Task(BoxFuture<'static, E>),
    Post(BusEvent),
}

impl<E: Send + 'static> Effects<E> {
    pub fn new() -> Self {
        Self {
            scheduled: Vec::new(),
        }
    }

    /// Schedules a child task whose output is submitted back as an event.
    pub fn spawn<Fut>(&mut self, task: Fut)
    where
        Fut: Future<Output = E> + Send + 'static,
    {
        self.scheduled.push(Scheduled::Task(Box::pin(task)));
    }

    pub fn navigate_to(&mut self, route: Route) {
        self.scheduled.push(Scheduled::Post(BusEvent::Navigation(
            NavigationRequest::NavigateTo(route),
        )));
    }

    pub fn navigate_back(&mut self) {
        self.scheduled.push(Scheduled::Post(BusEvent::Navigation(
            NavigationRequest::NavigateBack,
        )));
    }

    pub fn notify(&mut self, notification: Notification) {
        self.post_global(GlobalEvent::Notification(notification));
    }

    pub fn post_global(&mut self, event: GlobalEvent) {
        self.scheduled.push(Scheduled::Post(BusEvent::Global(event)));
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.scheduled
            .iter()
            .filter(|item| matches!(item, Scheduled::Task(_)))
            .count()
    }

    pub fn bus_posts(&self) -> Vec<BusEvent> {
        self.scheduled
            .iter()
            .filter_map(|item| match item {
                Scheduled::Post(event) => Some(event.clone()),
                Scheduled::Task(_) => None,
            })
            .collect()
    }

    /// Takes the scheduled child tasks out, dropping bus posts.
    pub fn into_tasks(self) -> Vec<BoxFuture<'static, E>> {
        self.scheduled
            .into_iter()
            .filter_map(|item| match item {
                Scheduled::Task(task) => Some(task),
                Scheduled::Post(_) => None,
            })
            .collect()
    }

    fn apply(self, bus: &EventsBus, tasks: &TaskRegistry, events_tx: &mpsc::UnboundedSender<E>) {
        for item in self.scheduled {
            match item {
                Scheduled::Post(BusEvent::Navigation(NavigationRequest::NavigateTo(route))) => {
                    bus.post_navigate_to(route)
                }
                Scheduled::Post(BusEvent::Navigation(NavigationRequest::NavigateBack)) => {
                    bus.post_navigate_back()
                }
                Scheduled::Post(BusEvent::Global(event)) => bus.post_global_event(event),
                Scheduled::Task(task) => {
                    let events_tx = events_tx.clone();
                    tasks.spawn(async move {
                        let event = task.await;
                        let _ = events_tx.send(event);
                    });
                }
            }
        }
    }
}

impl<E: Send + 'static> Default for Effects<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Child tasks owned by one controller; all aborted together on shutdown.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    shut_down: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.handles();
        if self.shut_down.load(Ordering::Acquire) {
            return false;
        }
        handles.retain(|handle| !handle.is_finished());
        handles.push(tokio::spawn(fut));
        true
    }

    pub fn active(&self) -> usize {
        self.handles()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn shutdown(&self) {
        let mut handles = self.handles();
        self.shut_down.store(true, Ordering::Release);
        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    fn handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct Controller<F: Feature> {
    feature: Arc<F>,
    bus: EventsBus,
    events_tx: mpsc::UnboundedSender<F::Event>,
    state_tx: Arc<watch::Sender<F::State>>,
    ui_state_tx: Arc<watch::Sender<F::UiState>>,
    tasks: Arc<TaskRegistry>,
    destroyed: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl<F: Feature> Controller<F> {
    /// Builds the controller and starts its worker on the current runtime.
    pub fn new(feature: F, bus: EventsBus) -> Self {
        let feature = Arc::new(feature);
        let state = F::State::default();
        let ui_state = feature.map_to_ui_state(&state);
        let (state_tx, _) = watch::channel(state);
        let (ui_state_tx, _) = watch::channel(ui_state);
        let state_tx = Arc::new(state_tx);
        let ui_state_tx = Arc::new(ui_state_tx);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let tasks = Arc::new(TaskRegistry::new());
        let destroyed = Arc::new(AtomicBool::new(false));

        let worker = tokio::spawn(run_worker(Worker {
            feature: Arc::clone(&feature),
            bus: bus.clone(),
            events_tx: events_tx.clone(),
            events_rx,
            state_tx: Arc::clone(&state_tx),
            ui_state_tx: Arc::clone(&ui_state_tx),
            tasks: Arc::clone(&tasks),
            destroyed: Arc::clone(&destroyed),
        }));
        info!(feature = feature.name(), "controller: started");

        Self {
            feature,
            bus,
            events_tx,
            state_tx,
            ui_state_tx,
            tasks,
            destroyed,
            worker,
            subscription: Mutex::new(None),
        }
    }

    pub fn submit(&self, event: impl Into<F::Event>) {
        if self.is_destroyed() {
            debug!(feature = self.feature.name(), "controller: submit after destroy ignored");
            return;
        }
        let _ = self.events_tx.send(event.into());
    }

    pub fn submit_ui(&self, event: F::UiEvent) {
        self.submit(event);
    }

    /// Receiver that already holds the latest UiState.
    pub fn ui_state(&self) -> watch::Receiver<F::UiState> {
        self.ui_state_tx.subscribe()
    }

    pub fn ui_state_stream(&self) -> WatchStream<F::UiState> {
        WatchStream::new(self.ui_state())
    }

    pub fn current_ui_state(&self) -> F::UiState {
        self.ui_state_tx.borrow().clone()
    }

    /// Snapshot of the State as of the last completed fold.
    pub fn state(&self) -> F::State {
        self.state_tx.borrow().clone()
    }

    /// Resolves with the first UiState, current or future, matching `predicate`.
    pub async fn wait_for_ui_state(
        &self,
        mut predicate: impl FnMut(&F::UiState) -> bool,
    ) -> F::UiState {
        let mut rx = self.ui_state();
        loop {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    pub fn on_attach(&self) {
        if self.is_destroyed() {
            return;
        }

        // Subscribe before returning so posts made right after attach are seen.
        let mut subscription = self.bus.subscribe();
        let feature = Arc::clone(&self.feature);
        let events_tx = self.events_tx.clone();
        let destroyed = Arc::clone(&self.destroyed);
        let handle = tokio::spawn(async move {
            while let Some(bus_event) = subscription.recv().await {
                if destroyed.load(Ordering::Acquire) {
                    break;
                }
                if let Some(event) = feature.on_bus_event(&bus_event) {
                    if events_tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });
        if let Some(previous) = self.subscription_slot().replace(handle) {
            previous.abort();
        }

        debug!(feature = self.feature.name(), "controller: attached");
        if let Some(event) = self.feature.on_attach(&self.state()) {
            self.submit(event);
        }
    }

    pub fn on_detach(&self) {
        if let Some(handle) = self.subscription_slot().take() {
            handle.abort();
        }
        self.feature.on_detach(&self.state());
        debug!(feature = self.feature.name(), "controller: detached");
    }

    pub fn is_attached(&self) -> bool {
        self.subscription_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn active_tasks(&self) -> usize {
        self.tasks.active()
    }

    /// Cancels child tasks and the bus subscription and discards queued
    /// events. A fold already running completes first.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.tasks.shutdown();
        if let Some(handle) = self.subscription_slot().take() {
            handle.abort();
        }
        self.worker.abort();
        info!(feature = self.feature.name(), "controller: destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn subscription_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<F: Feature> Drop for Controller<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

struct Worker<F: Feature> {
    feature: Arc<F>,
    bus: EventsBus,
    events_tx: mpsc::UnboundedSender<F::Event>,
    events_rx: mpsc::UnboundedReceiver<F::Event>,
    state_tx: Arc<watch::Sender<F::State>>,
    ui_state_tx: Arc<watch::Sender<F::UiState>>,
    tasks: Arc<TaskRegistry>,
    destroyed: Arc<AtomicBool>,
}

async fn run_worker<F: Feature>(mut worker: Worker<F>) {
    let mut state = worker.state_tx.borrow().clone();

    while let Some(event) = worker.events_rx.recv().await {
        if worker.destroyed.load(Ordering::Acquire) {
            break;
        }

        let mut effects = Effects::new();
        let folded = catch_unwind(AssertUnwindSafe(|| {
            worker.feature.fold(&state, event, &mut effects)
        }));
        let next = match folded {
            Ok(next) => next,
            Err(_) => {
                error!(
                    feature = worker.feature.name(),
                    "controller: fold panicked, stopping worker"
                );
                worker.destroyed.store(true, Ordering::Release);
                worker.tasks.shutdown();
                break;
            }
        };

        state = next;
        let destroyed = worker.destroyed.load(Ordering::Acquire);
        // Bus posts land before the UiState that reflects them.
        if !destroyed {
            effects.apply(&worker.bus, &worker.tasks, &worker.events_tx);
        }
        worker.state_tx.send_replace(state.clone());
        worker
            .ui_state_tx
            .send_replace(worker.feature.map_to_ui_state(&state));
        if destroyed {
            break;
        }
    }

    debug!(feature = worker.feature.name(), "controller: worker stopped");
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
