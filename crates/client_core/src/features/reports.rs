use std::sync::Arc;

use shared::{
    domain::{ReportId, ReportSummary},
    error::UiMessage,
};

use crate::{
    controller::{Effects, Feature},
    events_bus::{BusEvent, GlobalEvent, Route},
    paging::{self, PageLoadResult, PageRequest, PageSource, PagingEngine},
};

use super::surface_failure;

/// Rows from either edge of the loaded range that trigger the adjacent page.
const PREFETCH_DISTANCE: usize = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportListState {
    pub paging: PagingEngine<ReportSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportListUiEvent {
    Refresh,
    LoadMore,
    /// The row at this position became visible.
    ItemViewed(usize),
    ReportClicked(ReportId),
    CreateClicked,
    LogoutClicked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportListEvent {
    Ui(ReportListUiEvent),
    PageLoaded(PageLoadResult<ReportSummary>),
    ListChanged,
}

impl From<ReportListUiEvent> for ReportListEvent {
    fn from(value: ReportListUiEvent) -> Self {
        Self::Ui(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportListUiState {
    pub items: Vec<ReportSummary>,
    pub loading: bool,
    pub error: Option<UiMessage>,
    pub end_reached: bool,
}

pub struct ReportListFeature {
    source: Arc<dyn PageSource<Item = ReportSummary>>,
    page_size: usize,
}

impl ReportListFeature {
    pub fn new(source: Arc<dyn PageSource<Item = ReportSummary>>, page_size: usize) -> Self {
        Self { source, page_size }
    }

    fn load(&self, request: PageRequest, effects: &mut Effects<ReportListEvent>) {
        let source = Arc::clone(&self.source);
        effects.spawn(async move {
            ReportListEvent::PageLoaded(paging::fetch(source.as_ref(), request).await)
        });
    }

    fn refresh(&self, next: &mut ReportListState, effects: &mut Effects<ReportListEvent>) {
        next.paging = std::mem::take(&mut next.paging).with_page_size(self.page_size);
        let request = next.paging.begin_refresh();
        self.load(request, effects);
    }
}

impl Feature for ReportListFeature {
    type State = ReportListState;
    type Event = ReportListEvent;
    type UiEvent = ReportListUiEvent;
    type UiState = ReportListUiState;

    fn name(&self) -> &'static str {
        "report_list"
    }

    fn fold(
        &self,
        state: &ReportListState,
        event: ReportListEvent,
        effects: &mut Effects<ReportListEvent>,
    ) -> ReportListState {
        let mut next = state.clone();
        match event {
            ReportListEvent::Ui(ReportListUiEvent::Refresh) => self.refresh(&mut next, effects),
            ReportListEvent::Ui(ReportListUiEvent::LoadMore) => {
                if let Some(request) = next.paging.begin_next() {
                    self.load(request, effects);
                }
            }
            ReportListEvent::Ui(ReportListUiEvent::ItemViewed(position)) => {
                next.paging.set_anchor(position);
                // A failed load is only retried by LoadMore or Refresh.
                let request = if next.paging.error().is_some() {
                    None
                } else if position < PREFETCH_DISTANCE && next.paging.can_prepend() {
                    next.paging.begin_prev()
                } else if position + PREFETCH_DISTANCE >= next.paging.len()
                    && !next.paging.end_reached()
                {
                    next.paging.begin_next()
                } else {
                    None
                };
                if let Some(request) = request {
                    self.load(request, effects);
                }
            }
            ReportListEvent::Ui(ReportListUiEvent::ReportClicked(report_id)) => {
                effects.navigate_to(Route::ReportDetail(report_id));
            }
            ReportListEvent::Ui(ReportListUiEvent::CreateClicked) => {
                effects.navigate_to(Route::CreateReport);
            }
            ReportListEvent::Ui(ReportListUiEvent::LogoutClicked) => {
                effects.post_global(GlobalEvent::LogoutRequested);
            }
            ReportListEvent::PageLoaded(result) => {
                let failure = result.outcome.as_ref().err().cloned();
                if next.paging.apply(result) {
                    if let Some(error) = failure {
                        surface_failure(&error, effects);
                    }
                }
            }
            ReportListEvent::ListChanged => {
                next.paging.invalidate();
                self.refresh(&mut next, effects);
            }
        }
        next
    }

    fn map_to_ui_state(&self, state: &ReportListState) -> ReportListUiState {
        let error = state.paging.error().map(|error| {
            error
                .simple_errors()
                .first()
                .map(|simple| simple.message)
                .unwrap_or(UiMessage::SessionExpired)
        });
        ReportListUiState {
            items: state.paging.items().cloned().collect(),
            loading: state.paging.is_loading(),
            error,
            end_reached: state.paging.end_reached(),
        }
    }

    fn on_attach(&self, state: &ReportListState) -> Option<ReportListEvent> {
        (state.paging.is_empty() && !state.paging.is_loading())
            .then_some(ReportListEvent::Ui(ReportListUiEvent::Refresh))
    }

    fn on_bus_event(&self, event: &BusEvent) -> Option<ReportListEvent> {
        match event {
            BusEvent::Global(GlobalEvent::ReportCreated(_) | GlobalEvent::ReportChanged(_)) => {
                Some(ReportListEvent::ListChanged)
            }
            _ => None,
        }
    }
}
