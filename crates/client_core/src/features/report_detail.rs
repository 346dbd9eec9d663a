use shared::{
    domain::{Comment, Report, ReportId},
    error::{ErrorException, UiMessage},
};

use crate::{
    api::ReportsApi,
    controller::{Effects, Feature},
    error::catalogs::{COMMENT_EMPTY, COMMENT_TOO_LONG, REPORT_NOT_FOUND},
    events_bus::GlobalEvent,
};

use super::{notify_unplaced, surface_failure};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDetailState {
    pub report: Option<Report>,
    pub comments: Vec<Comment>,
    pub draft: String,
    pub comment_error: Option<UiMessage>,
    pub loading: bool,
    pub sending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDetailUiEvent {
    Reload,
    CommentChanged(String),
    SendCommentClicked,
    BackClicked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportDetailEvent {
    Ui(ReportDetailUiEvent),
    Loaded {
        report: Report,
        comments: Vec<Comment>,
    },
    LoadFailed(ErrorException),
    CommentAdded(Comment),
    CommentFailed(ErrorException),
}

impl From<ReportDetailUiEvent> for ReportDetailEvent {
    fn from(value: ReportDetailUiEvent) -> Self {
        Self::Ui(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDetailUiState {
    pub report: Option<Report>,
    pub comments: Vec<Comment>,
    pub draft: String,
    pub comment_error: Option<UiMessage>,
    pub loading: bool,
    pub sending: bool,
    pub send_enabled: bool,
}

pub struct ReportDetailFeature {
    api: ReportsApi,
    report_id: ReportId,
}

impl ReportDetailFeature {
    pub fn new(api: ReportsApi, report_id: ReportId) -> Self {
        Self { api, report_id }
    }

    fn load(&self, effects: &mut Effects<ReportDetailEvent>) {
        let api = self.api.clone();
        let report_id = self.report_id;
        effects.spawn(async move {
            let (report, comments) = futures::join!(
                api.get_report(report_id),
                api.list_comments_or_empty(report_id)
            );
            match (report, comments) {
                (Ok(report), Ok(comments)) => ReportDetailEvent::Loaded { report, comments },
                (Err(error), _) | (_, Err(error)) => ReportDetailEvent::LoadFailed(error),
            }
        });
    }
}

impl Feature for ReportDetailFeature {
    type State = ReportDetailState;
    type Event = ReportDetailEvent;
    type UiEvent = ReportDetailUiEvent;
    type UiState = ReportDetailUiState;

    fn name(&self) -> &'static str {
        "report_detail"
    }

    fn fold(
        &self,
        state: &ReportDetailState,
        event: ReportDetailEvent,
        effects: &mut Effects<ReportDetailEvent>,
    ) -> ReportDetailState {
        let mut next = state.clone();
        match event {
            ReportDetailEvent::Ui(ReportDetailUiEvent::Reload) => {
                if !state.loading {
                    next.loading = true;
                    self.load(effects);
                }
            }
            ReportDetailEvent::Ui(ReportDetailUiEvent::CommentChanged(draft)) => {
                next.draft = draft;
                next.comment_error = None;
            }
            ReportDetailEvent::Ui(ReportDetailUiEvent::SendCommentClicked) => {
                if state.sending {
                    return next;
                }
                next.sending = true;
                let api = self.api.clone();
                let report_id = self.report_id;
                let body = state.draft.clone();
                effects.spawn(async move {
                    match api.add_comment(report_id, &body).await {
                        Ok(comment) => ReportDetailEvent::CommentAdded(comment),
                        Err(error) => ReportDetailEvent::CommentFailed(error),
                    }
                });
            }
            ReportDetailEvent::Ui(ReportDetailUiEvent::BackClicked) => effects.navigate_back(),
            ReportDetailEvent::Loaded { report, comments } => {
                next.loading = false;
                next.report = Some(report);
                next.comments = comments;
            }
            ReportDetailEvent::LoadFailed(error) => {
                next.loading = false;
                surface_failure(&error, effects);
                let missing = error
                    .simple_errors()
                    .iter()
                    .any(|simple| simple.code == REPORT_NOT_FOUND);
                if missing {
                    effects.navigate_back();
                }
            }
            ReportDetailEvent::CommentAdded(comment) => {
                next.sending = false;
                next.draft.clear();
                next.comments.push(comment);
                effects.post_global(GlobalEvent::ReportChanged(self.report_id));
            }
            ReportDetailEvent::CommentFailed(error) => {
                next.sending = false;
                for error in surface_failure(&error, effects) {
                    match error.code.as_str() {
                        COMMENT_EMPTY | COMMENT_TOO_LONG if next.comment_error.is_none() => {
                            next.comment_error = Some(error.message);
                        }
                        COMMENT_EMPTY | COMMENT_TOO_LONG => {}
                        _ => notify_unplaced(error, effects),
                    }
                }
            }
        }
        next
    }

    fn map_to_ui_state(&self, state: &ReportDetailState) -> ReportDetailUiState {
        ReportDetailUiState {
            report: state.report.clone(),
            comments: state.comments.clone(),
            draft: state.draft.clone(),
            comment_error: state.comment_error,
            loading: state.loading,
            sending: state.sending,
            send_enabled: !state.sending && state.report.is_some(),
        }
    }

    fn on_attach(&self, state: &ReportDetailState) -> Option<ReportDetailEvent> {
        state
            .report
            .is_none()
            .then_some(ReportDetailEvent::Ui(ReportDetailUiEvent::Reload))
    }
}
