use shared::{
    domain::{AttachmentSummary, Report},
    error::{ErrorException, UiMessage},
};

use crate::{
    api::{AttachmentUpload, ReportsApi},
    controller::{Effects, Feature},
    error::catalogs::{DESCRIPTION_EMPTY, TITLE_EMPTY, TITLE_TOO_LONG},
    events_bus::{BusEvent, GlobalEvent, Notification},
};

use super::{notify_unplaced, surface_failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentStatus {
    Uploading,
    Uploaded(AttachmentSummary),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub local_id: u64,
    pub filename: String,
    pub status: AttachmentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateReportState {
    pub title: String,
    pub description: String,
    pub title_error: Option<UiMessage>,
    pub description_error: Option<UiMessage>,
    pub attachments: Vec<PendingAttachment>,
    pub saving: bool,
    next_local_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateReportUiEvent {
    TitleChanged(String),
    DescriptionChanged(String),
    AttachmentPicked(AttachmentUpload),
    AttachmentRemoved(u64),
    SaveClicked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateReportEvent {
    Ui(CreateReportUiEvent),
    /// Save triggered from outside the form, e.g. a toolbar action.
    SaveRequested,
    AttachmentUploaded {
        local_id: u64,
        attachment: AttachmentSummary,
    },
    AttachmentFailed {
        local_id: u64,
        error: ErrorException,
    },
    Saved(Report),
    SaveFailed(ErrorException),
}

impl From<CreateReportUiEvent> for CreateReportEvent {
    fn from(value: CreateReportUiEvent) -> Self {
        Self::Ui(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReportUiState {
    pub title: String,
    pub description: String,
    pub title_error: Option<UiMessage>,
    pub description_error: Option<UiMessage>,
    pub attachments: Vec<PendingAttachment>,
    pub saving: bool,
    pub save_enabled: bool,
}

pub struct CreateReportFeature {
    api: ReportsApi,
}

impl CreateReportFeature {
    pub fn new(api: ReportsApi) -> Self {
        Self { api }
    }

    fn save(
        &self,
        state: &CreateReportState,
        next: &mut CreateReportState,
        effects: &mut Effects<CreateReportEvent>,
    ) {
        if state.saving {
            return;
        }
        if state.has_pending_uploads() {
            effects.notify(Notification::new(UiMessage::AttachmentsPending));
            return;
        }

        next.saving = true;
        let api = self.api.clone();
        let title = state.title.clone();
        let description = state.description.clone();
        let attachment_ids = state
            .attachments
            .iter()
            .filter_map(|attachment| match &attachment.status {
                AttachmentStatus::Uploaded(summary) => Some(summary.file_id),
                _ => None,
            })
            .collect();
        effects.spawn(async move {
            match api.create_report(&title, &description, attachment_ids).await {
                Ok(report) => CreateReportEvent::Saved(report),
                Err(error) => CreateReportEvent::SaveFailed(error),
            }
        });
    }
}

impl CreateReportState {
    fn has_pending_uploads(&self) -> bool {
        self.attachments
            .iter()
            .any(|attachment| attachment.status == AttachmentStatus::Uploading)
    }

    fn attachment_mut(&mut self, local_id: u64) -> Option<&mut PendingAttachment> {
        self.attachments
            .iter_mut()
            .find(|attachment| attachment.local_id == local_id)
    }
}

impl Feature for CreateReportFeature {
    type State = CreateReportState;
    type Event = CreateReportEvent;
    type UiEvent = CreateReportUiEvent;
    type UiState = CreateReportUiState;

    fn name(&self) -> &'static str {
        "create_report"
    }

    fn fold(
        &self,
        state: &CreateReportState,
        event: CreateReportEvent,
        effects: &mut Effects<CreateReportEvent>,
    ) -> CreateReportState {
        let mut next = state.clone();
        match event {
            CreateReportEvent::Ui(CreateReportUiEvent::TitleChanged(title)) => {
                next.title = title;
                next.title_error = None;
            }
            CreateReportEvent::Ui(CreateReportUiEvent::DescriptionChanged(description)) => {
                next.description = description;
                next.description_error = None;
            }
            CreateReportEvent::Ui(CreateReportUiEvent::AttachmentPicked(upload)) => {
                let local_id = next.next_local_id;
                next.next_local_id += 1;
                next.attachments.push(PendingAttachment {
                    local_id,
                    filename: upload.filename.clone(),
                    status: AttachmentStatus::Uploading,
                });
                let api = self.api.clone();
                effects.spawn(async move {
                    match api.upload_attachment(upload).await {
                        Ok(attachment) => CreateReportEvent::AttachmentUploaded {
                            local_id,
                            attachment,
                        },
                        Err(error) => CreateReportEvent::AttachmentFailed { local_id, error },
                    }
                });
            }
            CreateReportEvent::Ui(CreateReportUiEvent::AttachmentRemoved(local_id)) => {
                next.attachments
                    .retain(|attachment| attachment.local_id != local_id);
            }
            CreateReportEvent::Ui(CreateReportUiEvent::SaveClicked)
            | CreateReportEvent::SaveRequested => self.save(state, &mut next, effects),
            CreateReportEvent::AttachmentUploaded {
                local_id,
                attachment,
            } => {
                // Ignored when the attachment was removed mid-upload.
                if let Some(pending) = next.attachment_mut(local_id) {
                    pending.status = AttachmentStatus::Uploaded(attachment);
                }
            }
            CreateReportEvent::AttachmentFailed { local_id, error } => {
                if let Some(pending) = next.attachment_mut(local_id) {
                    pending.status = AttachmentStatus::Failed;
                    for error in surface_failure(&error, effects) {
                        notify_unplaced(error, effects);
                    }
                }
            }
            CreateReportEvent::Saved(report) => {
                next = CreateReportState {
                    next_local_id: state.next_local_id,
                    ..CreateReportState::default()
                };
                effects.post_global(GlobalEvent::ReportCreated(report.report_id));
                effects.notify(Notification::new(UiMessage::ReportCreated));
                effects.navigate_back();
            }
            CreateReportEvent::SaveFailed(error) => {
                next.saving = false;
                for error in surface_failure(&error, effects) {
                    match error.code.as_str() {
                        TITLE_EMPTY | TITLE_TOO_LONG => next.title_error = Some(error.message),
                        DESCRIPTION_EMPTY => next.description_error = Some(error.message),
                        _ => notify_unplaced(error, effects),
                    }
                }
            }
        }
        next
    }

    fn map_to_ui_state(&self, state: &CreateReportState) -> CreateReportUiState {
        CreateReportUiState {
            title: state.title.clone(),
            description: state.description.clone(),
            title_error: state.title_error,
            description_error: state.description_error,
            attachments: state.attachments.clone(),
            saving: state.saving,
            save_enabled: !state.saving && !state.has_pending_uploads(),
        }
    }

    fn on_bus_event(&self, event: &BusEvent) -> Option<CreateReportEvent> {
        match event {
            BusEvent::Global(GlobalEvent::SaveRequested) => Some(CreateReportEvent::SaveRequested),
            _ => None,
        }
    }
}
