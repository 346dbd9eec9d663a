//! Remote use-cases. Every call runs through a [`RemoteCallGuard`] with the
//! catalog of the feature it serves.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared::{
    domain::{AttachmentSummary, Comment, FileId, Report, ReportId, ReportSummary, Session},
    error::{ErrorException, SimpleError},
    protocol::{
        AddCommentRequest, CreateReportRequest, FileUploadResponse, LoginRequest, LoginResponse,
        ReportPage,
    },
};
use tracing::{info, warn};

use crate::{
    error::{catalogs, Classifier},
    guard::RemoteCallGuard,
    paging::{PageKey, PageSource},
    session::SessionStore,
    transport::{ApiRequest, Transport, TransportError},
};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
struct Classifiers {
    login: Arc<dyn Classifier>,
    report_list: Arc<dyn Classifier>,
    report_detail: Arc<dyn Classifier>,
    comments: Arc<dyn Classifier>,
    create_report: Arc<dyn Classifier>,
    attachments: Arc<dyn Classifier>,
}

impl Default for Classifiers {
    fn default() -> Self {
        Self {
            login: catalogs::login().into_classifier(),
            report_list: catalogs::report_list().into_classifier(),
            report_detail: catalogs::report_detail().into_classifier(),
            comments: catalogs::comments().into_classifier(),
            create_report: catalogs::create_report().into_classifier(),
            attachments: catalogs::attachments().into_classifier(),
        }
    }
}

#[derive(Clone)]
pub struct ReportsApi {
    transport: Arc<dyn Transport>,
    session: SessionStore,
    classifiers: Classifiers,
}

impl ReportsApi {
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self {
            transport,
            session,
            classifiers: Classifiers::default(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Signs in and persists the resulting session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ErrorException> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = RemoteCallGuard::classifying(Arc::clone(&self.classifiers.login))
            .run(async {
                let request = ApiRequest::post("auth/login").json(&body)?;
                self.transport.perform(request).await?.json()
            })
            .await?;

        let session = Session {
            user_id: response.user_id,
            username: username.to_string(),
            token: response.token,
        };
        if let Err(err) = self.session.save_session(&session).await {
            warn!(error = %format!("{err:#}"), "login: failed to persist session");
            return Err(ErrorException::Simple(SimpleError::generic()));
        }
        info!(user_id = session.user_id.0, "login: signed in");
        Ok(session)
    }

    pub async fn list_reports(
        &self,
        key: PageKey,
        page_size: usize,
    ) -> Result<Vec<ReportSummary>, ErrorException> {
        let request = ApiRequest::get("reports")
            .query("page", key)
            .query("page_size", page_size);
        let page: ReportPage = self.authorized(&self.classifiers.report_list, request).await?;
        Ok(page.items)
    }

    pub async fn get_report(&self, report_id: ReportId) -> Result<Report, ErrorException> {
        let request = ApiRequest::get(format!("reports/{}", report_id.0));
        self.authorized(&self.classifiers.report_detail, request)
            .await
    }

    pub async fn list_comments(&self, report_id: ReportId) -> Result<Vec<Comment>, ErrorException> {
        let request = ApiRequest::get(format!("reports/{}/comments", report_id.0));
        self.authorized(&self.classifiers.comments, request).await
    }

    /// Comments are secondary on the detail screen: an HTTP failure yields an
    /// empty list instead of an error.
    pub async fn list_comments_or_empty(
        &self,
        report_id: ReportId,
    ) -> Result<Vec<Comment>, ErrorException> {
        let request = ApiRequest::get(format!("reports/{}/comments", report_id.0));
        let guard = RemoteCallGuard::with_fallback(Vec::new);
        guard.run(self.perform_json(request)).await
    }

    pub async fn add_comment(
        &self,
        report_id: ReportId,
        body: &str,
    ) -> Result<Comment, ErrorException> {
        let payload = AddCommentRequest {
            body: body.to_string(),
        };
        let request = match ApiRequest::post(format!("reports/{}/comments", report_id.0)).json(&payload) {
            Ok(request) => request,
            Err(err) => return Err(SimpleError::generic().with_cause(err).into()),
        };
        self.authorized(&self.classifiers.comments, request).await
    }

    pub async fn create_report(
        &self,
        title: &str,
        description: &str,
        attachment_ids: Vec<FileId>,
    ) -> Result<Report, ErrorException> {
        let payload = CreateReportRequest {
            title: title.to_string(),
            description: description.to_string(),
            attachment_ids,
        };
        let request = match ApiRequest::post("reports").json(&payload) {
            Ok(request) => request,
            Err(err) => return Err(SimpleError::generic().with_cause(err).into()),
        };
        let report: Report = self
            .authorized(&self.classifiers.create_report, request)
            .await?;
        info!(report_id = report.report_id.0, "reports: created");
        Ok(report)
    }

    pub async fn upload_attachment(
        &self,
        upload: AttachmentUpload,
    ) -> Result<AttachmentSummary, ErrorException> {
        let mime_type = upload
            .mime_type
            .clone()
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let mut request = ApiRequest::post("files").query("filename", &upload.filename);
        if let Some(mime) = &upload.mime_type {
            request = request.query("mime_type", mime);
        }
        let request = request.bytes(mime_type, upload.bytes);
        let response: FileUploadResponse = self
            .authorized(&self.classifiers.attachments, request)
            .await?;
        Ok(response.into_summary(upload.filename, upload.mime_type))
    }

    async fn authorized<T: DeserializeOwned>(
        &self,
        classifier: &Arc<dyn Classifier>,
        request: ApiRequest,
    ) -> Result<T, ErrorException> {
        RemoteCallGuard::classifying(Arc::clone(classifier))
            .run(self.perform_json(request))
            .await
    }

    async fn perform_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, TransportError> {
        let token = self
            .session
            .token()
            .await
            .map_err(|err| TransportError::Other(format!("session unavailable: {err:#}")))?;
        self.transport.perform(request.bearer(token)).await?.json()
    }
}

/// Report summaries as a keyed page sequence.
#[derive(Clone)]
pub struct ReportsPageSource {
    api: ReportsApi,
}

impl ReportsPageSource {
    pub fn new(api: ReportsApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for ReportsPageSource {
    type Item = ReportSummary;

    async fn load_page(
        &self,
        key: PageKey,
        page_size: usize,
    ) -> Result<Vec<ReportSummary>, ErrorException> {
        self.api.list_reports(key, page_size).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
