use serde::{Deserialize, Serialize};

use crate::domain::{AttachmentSummary, FileId, ReportSummary, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPage {
    pub items: Vec<ReportSummary>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportRequest {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_ids: Vec<FileId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub file_id: FileId,
    pub size_bytes: u64,
}

impl FileUploadResponse {
    pub fn into_summary(self, filename: String, mime_type: Option<String>) -> AttachmentSummary {
        AttachmentSummary {
            file_id: self.file_id,
            filename,
            size_bytes: self.size_bytes,
            mime_type,
        }
    }
}
