//! Attachment entity definitions

use serde::{Deserialize, Serialize};

/// Read-only snapshot of an attachment row. `filepath` is relative to
/// the configured attachments directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachmentid: i64,
    pub messageid: i64,
    pub filepath: String,
}

/// Request for creating a new attachment referencing an existing message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttachmentRequest {
    pub messageid: i64,
    pub filepath: String,
}
