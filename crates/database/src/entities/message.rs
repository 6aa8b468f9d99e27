//! Message entity definitions

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of a message row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub messageid: i64,
    pub content: String,
    pub chatroomid: i64,
    pub senderid: i64,
    pub timestamp: i64,
}

impl Message {
    /// Send time as a datetime rather than a raw epoch value.
    pub fn sent_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Request for creating a new message; the timestamp is assigned by
/// the repository at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    pub content: String,
    pub chatroomid: i64,
    pub senderid: i64,
}

/// Request for updating an existing message; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    pub content: Option<String>,
    pub senderid: Option<i64>,
}
