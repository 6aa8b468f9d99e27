//! Chatroom entity definitions

use serde::{Deserialize, Serialize};

/// Number of characters in a join code.
pub const JOINCODE_LEN: usize = 6;

/// Read-only snapshot of a chatroom row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chatroom {
    pub chatroomid: i64,
    pub name: String,
    pub description: String,
    pub joincode: String,
}

/// Request for creating a new chatroom. The creator is granted an
/// owner membership in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatroomRequest {
    pub name: String,
    pub description: String,
    pub created_by: i64,
}

/// Request for updating an existing chatroom; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChatroomRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub joincode: Option<String>,
}
