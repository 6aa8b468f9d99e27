//! Error types for the persistence layer

use thiserror::Error;

/// Errors surfaced by the chatter persistence layer.
///
/// Every multi-statement mutation runs in a single transaction; when a
/// statement fails the transaction is rolled back before the error
/// reaches the caller, so `Database` never describes a partially
/// applied operation.
#[derive(Debug, Error)]
pub enum ChatterError {
    #[error("no user found with userid {0}")]
    UserNotFound(i64),

    #[error("no chatroom found with chatroomid {0}")]
    ChatroomNotFound(i64),

    #[error("no message found with messageid {0}")]
    MessageNotFound(i64),

    #[error("no attachment found with attachmentid {0}")]
    AttachmentNotFound(i64),

    #[error("naming conflict: {0}")]
    NamingConflict(String),

    #[error("user {actor} lacks permission to delete user {target}")]
    PermissionDenied { actor: i64, target: i64 },

    #[error("authentication failed for username {0}")]
    AuthenticationFailed(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ChatterError {
    /// Wrap an underlying sqlx failure.
    pub fn database(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }

    /// Translate UNIQUE-constraint violations into a naming conflict,
    /// anything else into a database error. Used on inserts/updates of
    /// the attributes that carry application-level uniqueness
    /// (username, chatroom name, join code) so that a row slipping
    /// past the in-transaction pre-check still reports the right kind.
    pub fn conflict_on_unique(err: sqlx::Error, what: &str) -> Self {
        if err.to_string().contains("UNIQUE constraint failed") {
            Self::NamingConflict(what.to_string())
        } else {
            Self::database(err)
        }
    }
}
