//! JSON projection of entities and their relational neighbourhood.
//!
//! Projections carry every scalar attribute plus the identifiers of
//! directly related entities; the chatroom "with messages" variant
//! instead embeds each message's full projection, including that
//! message's attachment projections. Field order is insertion order
//! and is part of the output contract, so `serde_json` runs with
//! `preserve_order` here.

use crate::types::{ChatterError, ChatterResult};
use serde_json::{json, Value};
use sqlx::{Row, SqlitePool};

/// Renders entities to JSON values. Every call queries the database
/// afresh, so a projection reflects the state at call time.
#[derive(Clone)]
pub struct Projector {
    pool: SqlitePool,
}

impl Projector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Render a value as indented, human-readable JSON text
    pub fn render(value: &Value) -> ChatterResult<String> {
        serde_json::to_string_pretty(value).map_err(|e| ChatterError::Serialization(e.to_string()))
    }

    /// Project a user: scalar attributes only
    pub async fn user(&self, userid: i64) -> ChatterResult<Value> {
        let row = sqlx::query(
            "SELECT userid, username, last_login_ts, admin, active FROM User WHERE userid = ?",
        )
        .bind(userid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?
        .ok_or(ChatterError::UserNotFound(userid))?;

        Ok(json!({
            "userid": row.try_get::<i64, _>("userid").map_err(ChatterError::database)?,
            "username": row.try_get::<String, _>("username").map_err(ChatterError::database)?,
            "last_login_ts": row.try_get::<i64, _>("last_login_ts").map_err(ChatterError::database)?,
            "admin": row.try_get::<i64, _>("admin").map_err(ChatterError::database)? != 0,
            "active": row.try_get::<i64, _>("active").map_err(ChatterError::database)? != 0,
        }))
    }

    /// Project an attachment: scalar attributes only
    pub async fn attachment(&self, attachmentid: i64) -> ChatterResult<Value> {
        let row = sqlx::query(
            "SELECT attachmentid, messageid, filepath FROM Attachment WHERE attachmentid = ?",
        )
        .bind(attachmentid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?
        .ok_or(ChatterError::AttachmentNotFound(attachmentid))?;

        Ok(json!({
            "attachmentid": row.try_get::<i64, _>("attachmentid").map_err(ChatterError::database)?,
            "messageid": row.try_get::<i64, _>("messageid").map_err(ChatterError::database)?,
            "filepath": row.try_get::<String, _>("filepath").map_err(ChatterError::database)?,
        }))
    }

    /// Project a message with its attachments as an identifier list
    pub async fn message(&self, messageid: i64) -> ChatterResult<Value> {
        self.message_value(messageid, false).await
    }

    /// Project a chatroom. Owners and members are always identifier
    /// lists; `with_messages` switches `messages` from identifiers to
    /// each message's full projection.
    pub async fn chatroom(&self, chatroomid: i64, with_messages: bool) -> ChatterResult<Value> {
        let row = sqlx::query(
            "SELECT chatroomid, name, description, joincode FROM Chatroom WHERE chatroomid = ?",
        )
        .bind(chatroomid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?
        .ok_or(ChatterError::ChatroomNotFound(chatroomid))?;

        let owners = self.member_ids(chatroomid, true).await?;
        let members = self.member_ids(chatroomid, false).await?;

        let message_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT messageid FROM Message WHERE chatroomid = ? ORDER BY timestamp",
        )
        .bind(chatroomid)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        let messages: Value = if with_messages {
            let mut projected = Vec::with_capacity(message_ids.len());
            for messageid in message_ids {
                projected.push(self.message_value(messageid, true).await?);
            }
            Value::Array(projected)
        } else {
            json!(message_ids)
        };

        Ok(json!({
            "chatroomid": row.try_get::<i64, _>("chatroomid").map_err(ChatterError::database)?,
            "name": row.try_get::<String, _>("name").map_err(ChatterError::database)?,
            "description": row.try_get::<String, _>("description").map_err(ChatterError::database)?,
            "joincode": row.try_get::<String, _>("joincode").map_err(ChatterError::database)?,
            "owners": owners,
            "members": members,
            "messages": messages,
        }))
    }

    async fn message_value(&self, messageid: i64, embed_attachments: bool) -> ChatterResult<Value> {
        let row = sqlx::query(
            "SELECT messageid, content, chatroomid, senderid, timestamp
             FROM Message WHERE messageid = ?",
        )
        .bind(messageid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?
        .ok_or(ChatterError::MessageNotFound(messageid))?;

        let attachment_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT attachmentid FROM Attachment WHERE messageid = ? ORDER BY attachmentid",
        )
        .bind(messageid)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        let attachments: Value = if embed_attachments {
            let mut projected = Vec::with_capacity(attachment_ids.len());
            for attachmentid in attachment_ids {
                projected.push(self.attachment(attachmentid).await?);
            }
            Value::Array(projected)
        } else {
            json!(attachment_ids)
        };

        Ok(json!({
            "messageid": row.try_get::<i64, _>("messageid").map_err(ChatterError::database)?,
            "content": row.try_get::<String, _>("content").map_err(ChatterError::database)?,
            "chatroomid": row.try_get::<i64, _>("chatroomid").map_err(ChatterError::database)?,
            "senderid": row.try_get::<i64, _>("senderid").map_err(ChatterError::database)?,
            "timestamp": row.try_get::<i64, _>("timestamp").map_err(ChatterError::database)?,
            "attachments": attachments,
        }))
    }

    async fn member_ids(&self, chatroomid: i64, owner: bool) -> ChatterResult<Vec<i64>> {
        sqlx::query_scalar(
            "SELECT userid FROM ChatroomMember WHERE chatroomid = ? AND owner = ? ORDER BY userid",
        )
        .bind(chatroomid)
        .bind(owner as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)
    }
}
