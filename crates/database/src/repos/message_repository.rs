//! Repository for message data access operations.

use crate::entities::{CreateMessageRequest, Message, UpdateMessageRequest};
use crate::repos::attachment_repository::remove_attachment_file;
use crate::types::{ChatterError, ChatterResult};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tracing::info;

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
    attachments_dir: PathBuf,
}

impl MessageRepository {
    /// Create a new message repository. The attachments directory is
    /// needed because deleting a message cascades to its attachments'
    /// backing files.
    pub fn new(pool: SqlitePool, attachments_dir: PathBuf) -> Self {
        Self {
            pool,
            attachments_dir,
        }
    }

    /// Find message by ID
    pub async fn find_by_id(&self, messageid: i64) -> ChatterResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT messageid, content, chatroomid, senderid, timestamp
             FROM Message WHERE messageid = ?",
        )
        .bind(messageid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_message(&row)).transpose()
    }

    /// Load a message, failing with `MessageNotFound` when absent
    pub async fn get(&self, messageid: i64) -> ChatterResult<Message> {
        self.find_by_id(messageid)
            .await?
            .ok_or(ChatterError::MessageNotFound(messageid))
    }

    /// Messages of a chatroom with `timestamp` strictly greater than
    /// `since`; `None` means all of them.
    pub async fn find_by_chatroom(
        &self,
        chatroomid: i64,
        since: Option<i64>,
    ) -> ChatterResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT messageid, content, chatroomid, senderid, timestamp
             FROM Message WHERE chatroomid = ? AND timestamp > ?
             ORDER BY timestamp",
        )
        .bind(chatroomid)
        .bind(since.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        rows.iter().map(read_message).collect()
    }

    /// Message count under the same filter as `find_by_chatroom`
    pub async fn count_for_chatroom(
        &self,
        chatroomid: i64,
        since: Option<i64>,
    ) -> ChatterResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM Message WHERE chatroomid = ? AND timestamp > ?",
        )
        .bind(chatroomid)
        .bind(since.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        Ok(count)
    }

    /// All messages authored by a user
    pub async fn find_by_sender(&self, senderid: i64) -> ChatterResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT messageid, content, chatroomid, senderid, timestamp
             FROM Message WHERE senderid = ? ORDER BY timestamp",
        )
        .bind(senderid)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        rows.iter().map(read_message).collect()
    }

    /// Create a new message with a server-assigned timestamp
    pub async fn create(&self, request: &CreateMessageRequest) -> ChatterResult<Message> {
        let timestamp = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO Message (content, chatroomid, senderid, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.content)
        .bind(request.chatroomid)
        .bind(request.senderid)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        let messageid = result.last_insert_rowid();

        info!(
            messageid,
            chatroomid = request.chatroomid,
            senderid = request.senderid,
            "created new message"
        );

        Ok(Message {
            messageid,
            content: request.content.clone(),
            chatroomid: request.chatroomid,
            senderid: request.senderid,
            timestamp,
        })
    }

    /// Update a message field-by-field; unset request fields are left
    /// unchanged. All statements of one call commit together or not
    /// at all.
    pub async fn update(
        &self,
        messageid: i64,
        request: &UpdateMessageRequest,
    ) -> ChatterResult<Message> {
        self.get(messageid).await?;

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        if let Some(ref content) = request.content {
            sqlx::query("UPDATE Message SET content = ? WHERE messageid = ?")
                .bind(content)
                .bind(messageid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        if let Some(senderid) = request.senderid {
            sqlx::query("UPDATE Message SET senderid = ? WHERE messageid = ?")
                .bind(senderid)
                .bind(messageid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        tx.commit().await.map_err(ChatterError::database)?;

        self.get(messageid).await
    }

    /// Delete a message and its attachments. Attachment files are
    /// removed best-effort before the rows; the attachment rows and
    /// the message row go in one transaction. Files already removed
    /// from disk are not restored if that transaction rolls back.
    pub async fn delete(&self, messageid: i64) -> ChatterResult<()> {
        self.get(messageid).await?;

        let attachments = sqlx::query("SELECT filepath FROM Attachment WHERE messageid = ?")
            .bind(messageid)
            .fetch_all(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        for row in &attachments {
            let filepath: String = row.try_get("filepath").map_err(ChatterError::database)?;
            remove_attachment_file(&self.attachments_dir, &filepath).await;
        }

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        sqlx::query("DELETE FROM Attachment WHERE messageid = ?")
            .bind(messageid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        sqlx::query("DELETE FROM Message WHERE messageid = ?")
            .bind(messageid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        tx.commit().await.map_err(ChatterError::database)?;

        info!(
            messageid,
            attachments = attachments.len(),
            "deleted message"
        );

        Ok(())
    }
}

fn read_message(row: &sqlx::sqlite::SqliteRow) -> ChatterResult<Message> {
    Ok(Message {
        messageid: row.try_get("messageid").map_err(ChatterError::database)?,
        content: row.try_get("content").map_err(ChatterError::database)?,
        chatroomid: row.try_get("chatroomid").map_err(ChatterError::database)?,
        senderid: row.try_get("senderid").map_err(ChatterError::database)?,
        timestamp: row.try_get("timestamp").map_err(ChatterError::database)?,
    })
}
