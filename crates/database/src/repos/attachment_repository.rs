//! Repository for attachment data access operations.
//!
//! Attachments span two failure domains: the database row and the file
//! on disk. File removal is always attempted first and is best-effort;
//! a missing or undeletable file is logged and never blocks the row
//! deletion. The reverse asymmetry holds too: a rolled-back row
//! deletion does not restore an already removed file.

use crate::entities::{Attachment, CreateAttachmentRequest};
use crate::types::{ChatterError, ChatterResult};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Best-effort removal of an attachment's backing file. Absence is not
/// an error; any failure is logged and swallowed.
pub(crate) async fn remove_attachment_file(base_dir: &Path, filepath: &str) {
    let full_path = base_dir.join(filepath);
    match tokio::fs::remove_file(&full_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %full_path.display(), "attachment file already absent");
        }
        Err(e) => {
            warn!(path = %full_path.display(), error = %e, "failed to remove attachment file");
        }
    }
}

/// Repository for attachment database operations
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: SqlitePool,
    attachments_dir: PathBuf,
}

impl AttachmentRepository {
    /// Create a new attachment repository. `attachments_dir` is the
    /// base directory that stored file paths are relative to.
    pub fn new(pool: SqlitePool, attachments_dir: PathBuf) -> Self {
        Self {
            pool,
            attachments_dir,
        }
    }

    /// Find attachment by ID
    pub async fn find_by_id(&self, attachmentid: i64) -> ChatterResult<Option<Attachment>> {
        let row = sqlx::query(
            "SELECT attachmentid, messageid, filepath FROM Attachment WHERE attachmentid = ?",
        )
        .bind(attachmentid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_attachment(&row)).transpose()
    }

    /// Load an attachment, failing with `AttachmentNotFound` when absent
    pub async fn get(&self, attachmentid: i64) -> ChatterResult<Attachment> {
        self.find_by_id(attachmentid)
            .await?
            .ok_or(ChatterError::AttachmentNotFound(attachmentid))
    }

    /// All attachments of a message
    pub async fn find_by_message_id(&self, messageid: i64) -> ChatterResult<Vec<Attachment>> {
        let rows = sqlx::query(
            "SELECT attachmentid, messageid, filepath FROM Attachment
             WHERE messageid = ? ORDER BY attachmentid",
        )
        .bind(messageid)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        rows.iter().map(read_attachment).collect()
    }

    /// Create a new attachment. The referenced message must exist.
    pub async fn create(&self, request: &CreateAttachmentRequest) -> ChatterResult<Attachment> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Message WHERE messageid = ?")
            .bind(request.messageid)
            .fetch_one(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        if exists == 0 {
            return Err(ChatterError::MessageNotFound(request.messageid));
        }

        let result = sqlx::query("INSERT INTO Attachment (messageid, filepath) VALUES (?, ?)")
            .bind(request.messageid)
            .bind(&request.filepath)
            .execute(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        let attachmentid = result.last_insert_rowid();

        info!(
            attachmentid,
            messageid = request.messageid,
            filepath = %request.filepath,
            "created new attachment"
        );

        Ok(Attachment {
            attachmentid,
            messageid: request.messageid,
            filepath: request.filepath.clone(),
        })
    }

    /// Delete an attachment: remove the referenced file (best-effort),
    /// then the database row.
    pub async fn delete(&self, attachmentid: i64) -> ChatterResult<()> {
        let attachment = self.get(attachmentid).await?;

        remove_attachment_file(&self.attachments_dir, &attachment.filepath).await;

        sqlx::query("DELETE FROM Attachment WHERE attachmentid = ?")
            .bind(attachmentid)
            .execute(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        info!(attachmentid, "deleted attachment");
        Ok(())
    }
}

fn read_attachment(row: &sqlx::sqlite::SqliteRow) -> ChatterResult<Attachment> {
    Ok(Attachment {
        attachmentid: row.try_get("attachmentid").map_err(ChatterError::database)?,
        messageid: row.try_get("messageid").map_err(ChatterError::database)?,
        filepath: row.try_get("filepath").map_err(ChatterError::database)?,
    })
}
