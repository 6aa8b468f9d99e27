//! Repository for chatroom data access operations.

use crate::entities::{Chatroom, CreateChatroomRequest, UpdateChatroomRequest, JOINCODE_LEN};
use crate::repos::attachment_repository::remove_attachment_file;
use crate::types::{ChatterError, ChatterResult};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::PathBuf;
use tracing::info;

/// Repository for chatroom database operations
#[derive(Clone)]
pub struct ChatroomRepository {
    pool: SqlitePool,
    attachments_dir: PathBuf,
}

impl ChatroomRepository {
    /// Create a new chatroom repository. The attachments directory is
    /// needed because deleting a chatroom cascades through its
    /// messages to their attachments' backing files.
    pub fn new(pool: SqlitePool, attachments_dir: PathBuf) -> Self {
        Self {
            pool,
            attachments_dir,
        }
    }

    /// Find chatroom by ID
    pub async fn find_by_id(&self, chatroomid: i64) -> ChatterResult<Option<Chatroom>> {
        let row = sqlx::query(
            "SELECT chatroomid, name, description, joincode FROM Chatroom WHERE chatroomid = ?",
        )
        .bind(chatroomid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_chatroom(&row)).transpose()
    }

    /// Load a chatroom, failing with `ChatroomNotFound` when absent
    pub async fn get(&self, chatroomid: i64) -> ChatterResult<Chatroom> {
        self.find_by_id(chatroomid)
            .await?
            .ok_or(ChatterError::ChatroomNotFound(chatroomid))
    }

    /// Find chatroom by its unique name
    pub async fn find_by_name(&self, name: &str) -> ChatterResult<Option<Chatroom>> {
        let row = sqlx::query(
            "SELECT chatroomid, name, description, joincode FROM Chatroom WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_chatroom(&row)).transpose()
    }

    /// Find chatroom by its unique join code
    pub async fn find_by_joincode(&self, joincode: &str) -> ChatterResult<Option<Chatroom>> {
        let row = sqlx::query(
            "SELECT chatroomid, name, description, joincode FROM Chatroom WHERE joincode = ?",
        )
        .bind(joincode)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_chatroom(&row)).transpose()
    }

    /// Create a new chatroom with a freshly generated join code. The
    /// name must not already be taken; the creator is recorded as an
    /// owner member in the same transaction.
    pub async fn create(&self, request: &CreateChatroomRequest) -> ChatterResult<Chatroom> {
        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Chatroom WHERE name = ?")
            .bind(&request.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        if taken > 0 {
            return Err(ChatterError::NamingConflict(format!(
                "chatroom name '{}' already exists",
                request.name
            )));
        }

        let joincode = generate_joincode(&mut *tx).await?;

        let result = sqlx::query(
            "INSERT INTO Chatroom (name, description, joincode) VALUES (?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(&joincode)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            ChatterError::conflict_on_unique(
                e,
                &format!("chatroom name '{}' already exists", request.name),
            )
        })?;

        let chatroomid = result.last_insert_rowid();

        sqlx::query("INSERT INTO ChatroomMember (chatroomid, userid, owner) VALUES (?, ?, 1)")
            .bind(chatroomid)
            .bind(request.created_by)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        tx.commit().await.map_err(ChatterError::database)?;

        info!(
            chatroomid,
            name = %request.name,
            created_by = request.created_by,
            "created new chatroom"
        );

        self.get(chatroomid).await
    }

    /// Update a chatroom field-by-field; unset request fields are left
    /// unchanged. Name and join code changes are pre-checked against
    /// all other chatrooms inside the same transaction.
    pub async fn update(
        &self,
        chatroomid: i64,
        request: &UpdateChatroomRequest,
    ) -> ChatterResult<Chatroom> {
        self.get(chatroomid).await?;

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        if let Some(ref name) = request.name {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM Chatroom WHERE name = ? AND chatroomid != ?",
            )
            .bind(name)
            .bind(chatroomid)
            .fetch_one(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

            if taken > 0 {
                return Err(ChatterError::NamingConflict(format!(
                    "chatroom name '{name}' already exists"
                )));
            }

            sqlx::query("UPDATE Chatroom SET name = ? WHERE chatroomid = ?")
                .bind(name)
                .bind(chatroomid)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    ChatterError::conflict_on_unique(
                        e,
                        &format!("chatroom name '{name}' already exists"),
                    )
                })?;
        }

        if let Some(ref description) = request.description {
            sqlx::query("UPDATE Chatroom SET description = ? WHERE chatroomid = ?")
                .bind(description)
                .bind(chatroomid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        if let Some(ref joincode) = request.joincode {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM Chatroom WHERE joincode = ? AND chatroomid != ?",
            )
            .bind(joincode)
            .bind(chatroomid)
            .fetch_one(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

            if taken > 0 {
                return Err(ChatterError::NamingConflict(format!(
                    "join code '{joincode}' already exists"
                )));
            }

            sqlx::query("UPDATE Chatroom SET joincode = ? WHERE chatroomid = ?")
                .bind(joincode)
                .bind(chatroomid)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    ChatterError::conflict_on_unique(
                        e,
                        &format!("join code '{joincode}' already exists"),
                    )
                })?;
        }

        tx.commit().await.map_err(ChatterError::database)?;

        self.get(chatroomid).await
    }

    /// Replace the join code with a freshly generated unique one
    pub async fn regenerate_joincode(&self, chatroomid: i64) -> ChatterResult<Chatroom> {
        self.get(chatroomid).await?;

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        let joincode = generate_joincode(&mut *tx).await?;

        sqlx::query("UPDATE Chatroom SET joincode = ? WHERE chatroomid = ?")
            .bind(&joincode)
            .bind(chatroomid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        tx.commit().await.map_err(ChatterError::database)?;

        info!(chatroomid, "regenerated join code");

        self.get(chatroomid).await
    }

    /// Delete a chatroom and everything in it: each message's
    /// attachment files are removed best-effort, then the attachment
    /// rows, message rows, and the chatroom row go in one transaction.
    /// A failure rolls back every row, leaving the chatroom and its
    /// messages intact; files already removed are not restored.
    pub async fn delete(&self, chatroomid: i64) -> ChatterResult<()> {
        self.get(chatroomid).await?;

        let attachments = sqlx::query(
            "SELECT a.filepath FROM Attachment a
             JOIN Message m ON m.messageid = a.messageid
             WHERE m.chatroomid = ?",
        )
        .bind(chatroomid)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        for row in &attachments {
            let filepath: String = row.try_get("filepath").map_err(ChatterError::database)?;
            remove_attachment_file(&self.attachments_dir, &filepath).await;
        }

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        sqlx::query(
            "DELETE FROM Attachment WHERE messageid IN
             (SELECT messageid FROM Message WHERE chatroomid = ?)",
        )
        .bind(chatroomid)
        .execute(&mut *tx)
        .await
        .map_err(ChatterError::database)?;

        let messages = sqlx::query("DELETE FROM Message WHERE chatroomid = ?")
            .bind(chatroomid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?
            .rows_affected();

        sqlx::query("DELETE FROM Chatroom WHERE chatroomid = ?")
            .bind(chatroomid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        tx.commit().await.map_err(ChatterError::database)?;

        info!(
            chatroomid,
            messages,
            attachments = attachments.len(),
            "deleted chatroom"
        );

        Ok(())
    }
}

/// Generate a uniform-random join code over `[A-Za-z0-9]`, retrying
/// until no existing chatroom carries it. The check runs on the same
/// connection as the caller's insert, so within one transaction the
/// check-then-insert window is closed; concurrent creators are caught
/// by the UNIQUE constraint instead.
async fn generate_joincode(conn: &mut SqliteConnection) -> ChatterResult<String> {
    loop {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(JOINCODE_LEN)
            .map(char::from)
            .collect();

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Chatroom WHERE joincode = ?")
            .bind(&code)
            .fetch_one(&mut *conn)
            .await
            .map_err(ChatterError::database)?;

        if existing == 0 {
            return Ok(code);
        }
    }
}

fn read_chatroom(row: &sqlx::sqlite::SqliteRow) -> ChatterResult<Chatroom> {
    Ok(Chatroom {
        chatroomid: row.try_get("chatroomid").map_err(ChatterError::database)?,
        name: row.try_get("name").map_err(ChatterError::database)?,
        description: row.try_get("description").map_err(ChatterError::database)?,
        joincode: row.try_get("joincode").map_err(ChatterError::database)?,
    })
}
