//! User repository for database operations.

use crate::entities::{CreateUserRequest, UpdateUserRequest, User, DELETED_USER_ID};
use crate::types::{ChatterError, ChatterResult};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, userid: i64) -> ChatterResult<Option<User>> {
        let row = sqlx::query(
            "SELECT userid, username, last_login_ts, admin, active FROM User WHERE userid = ?",
        )
        .bind(userid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_user(&row)).transpose()
    }

    /// Load a user, failing with `UserNotFound` when the id is absent
    pub async fn get(&self, userid: i64) -> ChatterResult<User> {
        self.find_by_id(userid)
            .await?
            .ok_or(ChatterError::UserNotFound(userid))
    }

    /// Find user by username
    pub async fn find_by_username(&self, username: &str) -> ChatterResult<Option<User>> {
        let row = sqlx::query(
            "SELECT userid, username, last_login_ts, admin, active FROM User WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| read_user(&row)).transpose()
    }

    /// Create a new user. The username must not already be taken.
    pub async fn create(&self, request: &CreateUserRequest) -> ChatterResult<User> {
        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM User WHERE username = ?")
            .bind(&request.username)
            .fetch_one(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        if taken > 0 {
            return Err(ChatterError::NamingConflict(format!(
                "username '{}' already exists",
                request.username
            )));
        }

        let result = sqlx::query(
            "INSERT INTO User (username, password, last_login_ts, admin, active)
             VALUES (?, ?, 0, ?, 1)",
        )
        .bind(&request.username)
        .bind(&request.password)
        .bind(request.admin as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            ChatterError::conflict_on_unique(
                e,
                &format!("username '{}' already exists", request.username),
            )
        })?;

        let userid = result.last_insert_rowid();
        tx.commit().await.map_err(ChatterError::database)?;

        info!(userid, username = %request.username, "created new user");

        self.get(userid).await
    }

    /// Update a user field-by-field; unset request fields are left
    /// unchanged. All statements of one call commit together or not
    /// at all.
    pub async fn update(&self, userid: i64, request: &UpdateUserRequest) -> ChatterResult<User> {
        // Fail early with the entity-specific error if the row is gone.
        self.get(userid).await?;

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        if let Some(ref username) = request.username {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM User WHERE username = ? AND userid != ?",
            )
            .bind(username)
            .bind(userid)
            .fetch_one(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

            if taken > 0 {
                return Err(ChatterError::NamingConflict(format!(
                    "username '{username}' already exists"
                )));
            }

            sqlx::query("UPDATE User SET username = ? WHERE userid = ?")
                .bind(username)
                .bind(userid)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    ChatterError::conflict_on_unique(
                        e,
                        &format!("username '{username}' already exists"),
                    )
                })?;
        }

        if let Some(ref password) = request.password {
            sqlx::query("UPDATE User SET password = ? WHERE userid = ?")
                .bind(password)
                .bind(userid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        if let Some(last_login_ts) = request.last_login_ts {
            sqlx::query("UPDATE User SET last_login_ts = ? WHERE userid = ?")
                .bind(last_login_ts)
                .bind(userid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        if let Some(admin) = request.admin {
            sqlx::query("UPDATE User SET admin = ? WHERE userid = ?")
                .bind(admin as i64)
                .bind(userid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        if let Some(active) = request.active {
            sqlx::query("UPDATE User SET active = ? WHERE userid = ?")
                .bind(active as i64)
                .bind(userid)
                .execute(&mut *tx)
                .await
                .map_err(ChatterError::database)?;
        }

        tx.commit().await.map_err(ChatterError::database)?;

        self.get(userid).await
    }

    /// Delete a user. Permitted only for the user themselves or an
    /// admin. Messages authored by the user are reassigned to the
    /// sentinel user in the same transaction as the row deletion, so a
    /// failure leaves every message with its original sender.
    ///
    /// Whether the user is the sole owner of any chatroom is not
    /// checked; callers must not rely on owner continuity.
    pub async fn delete(&self, userid: i64, acting_user: &User) -> ChatterResult<()> {
        if acting_user.userid != userid && !acting_user.admin {
            return Err(ChatterError::PermissionDenied {
                actor: acting_user.userid,
                target: userid,
            });
        }

        self.get(userid).await?;

        let mut tx = self.pool.begin().await.map_err(ChatterError::database)?;

        let reassigned = sqlx::query("UPDATE Message SET senderid = ? WHERE senderid = ?")
            .bind(DELETED_USER_ID)
            .bind(userid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?
            .rows_affected();

        // Membership rows reference User; they go with the row.
        sqlx::query("DELETE FROM ChatroomMember WHERE userid = ?")
            .bind(userid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        sqlx::query("DELETE FROM User WHERE userid = ?")
            .bind(userid)
            .execute(&mut *tx)
            .await
            .map_err(ChatterError::database)?;

        tx.commit().await.map_err(ChatterError::database)?;

        info!(
            userid,
            deleted_by = acting_user.userid,
            reassigned_messages = reassigned,
            "deleted user"
        );

        Ok(())
    }

    /// Authenticate by username and password. Passwords are stored and
    /// compared verbatim; hashing is outside this layer's scope.
    /// Inactive users cannot authenticate. A successful login stamps
    /// `last_login_ts` with the current epoch seconds.
    pub async fn authenticate(&self, username: &str, password: &str) -> ChatterResult<User> {
        let row = sqlx::query("SELECT userid, password, active FROM User WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        let Some(row) = row else {
            return Err(ChatterError::AuthenticationFailed(username.to_string()));
        };

        let stored: String = row.try_get("password").map_err(ChatterError::database)?;
        let active: i64 = row.try_get("active").map_err(ChatterError::database)?;

        if stored != password || active == 0 {
            return Err(ChatterError::AuthenticationFailed(username.to_string()));
        }

        let userid: i64 = row.try_get("userid").map_err(ChatterError::database)?;
        let now = Utc::now().timestamp();

        sqlx::query("UPDATE User SET last_login_ts = ? WHERE userid = ?")
            .bind(now)
            .bind(userid)
            .execute(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        info!(userid, username, "user authenticated");

        self.get(userid).await
    }
}

fn read_user(row: &sqlx::sqlite::SqliteRow) -> ChatterResult<User> {
    Ok(User {
        userid: row.try_get("userid").map_err(ChatterError::database)?,
        username: row.try_get("username").map_err(ChatterError::database)?,
        last_login_ts: row
            .try_get("last_login_ts")
            .map_err(ChatterError::database)?,
        admin: row.try_get::<i64, _>("admin").map_err(ChatterError::database)? != 0,
        active: row.try_get::<i64, _>("active").map_err(ChatterError::database)? != 0,
    })
}
