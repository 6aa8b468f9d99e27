//! Schema bootstrap
//!
//! Drops and recreates the five chatter tables and seeds the reserved
//! sentinel user (`userid = 0`) that deleted users' messages are
//! reassigned to. This is a destructive setup step: it is meant to be
//! invoked exactly once before the persistence layer is used, never as
//! part of normal operation.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Initialise (or reinitialise) the complete schema.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_user_table(pool).await?;
    create_chatroom_table(pool).await?;
    create_chatroom_member_table(pool).await?;
    create_message_table(pool).await?;
    create_attachment_table(pool).await?;
    info!("database schema initialised");
    Ok(())
}

async fn create_user_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS User")
        .execute(pool)
        .await
        .context("failed to drop User table")?;

    sqlx::query(
        "CREATE TABLE User (
            userid INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            last_login_ts NUMERIC DEFAULT 0,
            admin INTEGER DEFAULT 0,
            active INTEGER DEFAULT 1
        )",
    )
    .execute(pool)
    .await
    .context("failed to create User table")?;

    // Reserved row that messages are reassigned to when their author
    // is deleted. Inactive and non-admin, so it can never log in.
    sqlx::query("INSERT INTO User VALUES (0, 'DeletedUser', '', 0, 0, 0)")
        .execute(pool)
        .await
        .context("failed to seed sentinel user")?;

    Ok(())
}

async fn create_chatroom_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS Chatroom")
        .execute(pool)
        .await
        .context("failed to drop Chatroom table")?;

    sqlx::query(
        "CREATE TABLE Chatroom (
            chatroomid INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            description TEXT NOT NULL,
            joincode TEXT UNIQUE NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("failed to create Chatroom table")?;

    Ok(())
}

async fn create_chatroom_member_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS ChatroomMember")
        .execute(pool)
        .await
        .context("failed to drop ChatroomMember table")?;

    sqlx::query(
        "CREATE TABLE ChatroomMember (
            chatroomid INTEGER NOT NULL,
            userid INTEGER NOT NULL,
            owner INTEGER DEFAULT 0,
            PRIMARY KEY (chatroomid, userid),
            FOREIGN KEY (userid) REFERENCES User(userid)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create ChatroomMember table")?;

    Ok(())
}

async fn create_message_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS Message")
        .execute(pool)
        .await
        .context("failed to drop Message table")?;

    sqlx::query(
        "CREATE TABLE Message (
            messageid INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            chatroomid INTEGER NOT NULL,
            senderid INTEGER NOT NULL,
            timestamp NUMERIC,
            FOREIGN KEY (chatroomid) REFERENCES Chatroom(chatroomid),
            FOREIGN KEY (senderid) REFERENCES User(userid)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create Message table")?;

    Ok(())
}

async fn create_attachment_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS Attachment")
        .execute(pool)
        .await
        .context("failed to drop Attachment table")?;

    sqlx::query(
        "CREATE TABLE Attachment (
            attachmentid INTEGER PRIMARY KEY AUTOINCREMENT,
            messageid INTEGER NOT NULL,
            filepath TEXT NOT NULL,
            FOREIGN KEY (messageid) REFERENCES Message(messageid)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create Attachment table")?;

    Ok(())
}
