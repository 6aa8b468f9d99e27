//! Chatter persistence layer.
//!
//! SQLite-backed storage for users, chatrooms, memberships, messages
//! and attachments. Access goes through per-entity repositories that
//! enforce the integrity rules of the domain: uniqueness of usernames,
//! chatroom names and join codes, permission-gated user deletion with
//! message reassignment to the sentinel user, and cascading chatroom
//! deletion down to attachment files on disk.
//!
//! Typical setup:
//!
//! ```no_run
//! use chatter_database::{connection::prepare_database, schema::init_schema};
//! use chatter_database::repos::UserRepository;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = chatter_config::load()?;
//! let pool = prepare_database(&config.database).await?;
//! init_schema(&pool).await?;
//!
//! let users = UserRepository::new(pool.clone());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod entities;
pub mod projection;
pub mod repos;
pub mod schema;
pub mod types;

pub use connection::prepare_database;
pub use entities::{
    Attachment, Chatroom, ChatroomMember, ChatroomsByRole, CreateAttachmentRequest,
    CreateChatroomRequest, CreateMessageRequest, CreateUserRequest, Message,
    UpdateChatroomRequest, UpdateMessageRequest, UpdateUserRequest, User, DELETED_USER_ID,
    JOINCODE_LEN,
};
pub use projection::Projector;
pub use repos::{
    AttachmentRepository, ChatroomRepository, MemberRepository, MessageRepository, UserRepository,
};
pub use schema::init_schema;
pub use types::{ChatterError, ChatterResult};
