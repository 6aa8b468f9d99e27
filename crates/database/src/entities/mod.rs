//! Domain entities for the persistence layer
//!
//! Entities are immutable snapshots of their row at load time; they do
//! not auto-refresh. All mutation goes through the repositories, which
//! return freshly loaded snapshots after a durable commit.

pub mod attachment;
pub mod chatroom;
pub mod member;
pub mod message;
pub mod user;

pub use attachment::{Attachment, CreateAttachmentRequest};
pub use chatroom::{Chatroom, CreateChatroomRequest, UpdateChatroomRequest, JOINCODE_LEN};
pub use member::{ChatroomMember, ChatroomsByRole};
pub use message::{CreateMessageRequest, Message, UpdateMessageRequest};
pub use user::{CreateUserRequest, UpdateUserRequest, User, DELETED_USER_ID};
