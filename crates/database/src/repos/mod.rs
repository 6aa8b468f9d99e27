//! Repository implementations
//!
//! One repository per entity kind. Repositories implement the loader
//! (`find_by_id` / `get`), mutator (`create` / `update` / `delete`)
//! and relationship-resolver operations; every call performs its own
//! queries against the pool, so results reflect the database at call
//! time with no caching in between.

pub mod attachment_repository;
pub mod chatroom_repository;
pub mod member_repository;
pub mod message_repository;
pub mod user_repository;

pub use attachment_repository::AttachmentRepository;
pub use chatroom_repository::ChatroomRepository;
pub use member_repository::MemberRepository;
pub use message_repository::MessageRepository;
pub use user_repository::UserRepository;
