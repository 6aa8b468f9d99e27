//! Membership entity definitions

use serde::{Deserialize, Serialize};

use super::chatroom::Chatroom;

/// A persisted (chatroom, user, role) fact. At most one membership per
/// (chatroom, user) pair; the `owner` flag distinguishes owners from
/// ordinary members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatroomMember {
    pub chatroomid: i64,
    pub userid: i64,
    pub owner: bool,
}

/// A user's chatrooms partitioned by membership role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatroomsByRole {
    pub owner: Vec<Chatroom>,
    pub member: Vec<Chatroom>,
}
