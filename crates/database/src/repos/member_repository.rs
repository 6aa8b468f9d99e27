//! Repository for chatroom membership facts.

use crate::entities::{Chatroom, ChatroomMember, ChatroomsByRole, User};
use crate::types::{ChatterError, ChatterResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for membership database operations
#[derive(Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    /// Create a new member repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a membership. At most one membership per (chatroom, user)
    /// pair; the primary key enforces it.
    pub async fn add(&self, chatroomid: i64, userid: i64, owner: bool) -> ChatterResult<ChatroomMember> {
        sqlx::query("INSERT INTO ChatroomMember (chatroomid, userid, owner) VALUES (?, ?, ?)")
            .bind(chatroomid)
            .bind(userid)
            .bind(owner as i64)
            .execute(&self.pool)
            .await
            .map_err(ChatterError::database)?;

        info!(chatroomid, userid, owner, "added chatroom member");

        Ok(ChatroomMember {
            chatroomid,
            userid,
            owner,
        })
    }

    /// Find the membership row for a (chatroom, user) pair
    pub async fn find_by_chatroom_and_user(
        &self,
        chatroomid: i64,
        userid: i64,
    ) -> ChatterResult<Option<ChatroomMember>> {
        let row = sqlx::query(
            "SELECT chatroomid, userid, owner FROM ChatroomMember
             WHERE chatroomid = ? AND userid = ?",
        )
        .bind(chatroomid)
        .bind(userid)
        .fetch_optional(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        row.map(|row| {
            Ok(ChatroomMember {
                chatroomid: row.try_get("chatroomid").map_err(ChatterError::database)?,
                userid: row.try_get("userid").map_err(ChatterError::database)?,
                owner: row.try_get::<i64, _>("owner").map_err(ChatterError::database)? != 0,
            })
        })
        .transpose()
    }

    /// All non-owner members of a chatroom, as fresh user snapshots
    pub async fn members(&self, chatroomid: i64) -> ChatterResult<Vec<User>> {
        self.users_with_role(chatroomid, false).await
    }

    /// All owners of a chatroom, as fresh user snapshots
    pub async fn owners(&self, chatroomid: i64) -> ChatterResult<Vec<User>> {
        self.users_with_role(chatroomid, true).await
    }

    /// True iff a membership row with the member role exists
    pub async fn user_is_member(&self, chatroomid: i64, userid: i64) -> ChatterResult<bool> {
        self.has_role(chatroomid, userid, false).await
    }

    /// True iff a membership row with the owner role exists
    pub async fn user_is_owner(&self, chatroomid: i64, userid: i64) -> ChatterResult<bool> {
        self.has_role(chatroomid, userid, true).await
    }

    /// A user's chatrooms, partitioned by membership role
    pub async fn chatrooms_for_user(&self, userid: i64) -> ChatterResult<ChatroomsByRole> {
        let rows = sqlx::query(
            "SELECT c.chatroomid, c.name, c.description, c.joincode, m.owner
             FROM ChatroomMember m
             JOIN Chatroom c ON c.chatroomid = m.chatroomid
             WHERE m.userid = ?
             ORDER BY c.chatroomid",
        )
        .bind(userid)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        let mut by_role = ChatroomsByRole::default();
        for row in rows {
            let chatroom = Chatroom {
                chatroomid: row.try_get("chatroomid").map_err(ChatterError::database)?,
                name: row.try_get("name").map_err(ChatterError::database)?,
                description: row.try_get("description").map_err(ChatterError::database)?,
                joincode: row.try_get("joincode").map_err(ChatterError::database)?,
            };
            let owner: i64 = row.try_get("owner").map_err(ChatterError::database)?;
            if owner != 0 {
                by_role.owner.push(chatroom);
            } else {
                by_role.member.push(chatroom);
            }
        }

        Ok(by_role)
    }

    async fn users_with_role(&self, chatroomid: i64, owner: bool) -> ChatterResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.userid, u.username, u.last_login_ts, u.admin, u.active
             FROM ChatroomMember m
             JOIN User u ON u.userid = m.userid
             WHERE m.chatroomid = ? AND m.owner = ?
             ORDER BY u.userid",
        )
        .bind(chatroomid)
        .bind(owner as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        rows.into_iter()
            .map(|row| {
                Ok(User {
                    userid: row.try_get("userid").map_err(ChatterError::database)?,
                    username: row.try_get("username").map_err(ChatterError::database)?,
                    last_login_ts: row
                        .try_get("last_login_ts")
                        .map_err(ChatterError::database)?,
                    admin: row.try_get::<i64, _>("admin").map_err(ChatterError::database)? != 0,
                    active: row.try_get::<i64, _>("active").map_err(ChatterError::database)? != 0,
                })
            })
            .collect()
    }

    async fn has_role(&self, chatroomid: i64, userid: i64, owner: bool) -> ChatterResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ChatroomMember
             WHERE chatroomid = ? AND userid = ? AND owner = ?",
        )
        .bind(chatroomid)
        .bind(userid)
        .bind(owner as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(ChatterError::database)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::prepare_database;
    use crate::entities::CreateUserRequest;
    use crate::repos::UserRepository;
    use crate::schema::init_schema;
    use chatter_config::DatabaseConfig;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_members.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = prepare_database(&config).await.unwrap();
        init_schema(&pool).await.unwrap();
        (pool, temp_dir)
    }

    async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
        let users = UserRepository::new(pool.clone());
        users
            .create(&CreateUserRequest {
                username: username.to_string(),
                password: "pw".to_string(),
                admin: false,
            })
            .await
            .unwrap()
            .userid
    }

    async fn seed_chatroom(pool: &SqlitePool, name: &str, joincode: &str) -> i64 {
        sqlx::query("INSERT INTO Chatroom (name, description, joincode) VALUES (?, 'A test chatroom', ?)")
            .bind(name)
            .bind(joincode)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_membership_predicates_distinguish_roles() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MemberRepository::new(pool.clone());

        let room = seed_chatroom(&pool, "TestRoom1", "apxffa").await;
        let owner = seed_user(&pool, "TestUser1").await;
        let member = seed_user(&pool, "TestUser2").await;

        repo.add(room, owner, true).await.unwrap();
        repo.add(room, member, false).await.unwrap();

        assert!(repo.user_is_owner(room, owner).await.unwrap());
        assert!(!repo.user_is_member(room, owner).await.unwrap());
        assert!(repo.user_is_member(room, member).await.unwrap());
        assert!(!repo.user_is_owner(room, member).await.unwrap());
        assert!(!repo.user_is_member(room, 9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_members_and_owners_return_user_snapshots() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MemberRepository::new(pool.clone());

        let room = seed_chatroom(&pool, "TestRoom1", "apxffa").await;
        let owner = seed_user(&pool, "TestUser1").await;
        let member_a = seed_user(&pool, "TestUser2").await;
        let member_b = seed_user(&pool, "TestUser3").await;

        repo.add(room, owner, true).await.unwrap();
        repo.add(room, member_a, false).await.unwrap();
        repo.add(room, member_b, false).await.unwrap();

        let owners = repo.owners(room).await.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].username, "TestUser1");

        let members = repo.members(room).await.unwrap();
        let names: Vec<_> = members.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["TestUser2", "TestUser3"]);
    }

    #[tokio::test]
    async fn test_chatrooms_for_user_partitions_by_role() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MemberRepository::new(pool.clone());

        let room1 = seed_chatroom(&pool, "TestRoom1", "apxffa").await;
        let room2 = seed_chatroom(&pool, "TestRoom2", "3jxFsd").await;
        let room3 = seed_chatroom(&pool, "TestRoom3", "Ajf38s").await;
        let user = seed_user(&pool, "TestUser1").await;

        repo.add(room1, user, true).await.unwrap();
        repo.add(room2, user, false).await.unwrap();
        repo.add(room3, user, false).await.unwrap();

        let by_role = repo.chatrooms_for_user(user).await.unwrap();
        assert_eq!(by_role.owner.len(), 1);
        assert_eq!(by_role.owner[0].name, "TestRoom1");
        assert_eq!(by_role.member.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_rejected() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MemberRepository::new(pool.clone());

        let room = seed_chatroom(&pool, "TestRoom1", "apxffa").await;
        let user = seed_user(&pool, "TestUser1").await;

        repo.add(room, user, false).await.unwrap();
        assert!(repo.add(room, user, true).await.is_err());
    }
}
