//! End-to-end scenarios across repositories: a populated chat graph,
//! deletions that cascade through it, and projections over it.

use chatter_config::DatabaseConfig;
use chatter_database::{
    connection::prepare_database, schema::init_schema, AttachmentRepository, ChatroomRepository,
    ChatterError, CreateAttachmentRequest, CreateChatroomRequest, CreateUserRequest,
    MemberRepository, MessageRepository, Projector, User, UserRepository, DELETED_USER_ID,
    JOINCODE_LEN,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

const BASE_TIME: i64 = 1_700_000_000;

struct TestEnv {
    pool: SqlitePool,
    attachments_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestEnv {
    fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    fn chatrooms(&self) -> ChatroomRepository {
        ChatroomRepository::new(self.pool.clone(), self.attachments_dir.clone())
    }

    fn members(&self) -> MemberRepository {
        MemberRepository::new(self.pool.clone())
    }

    fn messages(&self) -> MessageRepository {
        MessageRepository::new(self.pool.clone(), self.attachments_dir.clone())
    }

    fn attachments(&self) -> AttachmentRepository {
        AttachmentRepository::new(self.pool.clone(), self.attachments_dir.clone())
    }

    fn projector(&self) -> Projector {
        Projector::new(self.pool.clone())
    }
}

async fn setup() -> TestEnv {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chatter_it.db");
    let attachments_dir = temp_dir.path().join("attachments");
    std::fs::create_dir_all(&attachments_dir).unwrap();

    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 2,
    };

    let pool = prepare_database(&config).await.unwrap();
    init_schema(&pool).await.unwrap();

    TestEnv {
        pool,
        attachments_dir,
        _temp_dir: temp_dir,
    }
}

/// Populate the graph the way the rest of these tests expect it:
/// five regular users plus an admin, three rooms, a message history
/// in the first room at fixed ten-second intervals, and two
/// attachments on the first message backed by real files.
async fn seed(env: &TestEnv) -> Vec<User> {
    let users = env.users();
    let mut created = Vec::new();
    for name in ["TestUser1", "TestUser2", "TestUser3", "TestUser4", "TestUser5"] {
        created.push(
            users
                .create(&CreateUserRequest {
                    username: name.to_string(),
                    password: "password123".to_string(),
                    admin: false,
                })
                .await
                .unwrap(),
        );
    }
    created.push(
        users
            .create(&CreateUserRequest {
                username: "TestAdmin".to_string(),
                password: "adminpass".to_string(),
                admin: true,
            })
            .await
            .unwrap(),
    );

    let chatrooms = env.chatrooms();
    let room1 = chatrooms
        .create(&CreateChatroomRequest {
            name: "TestRoom1".to_string(),
            description: "First test room".to_string(),
            created_by: created[0].userid,
        })
        .await
        .unwrap();
    chatrooms
        .create(&CreateChatroomRequest {
            name: "TestRoom2".to_string(),
            description: "Second test room".to_string(),
            created_by: created[1].userid,
        })
        .await
        .unwrap();
    chatrooms
        .create(&CreateChatroomRequest {
            name: "TestRoom3".to_string(),
            description: "Third test room".to_string(),
            created_by: created[2].userid,
        })
        .await
        .unwrap();

    let members = env.members();
    members.add(room1.chatroomid, created[1].userid, false).await.unwrap();
    members.add(room1.chatroomid, created[2].userid, false).await.unwrap();

    // Message history with controlled timestamps; senders alternate
    // between the room's three participants.
    let senders = [created[0].userid, created[1].userid, created[2].userid];
    for (i, offset) in [0i64, 10, 20, 30, 40, 50].iter().enumerate() {
        sqlx::query(
            "INSERT INTO Message (content, chatroomid, senderid, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(format!("message {i}"))
        .bind(room1.chatroomid)
        .bind(senders[i % senders.len()])
        .bind(BASE_TIME + offset)
        .execute(&env.pool)
        .await
        .unwrap();
    }

    let attachments = env.attachments();
    for filename in ["report.pdf", "photo.png"] {
        std::fs::write(env.attachments_dir.join(filename), b"payload").unwrap();
        attachments
            .create(&CreateAttachmentRequest {
                messageid: 1,
                filepath: filename.to_string(),
            })
            .await
            .unwrap();
    }

    created
}

#[tokio::test]
async fn test_since_filter_is_strictly_greater_than() {
    let env = setup().await;
    seed(&env).await;
    let messages = env.messages();

    let all = messages.find_by_chatroom(1, None).await.unwrap();
    assert_eq!(all.len(), 6);

    // Cutoff between the third and fourth message.
    let recent = messages
        .find_by_chatroom(1, Some(BASE_TIME + 25))
        .await
        .unwrap();
    let offsets: Vec<i64> = recent.iter().map(|m| m.timestamp - BASE_TIME).collect();
    assert_eq!(offsets, vec![30, 40, 50]);

    // A cutoff landing exactly on a message excludes that message.
    let boundary = messages
        .find_by_chatroom(1, Some(BASE_TIME + 30))
        .await
        .unwrap();
    assert_eq!(boundary.len(), 2);
}

#[tokio::test]
async fn test_admin_deletes_user_and_messages_are_reassigned() {
    let env = setup().await;
    let users = seed(&env).await;
    let repo = env.users();
    let admin = users.last().unwrap();
    let target = &users[0];

    let authored = env
        .messages()
        .find_by_sender(target.userid)
        .await
        .unwrap()
        .len();
    assert!(authored > 0);

    repo.delete(target.userid, admin).await.unwrap();

    assert!(matches!(
        repo.get(target.userid).await.unwrap_err(),
        ChatterError::UserNotFound(_)
    ));

    // Every message the user wrote now belongs to the sentinel user,
    // and nothing else moved.
    let reassigned = env
        .messages()
        .find_by_sender(DELETED_USER_ID)
        .await
        .unwrap();
    assert_eq!(reassigned.len(), authored);
    let total = env.messages().count_for_chatroom(1, None).await.unwrap();
    assert_eq!(total, 6);

    // Memberships of the deleted user are gone too.
    assert!(!env.members().user_is_member(1, target.userid).await.unwrap());
    assert!(!env.members().user_is_owner(1, target.userid).await.unwrap());
}

#[tokio::test]
async fn test_non_admin_cannot_delete_other_users() {
    let env = setup().await;
    let users = seed(&env).await;
    let repo = env.users();

    let err = repo.delete(users[0].userid, &users[1]).await.unwrap_err();
    assert!(matches!(err, ChatterError::PermissionDenied { .. }));

    // The refused delete left everything in place.
    assert!(repo.get(users[0].userid).await.is_ok());
    assert!(env
        .messages()
        .find_by_sender(DELETED_USER_ID)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_users_may_delete_themselves() {
    let env = setup().await;
    let users = seed(&env).await;
    let repo = env.users();

    repo.delete(users[4].userid, &users[4]).await.unwrap();
    assert!(repo.find_by_id(users[4].userid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_chatroom_delete_cascades_to_messages_attachments_and_files() {
    let env = setup().await;
    seed(&env).await;

    let file_a = env.attachments_dir.join("report.pdf");
    let file_b = env.attachments_dir.join("photo.png");
    assert!(file_a.exists() && file_b.exists());

    env.chatrooms().delete(1).await.unwrap();

    assert!(matches!(
        env.chatrooms().get(1).await.unwrap_err(),
        ChatterError::ChatroomNotFound(1)
    ));
    assert!(env.messages().find_by_chatroom(1, None).await.unwrap().is_empty());
    assert!(env.attachments().find_by_message_id(1).await.unwrap().is_empty());
    assert!(!file_a.exists());
    assert!(!file_b.exists());

    // The other rooms are untouched.
    assert!(env.chatrooms().get(2).await.is_ok());
    assert!(env.chatrooms().get(3).await.is_ok());
}

#[tokio::test]
async fn test_projection_matches_relationship_resolvers() {
    let env = setup().await;
    seed(&env).await;

    let value = env.projector().chatroom(1, false).await.unwrap();

    let mut owner_ids: Vec<i64> = env
        .members()
        .owners(1)
        .await
        .unwrap()
        .iter()
        .map(|u| u.userid)
        .collect();
    owner_ids.sort_unstable();
    let mut member_ids: Vec<i64> = env
        .members()
        .members(1)
        .await
        .unwrap()
        .iter()
        .map(|u| u.userid)
        .collect();
    member_ids.sort_unstable();

    assert_eq!(value["owners"], serde_json::json!(owner_ids));
    assert_eq!(value["members"], serde_json::json!(member_ids));
    assert_eq!(value["messages"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_join_codes_are_well_formed_and_distinct() {
    let env = setup().await;
    seed(&env).await;
    let chatrooms = env.chatrooms();

    let mut codes = Vec::new();
    for chatroomid in [1, 2, 3] {
        let room = chatrooms.get(chatroomid).await.unwrap();
        assert_eq!(room.joincode.len(), JOINCODE_LEN);
        assert!(room.joincode.chars().all(|c| c.is_ascii_alphanumeric()));
        codes.push(room.joincode);
    }
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 3);

    // Regeneration keeps the shape and can be looked up afterwards.
    let room = chatrooms.regenerate_joincode(2).await.unwrap();
    assert_eq!(room.joincode.len(), JOINCODE_LEN);
    let found = chatrooms.find_by_joincode(&room.joincode).await.unwrap();
    assert_eq!(found.map(|r| r.chatroomid), Some(2));
}

#[tokio::test]
async fn test_chatrooms_for_user_partitions_by_role() {
    let env = setup().await;
    let users = seed(&env).await;

    let rooms = env
        .members()
        .chatrooms_for_user(users[1].userid)
        .await
        .unwrap();
    let owner_names: Vec<&str> = rooms.owner.iter().map(|r| r.name.as_str()).collect();
    let member_names: Vec<&str> = rooms.member.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(owner_names, vec!["TestRoom2"]);
    assert_eq!(member_names, vec!["TestRoom1"]);
}
