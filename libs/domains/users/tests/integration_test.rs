//! Integration tests for the Users domain
//!
//! These run against real PostgreSQL via testcontainers to check that:
//! - The unique email index holds for soft-deleted rows too
//! - Soft delete and restore behave like the in-memory store
//! - The full lifecycle works through the service

use domain_users::*;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};
use uuid::Uuid;

fn user(builder: &TestDataBuilder, local: &str, role: Role) -> User {
    User::new(
        builder.name(local),
        builder.email(local),
        "$argon2id$v=19$m=256,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".into(),
        role,
    )
}

fn service(db: &TestDatabase) -> UserService<PgUserRepository> {
    UserService::new(PgUserRepository::new(db.connection()))
        .with_hasher(CredentialHasher::with_params(256, 1, 1).unwrap())
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_get_user() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("create_and_get");

    let input = user(&builder, "ann", Role::Admin);
    let created = repo.create(input.clone()).await.unwrap();

    assert_uuid_eq(created.id, input.id, "created id");
    assert_eq!(created.role, Role::Admin);
    assert!(created.deleted_at.is_none());

    let fetched = assert_some(repo.get_by_id(created.id).await.unwrap(), "user by id");
    assert_eq!(fetched.email, input.email);

    let by_email = assert_some(
        repo.get_by_email(&input.email).await.unwrap(),
        "user by email",
    );
    assert_uuid_eq(by_email.id, created.id, "user by email id");
}

#[tokio::test]
async fn test_active_email_unique_constraint() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("unique_email");

    repo.create(user(&builder, "ann", Role::Client)).await.unwrap();

    // Bypasses the service pre-check, so the index has to catch it
    let result = repo.create(user(&builder, "ann", Role::Admin)).await;
    assert!(
        matches!(result, Err(UserError::EmailTaken(ref email)) if *email == builder.email("ann")),
        "expected EmailTaken, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_soft_deleted_email_stays_reserved() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("reserved_email");

    let first = repo.create(user(&builder, "ann", Role::Client)).await.unwrap();
    assert_eq!(repo.soft_delete(first.id).await.unwrap(), 1);

    // Not visible to the active-only pre-check, still caught by the index
    assert!(!repo.is_email_taken(&builder.email("ann"), None).await.unwrap());
    let result = repo.create(user(&builder, "ann", Role::Client)).await;
    assert!(
        matches!(result, Err(UserError::EmailTaken(_))),
        "expected EmailTaken, got {:?}",
        result
    );

    assert_eq!(repo.restore(first.id).await.unwrap(), 1);

    let found = assert_some(
        repo.get_by_email(&builder.email("ann")).await.unwrap(),
        "restored owner",
    );
    assert_uuid_eq(found.id, first.id, "restored owner id");
    assert!(found.deleted_at.is_none());
}

#[tokio::test]
async fn test_soft_delete_hides_from_list_and_count() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("soft_delete_visibility");

    let ann = repo.create(user(&builder, "ann", Role::Client)).await.unwrap();
    repo.create(user(&builder, "bob", Role::Admin)).await.unwrap();

    assert_eq!(repo.count(None).await.unwrap(), 2);
    assert_eq!(repo.soft_delete(ann.id).await.unwrap(), 1);
    assert_eq!(repo.soft_delete(ann.id).await.unwrap(), 0);

    assert_eq!(repo.count(None).await.unwrap(), 1);
    assert_eq!(repo.count(Some(Role::Client)).await.unwrap(), 0);
    assert!(repo.list(None).await.unwrap().iter().all(|u| u.id != ann.id));

    let deleted = assert_some(repo.get_by_id(ann.id).await.unwrap(), "deleted user");
    assert!(deleted.deleted_at.is_some());

    assert_eq!(repo.restore(ann.id).await.unwrap(), 1);
    assert_eq!(repo.count(Some(Role::Client)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_list_is_ordered_by_creation() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("list_order");

    let mut ids = Vec::new();
    for local in ["a", "b", "c"] {
        ids.push(repo.create(user(&builder, local, Role::Client)).await.unwrap().id);
    }

    let listed: Vec<Uuid> = repo
        .list(Some(Role::Client))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("update_missing");

    let result = repo.update(user(&builder, "ghost", Role::Client)).await;
    assert!(matches!(result, Err(UserError::NotFound(_))));
}

#[tokio::test]
async fn test_is_email_taken_excludes_self_and_deleted() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("email_taken");

    let ann = repo.create(user(&builder, "ann", Role::Client)).await.unwrap();
    let email = builder.email("ann");

    assert!(repo.is_email_taken(&email, None).await.unwrap());
    assert!(!repo.is_email_taken(&email, Some(ann.id)).await.unwrap());

    repo.soft_delete(ann.id).await.unwrap();
    assert!(!repo.is_email_taken(&email, None).await.unwrap());
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
async fn test_user_lifecycle_against_postgres() {
    let db = TestDatabase::new().await;
    let service = service(&db);
    let builder = TestDataBuilder::from_test_name("lifecycle");

    let created = service
        .create_user(CreateUser {
            name: builder.name("ann"),
            email: builder.email("ann"),
            password: builder.password(),
            role: None,
        })
        .await
        .unwrap();
    assert_eq!(created.role, Role::Client);

    let authed = service
        .authenticate(LoginRequest {
            email: builder.email("ann"),
            password: builder.password(),
        })
        .await
        .unwrap();
    assert_uuid_eq(authed.id, created.id, "authenticated id");

    let updated = service
        .update_user(
            created.id,
            UpdateUser {
                role: Some("admin".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);
    assert!(updated.updated_at >= created.updated_at);

    let stats = service.stats().await.unwrap();
    assert_eq!(stats.total, stats.admins + stats.clients);
    assert_eq!(stats.admins, 1);

    service.delete_user(created.id).await.unwrap();
    assert!(matches!(
        service.delete_user(created.id).await,
        Err(UserError::NotFound(_))
    ));
    assert_eq!(service.count().await.unwrap(), 0);

    service.restore_user(created.id).await.unwrap();
    let restored = service.get_user(created.id).await.unwrap();
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.role, Role::Admin);
}

#[tokio::test]
async fn test_concurrent_creates_with_same_email() {
    let db = TestDatabase::new().await;
    let service = service(&db);
    let builder = TestDataBuilder::from_test_name("concurrent_create");

    let input = CreateUser {
        name: builder.name("ann"),
        email: builder.email("ann"),
        password: builder.password(),
        role: None,
    };

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let service = service.clone();
            let input = input.clone();
            tokio::spawn(async move { service.create_user(input).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(UserError::EmailTaken(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(service.count().await.unwrap(), 1);
}
