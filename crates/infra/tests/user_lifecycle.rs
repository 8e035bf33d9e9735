//! User registration, uniqueness and credential flows with the Argon2 adapter.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use identity_core::{Actor, Auditable, Entity, ExpectedVersion, TenantId};
use identity_domain::{
    Credentials, Email, NewUser, Repository, UniqueField, UniquenessError, User,
    UserRepository, UserStatusValue, UserValidationService,
};
use identity_events::{EventBus, EventEnvelope, InMemoryEventBus};
use identity_infra::{
    AggregateCommitter, Argon2PasswordHasher, CredentialConfig, InMemoryUserRepository,
};

fn credentials() -> Credentials {
    let hasher = Argon2PasswordHasher::from_config(&CredentialConfig {
        pepper: Some("test-pepper".to_string()),
        memory_kib: Some(1024),
        iterations: Some(1),
    })
    .unwrap();
    Credentials::new(Arc::new(hasher))
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: "Str0ng!pass".to_string(),
        nickname: None,
    }
}

#[test]
fn register_validate_and_commit() {
    identity_observability::init();

    let users = Arc::new(InMemoryUserRepository::new());
    let validation = UserValidationService::new(users.clone());
    let committer: AggregateCommitter<InMemoryEventBus<EventEnvelope<JsonValue>>> =
        AggregateCommitter::new(InMemoryEventBus::new());
    let events = committer.bus().subscribe();
    let credentials = credentials();

    let mut john = User::register_platform_user(
        new_user("john_doe", "john@example.com"),
        &credentials,
        Actor::System,
    )
    .unwrap();
    assert_eq!(john.nickname().as_str(), "john_doe");
    validation.ensure_user_is_unique(&john).unwrap();
    committer
        .commit(users.as_ref(), &mut john, ExpectedVersion::New)
        .unwrap();

    let tenant = TenantId::new();
    let clash = User::register_tenant_user(
        tenant,
        new_user("johnny", "John@Example.com"),
        &credentials,
        Actor::User(*john.id()),
    )
    .unwrap();
    let Err(UniquenessError::Taken { field, .. }) = validation.ensure_user_is_unique(&clash) else {
        panic!("expected the email to be taken");
    };
    assert_eq!(field, UniqueField::Email);

    let email = Email::parse("john@example.com").unwrap();
    assert!(validation.is_email_unique(&email, Some(john.id())).unwrap());
    assert_eq!(
        users.find_by_email(&email).unwrap().map(|u| *u.id()),
        Some(*john.id())
    );

    let published = events.drain();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].event_type(), "identity.user.registered");
    assert_eq!(published[0].tenant_id(), None);
}

#[test]
fn lifecycle_and_credentials_round_trip_through_storage() {
    let users = InMemoryUserRepository::new();
    let committer: AggregateCommitter<InMemoryEventBus<EventEnvelope<JsonValue>>> =
        AggregateCommitter::new(InMemoryEventBus::new());
    let credentials = credentials();

    let mut user = User::register_tenant_user(
        TenantId::new(),
        new_user("jane", "jane@example.com"),
        &credentials,
        Actor::System,
    )
    .unwrap();
    committer
        .commit(&users, &mut user, ExpectedVersion::New)
        .unwrap();

    let mut loaded = users.find_by_id(user.id()).unwrap().unwrap();
    let stored_version = loaded.version();
    loaded.activate(Actor::System).unwrap();
    loaded
        .lock(
            Some(Utc::now() - Duration::days(1)),
            Some("too many attempts".into()),
            Actor::System,
        )
        .unwrap();
    committer
        .commit(&users, &mut loaded, ExpectedVersion::Exact(stored_version))
        .unwrap();

    let mut loaded = users.find_by_id(user.id()).unwrap().unwrap();
    assert_eq!(loaded.status().value(), UserStatusValue::Locked);
    assert!(loaded.status().is_lock_expired());
    assert!(!loaded.status().can_login());
    assert_eq!(loaded.version(), stored_version + 2);

    let stored_version = loaded.version();
    loaded.unlock(Actor::System).unwrap();
    loaded
        .change_password("Str0ng!pass", "N3w&Better", &credentials, Actor::System)
        .unwrap();
    committer
        .commit(&users, &mut loaded, ExpectedVersion::Exact(stored_version))
        .unwrap();

    let loaded = users.find_by_id(user.id()).unwrap().unwrap();
    assert!(loaded.status().can_login());
    assert!(loaded.verify_password("N3w&Better", &credentials).unwrap());
    assert!(!loaded.verify_password("Str0ng!pass", &credentials).unwrap());
}
