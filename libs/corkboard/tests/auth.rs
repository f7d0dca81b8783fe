//! Registration, login sessions, and authentication

mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use corkboard::{
    Client, Error,
    models::{NewBoard, NewUser},
};
use docstore::{DocumentStore, Filter, MemoryStore};

fn new_user(full_name: &str, email: &str) -> NewUser {
    NewUser {
        full_name: full_name.to_string(),
        email: email.to_string(),
        password: "Secret-passw0rd".to_string(),
    }
}

#[tokio::test]
async fn test_operations_without_principal_fail() {
    let client = common::client().await;
    let session = client.connect(None);

    assert!(matches!(
        session.authenticate().await,
        Err(Error::NotAuthenticated)
    ));
    assert!(matches!(
        session
            .boards()
            .create(NewBoard {
                name: "Nope".to_string(),
                settings: None,
            })
            .await,
        Err(Error::NotAuthenticated)
    ));
    assert!(matches!(
        session.boards().list().await,
        Err(Error::NotAuthenticated)
    ));
    assert!(matches!(session.logout().await, Err(Error::NotAuthenticated)));

    let unknown = client.connect(Some("no-such-token".to_string()));
    assert!(matches!(
        unknown.authenticate().await,
        Err(Error::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_principal_is_resolved_once_per_session() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(common::InstrumentedStore::new());
    let client = common::client_over(store.clone()).await;
    let (user, token) = common::sign_up(&client, "John Doe", "john@example.com").await;

    let session = client.connect(Some(token.clone()));
    assert_eq!(session.authenticate().await?.id, user.id);
    assert_eq!(session.authenticate().await?.id, user.id);
    session
        .boards()
        .create(NewBoard {
            name: "Roadmap".to_string(),
            settings: None,
        })
        .await?;
    session.boards().list().await?;
    assert_eq!(store.session_lookups(), 1);
    session.close();

    // A new session resolves the token again
    let session = client.connect(Some(token));
    session.authenticate().await?;
    assert_eq!(store.session_lookups(), 2);
    Ok(())
}

#[tokio::test]
async fn test_logins_are_numbered() -> Result<(), Box<dyn std::error::Error>> {
    let client = common::client().await;
    let session = client.connect(None);

    let first = session
        .users()
        .register(new_user("John Doe", "john@example.com"))
        .await?;
    let second = session
        .users()
        .register(new_user("john-doe", "jd@example.com"))
        .await?;

    assert_eq!(first.login, "johndoe");
    assert_eq!(second.login, "johndoe1");
    assert_eq!(session.users().get(second.id).await?, second);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let client = common::client().await;
    let session = client.connect(None);

    session
        .users()
        .register(new_user("John Doe", "john@example.com"))
        .await?;

    let err = session
        .users()
        .register(new_user("Johnny", "John@Example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmailConflict));

    // Same name and email: the login retry must not hide the email conflict
    let err = session
        .users()
        .register(new_user("John Doe", "john@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmailConflict));
    Ok(())
}

#[tokio::test]
async fn test_login_and_logout() -> Result<(), Box<dyn std::error::Error>> {
    let client = common::client().await;
    let anonymous = client.connect(None);
    let user = anonymous
        .users()
        .register(new_user("John Doe", "john@example.com"))
        .await?;

    assert!(matches!(
        anonymous.login("johndoe", "wrong").await,
        Err(Error::InvalidCredentials)
    ));
    assert!(matches!(
        anonymous.login("nobody", "Secret-passw0rd").await,
        Err(Error::InvalidCredentials)
    ));

    let by_email = anonymous.login("JOHN@example.com", "Secret-passw0rd").await?;
    let by_login = anonymous.login("johndoe", "Secret-passw0rd").await?;
    assert_ne!(by_email.id, by_login.id);
    assert_eq!(by_login.user_id, user.id);

    let session = client.connect(Some(by_login.id.clone()));
    assert_eq!(session.authenticate().await?.id, user.id);
    session.logout().await?;

    let after = client.connect(Some(by_login.id));
    assert!(matches!(
        after.authenticate().await,
        Err(Error::NotAuthenticated)
    ));

    // The other login session is unaffected
    let other = client.connect(Some(by_email.id));
    assert!(other.authenticate().await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_expired_sessions_fail_and_are_purged() -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

    let early = Client::new(store.clone())
        .with_clock(move || start)
        .with_session_ttl(Duration::hours(1));
    early.ensure_indexes().await?;
    let (_, stale) = common::sign_up(&early, "John Doe", "john@example.com").await;

    let later = early.clone().with_clock(move || start + Duration::minutes(90));
    let (_, fresh) = common::sign_up(&later, "Jane Doe", "jane@example.com").await;

    let session = later.connect(Some(stale.clone()));
    assert!(matches!(
        session.authenticate().await,
        Err(Error::NotAuthenticated)
    ));
    assert!(matches!(
        session.user_sessions().get(&stale).await,
        Err(Error::SessionNotFound)
    ));

    assert_eq!(later.connect(None).user_sessions().purge_expired().await?, 1);

    let left = store.find("user_sessions", &Filter::new()).await?;
    assert_eq!(left.len(), 1);
    assert!(later.connect(Some(fresh)).authenticate().await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_token_of_removed_user_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let client = common::client_over(store.clone()).await;
    let (user, token) = common::sign_up(&client, "John Doe", "john@example.com").await;

    store
        .delete_one("users", &Filter::by_id(user.id.to_string()))
        .await?;

    let session = client.connect(Some(token));
    assert!(matches!(
        session.authenticate().await,
        Err(Error::NotAuthenticated)
    ));
    Ok(())
}
