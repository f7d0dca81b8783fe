//! User repository

use std::sync::OnceLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Utc};
use docstore::Filter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{USERS, from_document, to_document};
use crate::{
    Error, Result,
    models::{NewUser, User},
    session::Session,
    slug::{self, SlugScope, Sluggable, slugify},
};

/// Stored form of a user, including the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    id: Uuid,
    full_name: String,
    login: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        User {
            id: doc.id,
            full_name: doc.full_name,
            login: doc.login,
            email: doc.email,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl Sluggable for UserDocument {
    fn slug(&self) -> &str {
        &self.login
    }

    fn set_slug(&mut self, slug: String) {
        self.login = slug;
    }
}

/// Whether the identifier looks like an email address rather than a login
fn is_email(login_or_email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Failed to compile email regex")
    });

    regex.is_match(login_or_email)
}

/// Login derived from a full name: the slug without separators
pub fn derive_login(full_name: &str) -> String {
    slugify(full_name, "user").replace('-', "")
}

/// Registered users
pub struct UserRepository<'a> {
    session: &'a Session,
}

impl<'a> UserRepository<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Register a new user
    ///
    /// The login is derived from the full name and numbered when taken
    /// (`johndoe`, `johndoe1`, ...). Email addresses are compared in lower
    /// case; a taken one fails with [`Error::EmailConflict`].
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        info!("Registering new user: {}", new_user.full_name);
        let store = self.session.store();

        let salt = SaltString::generate(&mut rand::thread_rng());
        let password_hash = Argon2::default()
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(e.to_string()))?
            .to_string();

        let user = UserDocument {
            id: Uuid::now_v7(),
            login: derive_login(&new_user.full_name),
            full_name: new_user.full_name,
            email: new_user.email.to_lowercase(),
            password_hash,
            created_at: self.session.now(),
            updated_at: None,
        };

        let scope = SlugScope {
            collection: USERS,
            field: "login",
            filter: Filter::new(),
            delimiter: "",
        };
        let result = slug::resolve(store, &scope, &user, move |attempt: UserDocument| async move {
            store.insert(USERS, to_document(&attempt)?).await
        })
        .await;

        let login = match result {
            Ok((login, ())) => login,
            Err(err) if err.is_conflict_on("email") => return Err(Error::EmailConflict),
            Err(err) => return Err(err.into()),
        };

        info!("Registered user {} as {}", user.id, login);
        Ok(User::from(UserDocument { login, ..user }))
    }

    /// Get a user by id
    pub async fn get(&self, id: Uuid) -> Result<User> {
        let doc = self
            .session
            .store()
            .find_one(USERS, &Filter::by_id(id.to_string()))
            .await?
            .ok_or(Error::UserNotFound)?;

        Ok(from_document::<UserDocument>(doc)?.into())
    }

    /// Find the user behind a login or email address and check the password
    ///
    /// An unknown user and a wrong password both fail with
    /// [`Error::InvalidCredentials`].
    pub async fn verify_credentials(&self, login_or_email: &str, password: &str) -> Result<User> {
        let filter = if is_email(login_or_email) {
            Filter::new().eq("email", login_or_email.to_lowercase())
        } else {
            Filter::new().eq("login", login_or_email)
        };

        let doc = self
            .session
            .store()
            .find_one(USERS, &filter)
            .await?
            .ok_or(Error::InvalidCredentials)?;
        let user: UserDocument = from_document(doc)?;

        let parsed_hash =
            PasswordHash::new(&user.password_hash).map_err(|e| Error::PasswordHash(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| Error::InvalidCredentials)?;

        Ok(user.into())
    }
}
