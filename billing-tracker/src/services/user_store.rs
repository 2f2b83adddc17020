//! Accounts and their grants.

use super::metrics::record_store_operation;
use super::MongoDb;
use crate::models::{normalize_email, AccessUpdate, Permissions, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Instant;
use tokio::sync::RwLock;

const DUPLICATE_KEY: i32 = 11000;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `BadRequest` when the email is already registered.
    async fn insert(&self, user: User) -> Result<User, AppError>;

    async fn get(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Every user, most recently created first.
    async fn list(&self) -> Result<Vec<User>, AppError>;

    /// `None` when the id is unknown.
    async fn update_access(&self, id: &str, update: AccessUpdate)
        -> Result<Option<User>, AppError>;

    async fn count(&self) -> Result<u64, AppError>;
}

fn email_taken() -> AppError {
    AppError::BadRequest(anyhow::anyhow!("User with this email already exists"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            role: user.role,
            permissions: user.permissions,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id,
            email: doc.email,
            full_name: doc.full_name,
            password_hash: doc.password_hash,
            role: doc.role,
            permissions: doc.permissions,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

pub struct MongoUserStore {
    db: MongoDb,
}

impl MongoUserStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: User) -> Result<User, AppError> {
        let started = Instant::now();
        // The unique email index settles concurrent sign-ups.
        self.db
            .users()
            .insert_one(UserDocument::from(user.clone()), None)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    return email_taken();
                }
                tracing::error!(error = %e, "Failed to insert user");
                AppError::from(e)
            })?;
        record_store_operation("user_insert", started);
        Ok(user)
    }

    async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = self
            .db
            .users()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)?;
        Ok(user.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = self
            .db
            .users()
            .find_one(doc! { "email": normalize_email(email) }, None)
            .await
            .map_err(AppError::from)?;
        Ok(user.map(User::from))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();

        let mut cursor = self
            .db
            .users()
            .find(None, options)
            .await
            .map_err(AppError::from)?;

        let mut users = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(AppError::from)? {
            users.push(User::from(doc));
        }

        record_store_operation("user_list", started);
        Ok(users)
    }

    async fn update_access(
        &self,
        id: &str,
        update: AccessUpdate,
    ) -> Result<Option<User>, AppError> {
        let started = Instant::now();
        let Some(mut user) = self.get(id).await? else {
            return Ok(None);
        };
        user.apply(update);

        let result = self
            .db
            .users()
            .replace_one(doc! { "_id": id }, UserDocument::from(user.clone()), None)
            .await
            .map_err(AppError::from)?;

        record_store_operation("user_update", started);
        if result.matched_count == 0 {
            return Ok(None);
        }
        Ok(Some(user))
    }

    async fn count(&self) -> Result<u64, AppError> {
        self.db
            .users()
            .count_documents(None, None)
            .await
            .map_err(AppError::from)
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(email_taken());
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.users.read().await.clone();
        users.reverse();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_access(
        &self,
        id: &str,
        update: AccessUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|user| user.id == id).map(|user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.users.read().await.len() as u64)
    }
}
