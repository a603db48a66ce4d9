use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Store errors, classified from the driver's error kind so callers can
/// tell a missing row or a constraint violation apart from an I/O failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lookup by key matched no row
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// An insert collided with a UNIQUE constraint
    #[error("already exists ({0})")]
    UniqueViolation(String),

    /// An insert referenced a user or feed that does not exist
    #[error("referenced row does not exist ({0})")]
    ForeignKeyViolation(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[source] sqlx::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return StoreError::UniqueViolation(db_err.message().to_string())
                }
                ErrorKind::ForeignKeyViolation => {
                    return StoreError::ForeignKeyViolation(db_err.message().to_string())
                }
                _ => {}
            }
        }
        StoreError::Other(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from_sqlx(err)
    }
}

// ============================================================================
// Insert Parameters
// ============================================================================

/// A user row ready to insert. Id and timestamps are fixed at construction.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFeed {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
}

impl NewFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFeedFollow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub feed_id: Uuid,
}

impl NewFeedFollow {
    pub fn new(user_id: Uuid, feed_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            user_id,
            feed_id,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered identity. Names are unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

/// A named syndication source. `url` is unique; `user_id` is the creator.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
}

/// Feed listing row, joined with the creator's name.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedWithOwner {
    pub name: String,
    pub url: String,
    pub user_name: String,
}

/// A follow relationship joined with the user and feed names for display.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub user_name: String,
    pub feed_name: String,
}
