use super::schema::Database;
use super::types::{NewUser, StoreError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Insert a new user.
    ///
    /// Fails with [`StoreError::UniqueViolation`] if the name is taken.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, created_at, updated_at, name)
            VALUES (?, ?, ?, ?)
            RETURNING id, created_at, updated_at, name
        "#,
        )
        .bind(user.id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(user = %row.name, id = %row.id, "Created user");
        Ok(row)
    }

    /// Look up a user by name.
    pub async fn get_user(&self, name: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", name))
    }

    /// All users, oldest first. An empty store yields an empty Vec.
    pub async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name FROM users ORDER BY created_at, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Delete every user. Feeds and follows owned by them cascade.
    pub async fn delete_users(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
