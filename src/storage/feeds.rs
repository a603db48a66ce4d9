use super::schema::Database;
use super::types::{Feed, FeedWithOwner, NewFeed, StoreError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a new feed owned by `feed.user_id`.
    ///
    /// Fails with [`StoreError::UniqueViolation`] on a duplicate URL and
    /// [`StoreError::ForeignKeyViolation`] if the owner does not exist.
    pub async fn create_feed(&self, feed: &NewFeed) -> Result<Feed, StoreError> {
        let row = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, created_at, updated_at, name, url, user_id
        "#,
        )
        .bind(feed.id)
        .bind(feed.created_at)
        .bind(feed.updated_at)
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(feed = %row.name, url = %row.url, "Created feed");
        Ok(row)
    }

    /// All feeds joined with the name of the user who added them.
    pub async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>, StoreError> {
        let feeds = sqlx::query_as::<_, FeedWithOwner>(
            r#"
            SELECT f.name, f.url, u.name AS user_name
            FROM feeds f
            INNER JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at, f.name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Look up a feed by its URL.
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, Feed>(
            "SELECT id, created_at, updated_at, name, url, user_id FROM feeds WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("feed", url))
    }

    /// Delete every feed. Follows of those feeds cascade.
    pub async fn delete_feeds(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM feeds")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
