use uuid::Uuid;

use super::schema::Database;
use super::types::{FeedFollow, NewFeedFollow, StoreError};

const FOLLOW_COLUMNS: &str = r#"
    ff.id, ff.created_at, ff.updated_at, ff.user_id, ff.feed_id,
    u.name AS user_name,
    f.name AS feed_name
"#;

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Record that a user follows a feed, returning the row joined with both
    /// names.
    ///
    /// The insert and the joined read-back run in one transaction. Fails with
    /// [`StoreError::UniqueViolation`] if the pair already exists and
    /// [`StoreError::ForeignKeyViolation`] if the user or feed is missing.
    pub async fn create_feed_follow(
        &self,
        follow: &NewFeedFollow,
    ) -> Result<FeedFollow, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(follow.id)
        .bind(follow.created_at)
        .bind(follow.updated_at)
        .bind(follow.user_id)
        .bind(follow.feed_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, FeedFollow>(&format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM feed_follows ff
            INNER JOIN users u ON u.id = ff.user_id
            INNER JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = ?
        "#
        ))
        .bind(follow.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(user = %row.user_name, feed = %row.feed_name, "Created feed follow");
        Ok(row)
    }

    /// Every follow belonging to the named user, oldest first.
    pub async fn get_feed_follows_for_user(
        &self,
        user_name: &str,
    ) -> Result<Vec<FeedFollow>, StoreError> {
        let follows = sqlx::query_as::<_, FeedFollow>(&format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM feed_follows ff
            INNER JOIN users u ON u.id = ff.user_id
            INNER JOIN feeds f ON f.id = ff.feed_id
            WHERE u.name = ?
            ORDER BY ff.created_at, f.name
        "#
        ))
        .bind(user_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Remove the follow between `user_id` and the feed at `url`.
    ///
    /// Returns the number of rows removed; zero means the user was not
    /// following that feed, or no feed has that URL.
    pub async fn delete_feed_follow(&self, user_id: Uuid, url: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = ?
              AND feed_id = (SELECT id FROM feeds WHERE url = ?)
        "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every follow.
    pub async fn delete_feed_follows(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM feed_follows")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, Feed, NewFeed, NewFeedFollow, NewUser, StoreError, User};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    const HN_URL: &str = "https://news.ycombinator.com/rss";

    async fn seed() -> (Database, User, Feed) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user(&NewUser::new("ana")).await.unwrap();
        let feed = db
            .create_feed(&NewFeed::new("HN", HN_URL, user.id))
            .await
            .unwrap();
        (db, user, feed)
    }

    #[tokio::test]
    async fn test_create_feed_follow_returns_joined_names() {
        let (db, user, feed) = seed().await;

        let follow = db
            .create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .unwrap();
        assert_eq!(follow.user_id, user.id);
        assert_eq!(follow.feed_id, feed.id);
        assert_eq!(follow.user_name, "ana");
        assert_eq!(follow.feed_name, "HN");
    }

    #[tokio::test]
    async fn test_duplicate_follow_is_unique_violation() {
        let (db, user, feed) = seed().await;
        let first = db
            .create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .unwrap();

        let err = db
            .create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)), "{:?}", err);

        let follows = db.get_feed_follows_for_user("ana").await.unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].id, first.id);
    }

    #[tokio::test]
    async fn test_follow_missing_feed_is_foreign_key_violation() {
        let (db, user, _feed) = seed().await;
        let err = db
            .create_feed_follow(&NewFeedFollow::new(user.id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "{:?}", err);
        assert!(db.get_feed_follows_for_user("ana").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follows_are_scoped_to_user() {
        let (db, ana, feed) = seed().await;
        let bob = db.create_user(&NewUser::new("bob")).await.unwrap();
        let lobsters = db
            .create_feed(&NewFeed::new("Lobsters", "https://lobste.rs/rss", bob.id))
            .await
            .unwrap();

        db.create_feed_follow(&NewFeedFollow::new(ana.id, feed.id))
            .await
            .unwrap();
        db.create_feed_follow(&NewFeedFollow::new(bob.id, feed.id))
            .await
            .unwrap();
        db.create_feed_follow(&NewFeedFollow::new(bob.id, lobsters.id))
            .await
            .unwrap();

        let ana_feeds: Vec<String> = db
            .get_feed_follows_for_user("ana")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.feed_name)
            .collect();
        assert_eq!(ana_feeds, vec!["HN".to_string()]);
        assert_eq!(db.get_feed_follows_for_user("bob").await.unwrap().len(), 2);
        assert!(db.get_feed_follows_for_user("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_feed_follow_by_url() {
        let (db, user, feed) = seed().await;
        db.create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .unwrap();

        assert_eq!(db.delete_feed_follow(user.id, HN_URL).await.unwrap(), 1);
        assert!(db.get_feed_follows_for_user("ana").await.unwrap().is_empty());

        // Second delete matches nothing and is not an error
        assert_eq!(db.delete_feed_follow(user.id, HN_URL).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_feed_follow_unknown_url_is_noop() {
        let (db, user, feed) = seed().await;
        db.create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .unwrap();

        let removed = db
            .delete_feed_follow(user.id, "https://unknown.example.com/rss")
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(db.get_feed_follows_for_user("ana").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_feed_follow_leaves_other_users() {
        let (db, ana, feed) = seed().await;
        let bob = db.create_user(&NewUser::new("bob")).await.unwrap();
        db.create_feed_follow(&NewFeedFollow::new(ana.id, feed.id))
            .await
            .unwrap();
        db.create_feed_follow(&NewFeedFollow::new(bob.id, feed.id))
            .await
            .unwrap();

        db.delete_feed_follow(ana.id, HN_URL).await.unwrap();
        assert_eq!(db.get_feed_follows_for_user("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_order_clears_all_tables() {
        let (db, user, feed) = seed().await;
        db.create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .unwrap();

        db.delete_users().await.unwrap();
        db.delete_feeds().await.unwrap();
        db.delete_feed_follows().await.unwrap();

        assert!(db.get_users().await.unwrap().is_empty());
        assert!(db.get_feeds().await.unwrap().is_empty());
        assert!(db.get_feed_follows_for_user("ana").await.unwrap().is_empty());
    }
}
