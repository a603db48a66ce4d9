use async_trait::async_trait;
use std::io::Write;

use super::middleware::AuthedHandler;
use super::{expect_args, CommandError, CommandName, Handler, State};
use crate::feed::fetch_feed;
use crate::storage::{NewFeed, NewFeedFollow, StoreError, User};
use crate::util::validate_feed_url;

/// Validates `raw` and returns it trimmed. Feeds are stored and looked up by
/// the URL as typed, not the normalized form, so `follow` matches `addfeed`.
fn feed_url(raw: &str) -> Result<&str, CommandError> {
    let trimmed = raw.trim();
    validate_feed_url(trimmed)?;
    Ok(trimmed)
}

/// `agg <url>`: fetch one feed and print it. Nothing is stored.
pub struct Aggregate;

#[async_trait]
impl Handler for Aggregate {
    async fn run(&self, state: &mut State, args: &[String]) -> Result<(), CommandError> {
        let [raw_url] = expect_args::<1>(CommandName::Agg, args)?;
        let url = feed_url(raw_url)?;

        let feed = fetch_feed(&state.http, url).await?;
        write!(state.out, "{}", feed)?;
        Ok(())
    }
}

/// `addfeed <name> <url>`: create a feed owned by the current user and
/// follow it.
///
/// The two inserts are separate statements. If the follow fails, the feed
/// row has already been committed and stays.
pub struct AddFeed;

#[async_trait]
impl AuthedHandler for AddFeed {
    async fn run(
        &self,
        state: &mut State,
        args: &[String],
        user: &User,
    ) -> Result<(), CommandError> {
        let [name, raw_url] = expect_args::<2>(CommandName::AddFeed, args)?;
        let url = feed_url(raw_url)?;

        let feed = state
            .db
            .create_feed(&NewFeed::new(name, url, user.id))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    CommandError::Conflict(format!("a feed with this URL already exists: {}", url))
                }
                other => other.into(),
            })?;
        tracing::info!(feed = %feed.name, url = %feed.url, user = %user.name, "Added feed");
        writeln!(state.out, "feed was created: {}", feed.name)?;
        writeln!(state.out, "  id:   {}", feed.id)?;
        writeln!(state.out, "  url:  {}", feed.url)?;

        let follow = state
            .db
            .create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await?;
        writeln!(
            state.out,
            "{} is now following {}",
            follow.user_name, follow.feed_name
        )?;
        Ok(())
    }
}

/// `feeds`: list every feed with the name of the user who added it.
pub struct ListFeeds;

#[async_trait]
impl Handler for ListFeeds {
    async fn run(&self, state: &mut State, _args: &[String]) -> Result<(), CommandError> {
        let feeds = state.db.get_feeds().await?;
        if feeds.is_empty() {
            writeln!(state.out, "no feeds have been added yet")?;
            return Ok(());
        }

        for feed in &feeds {
            writeln!(
                state.out,
                "* {} ({}) added by {}",
                feed.name, feed.url, feed.user_name
            )?;
        }
        Ok(())
    }
}

/// `follow <url>`: follow a feed someone has already added.
pub struct Follow;

#[async_trait]
impl AuthedHandler for Follow {
    async fn run(
        &self,
        state: &mut State,
        args: &[String],
        user: &User,
    ) -> Result<(), CommandError> {
        let [raw_url] = expect_args::<1>(CommandName::Follow, args)?;
        let url = feed_url(raw_url)?;

        let feed = state.db.get_feed_by_url(url).await?;
        let follow = state
            .db
            .create_feed_follow(&NewFeedFollow::new(user.id, feed.id))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => CommandError::Conflict(format!(
                    "{} already follows {}",
                    user.name, feed.name
                )),
                other => other.into(),
            })?;

        tracing::info!(feed = %follow.feed_name, user = %follow.user_name, "Followed feed");
        writeln!(
            state.out,
            "{} is now following {}",
            follow.user_name, follow.feed_name
        )?;
        Ok(())
    }
}

/// `following`: list the feeds the current user follows.
pub struct Following;

#[async_trait]
impl AuthedHandler for Following {
    async fn run(
        &self,
        state: &mut State,
        _args: &[String],
        user: &User,
    ) -> Result<(), CommandError> {
        let follows = state.db.get_feed_follows_for_user(&user.name).await?;

        writeln!(state.out, "feeds followed by {}:", user.name)?;
        for follow in &follows {
            writeln!(state.out, "* {}", follow.feed_name)?;
        }
        Ok(())
    }
}

/// `unfollow <url>`: stop following a feed. Unfollowing a feed that is not
/// followed succeeds without changes.
pub struct Unfollow;

#[async_trait]
impl AuthedHandler for Unfollow {
    async fn run(
        &self,
        state: &mut State,
        args: &[String],
        user: &User,
    ) -> Result<(), CommandError> {
        let [raw_url] = expect_args::<1>(CommandName::Unfollow, args)?;
        let url = feed_url(raw_url)?;

        let removed = state.db.delete_feed_follow(user.id, url).await?;
        if removed == 0 {
            tracing::debug!(url = %url, user = %user.name, "Unfollow matched no rows");
            writeln!(state.out, "{} was not following {}", user.name, url)?;
        } else {
            writeln!(state.out, "{} unfollowed {}", user.name, url)?;
        }
        Ok(())
    }
}
