//! Relational store for users, feeds, and feed follows.
//!
//! Every operation is a single round-trip against SQLite through sqlx; joins
//! happen in SQL so callers receive display-ready rows.

mod feed_follows;
mod feeds;
mod schema;
mod types;
mod users;

pub use schema::Database;
pub use types::{
    Feed, FeedFollow, FeedWithOwner, NewFeed, NewFeedFollow, NewUser, StoreError, User,
};
