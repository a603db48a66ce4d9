//! `gator`: a command-line RSS aggregator.
//!
//! Users register, add feeds, and follow feeds added by others. Each
//! invocation runs one command against a SQLite store.

pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
