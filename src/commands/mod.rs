//! Command dispatch for the `gator` CLI.
//!
//! A [`Commands`] registry maps each [`CommandName`] to a [`Handler`]. The
//! dispatcher checks the argument count before any handler runs, so an
//! invocation with the wrong arity never touches the store.
//!
//! Handlers that need an identity are wrapped with [`require_login`], which
//! resolves the logged-in user once and passes it explicitly.

mod feeds;
mod middleware;
mod users;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::feed::FetchError;
use crate::storage::{Database, StoreError};
use crate::util::UrlValidationError;

pub use feeds::{AddFeed, Aggregate, Follow, Following, ListFeeds, Unfollow};
pub use middleware::{require_login, AuthedHandler, RequireLogin};
pub use users::{ListUsers, Login, Register, Reset};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unable to find command: {0}")]
    UnknownCommand(String),

    /// Missing or malformed arguments; nothing was attempted
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Duplicate user name, feed URL, or follow pair
    #[error("{0}")]
    Conflict(String),

    #[error("no user is logged in; run `gator login <name>` first")]
    NotLoggedIn,

    #[error("could not resolve the logged-in user: {0}")]
    AuthResolution(#[source] StoreError),

    #[error("{0} database is empty")]
    Empty(&'static str),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => CommandError::NotFound { entity, key },
            StoreError::UniqueViolation(_) => CommandError::Conflict(err.to_string()),
            other => CommandError::Store(other),
        }
    }
}

impl From<UrlValidationError> for CommandError {
    fn from(err: UrlValidationError) -> Self {
        CommandError::Validation(format!("invalid feed URL: {}", err))
    }
}

// ============================================================================
// Process State
// ============================================================================

/// Everything a handler may touch during one invocation.
pub struct State {
    pub config: Config,
    /// Where `config` is persisted by `login` and `register`
    pub config_path: PathBuf,
    pub db: Database,
    pub http: reqwest::Client,
    /// Command output; stdout in the binary, a buffer in tests
    pub out: Box<dyn Write + Send>,
}

impl State {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        db: Database,
        http: reqwest::Client,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            config,
            config_path,
            db,
            http,
            out,
        }
    }
}

// ============================================================================
// Command Names
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Login,
    Register,
    Reset,
    Users,
    Agg,
    AddFeed,
    Feeds,
    Follow,
    Following,
    Unfollow,
}

impl CommandName {
    pub const ALL: [CommandName; 10] = [
        CommandName::Login,
        CommandName::Register,
        CommandName::Reset,
        CommandName::Users,
        CommandName::Agg,
        CommandName::AddFeed,
        CommandName::Feeds,
        CommandName::Follow,
        CommandName::Following,
        CommandName::Unfollow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::Login => "login",
            CommandName::Register => "register",
            CommandName::Reset => "reset",
            CommandName::Users => "users",
            CommandName::Agg => "agg",
            CommandName::AddFeed => "addfeed",
            CommandName::Feeds => "feeds",
            CommandName::Follow => "follow",
            CommandName::Following => "following",
            CommandName::Unfollow => "unfollow",
        }
    }

    /// Exact number of positional arguments the command takes.
    pub fn arity(self) -> usize {
        match self {
            CommandName::Reset
            | CommandName::Users
            | CommandName::Feeds
            | CommandName::Following => 0,
            CommandName::Login
            | CommandName::Register
            | CommandName::Agg
            | CommandName::Follow
            | CommandName::Unfollow => 1,
            CommandName::AddFeed => 2,
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            CommandName::Login => "login <username>",
            CommandName::Register => "register <username>",
            CommandName::Reset => "reset",
            CommandName::Users => "users",
            CommandName::Agg => "agg <url>",
            CommandName::AddFeed => "addfeed <name> <url>",
            CommandName::Feeds => "feeds",
            CommandName::Follow => "follow <url>",
            CommandName::Following => "following",
            CommandName::Unfollow => "unfollow <url>",
        }
    }
}

impl FromStr for CommandName {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| CommandError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// A parsed invocation: the command word and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// The behavior bound to one command name.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn run(&self, state: &mut State, args: &[String]) -> Result<(), CommandError>;
}

pub struct Commands {
    handlers: HashMap<CommandName, Box<dyn Handler>>,
}

impl Commands {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with every built-in command bound.
    pub fn with_defaults() -> Self {
        let mut commands = Self::new();
        commands.register(CommandName::Login, Login);
        commands.register(CommandName::Register, Register);
        commands.register(CommandName::Reset, Reset);
        commands.register(CommandName::Users, ListUsers);
        commands.register(CommandName::Agg, Aggregate);
        commands.register(CommandName::AddFeed, require_login(AddFeed));
        commands.register(CommandName::Feeds, ListFeeds);
        commands.register(CommandName::Follow, require_login(Follow));
        commands.register(CommandName::Following, require_login(Following));
        commands.register(CommandName::Unfollow, require_login(Unfollow));
        commands
    }

    /// Binds `handler` to `name`, replacing any earlier binding.
    pub fn register(&mut self, name: CommandName, handler: impl Handler + 'static) {
        self.handlers.insert(name, Box::new(handler));
    }

    /// Runs the handler bound to `command.name`.
    ///
    /// # Errors
    ///
    /// - `UnknownCommand` if the name is not a command or has no handler
    /// - `Validation` if the argument count is wrong
    /// - whatever the handler itself returns
    pub async fn run(&self, state: &mut State, command: &Command) -> Result<(), CommandError> {
        let name: CommandName = command.name.parse()?;

        let expected = name.arity();
        if command.args.len() != expected {
            return Err(CommandError::Validation(format!(
                "{} expects {} argument{}, got {}; usage: {}",
                name,
                expected,
                if expected == 1 { "" } else { "s" },
                command.args.len(),
                name.usage()
            )));
        }
        if let Some(blank) = command.args.iter().position(|a| a.trim().is_empty()) {
            return Err(CommandError::Validation(format!(
                "argument {} of {} must not be empty; usage: {}",
                blank + 1,
                name,
                name.usage()
            )));
        }

        let handler = self
            .handlers
            .get(&name)
            .ok_or_else(|| CommandError::UnknownCommand(command.name.clone()))?;

        tracing::debug!(command = %name, args = command.args.len(), "Dispatching command");
        handler.run(state, &command.args).await
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Borrows exactly `N` arguments, for handlers that may also be invoked
/// directly rather than through [`Commands::run`].
fn expect_args<'a, const N: usize>(
    name: CommandName,
    args: &'a [String],
) -> Result<[&'a str; N], CommandError> {
    let usage = || CommandError::Validation(format!("usage: {}", name.usage()));
    if args.len() != N || args.iter().any(|a| a.trim().is_empty()) {
        return Err(usage());
    }
    let mut out = [""; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_str();
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
