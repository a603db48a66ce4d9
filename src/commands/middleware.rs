use async_trait::async_trait;

use super::{CommandError, Handler, State};
use crate::storage::User;

/// A handler that runs on behalf of a resolved user.
#[async_trait]
pub trait AuthedHandler: Send + Sync {
    async fn run(&self, state: &mut State, args: &[String], user: &User)
        -> Result<(), CommandError>;
}

/// Wraps an [`AuthedHandler`] so it can be registered like any other
/// command. The current user is looked up on every call; if that fails the
/// inner handler is never invoked.
pub struct RequireLogin<H>(H);

pub fn require_login<H: AuthedHandler>(handler: H) -> RequireLogin<H> {
    RequireLogin(handler)
}

#[async_trait]
impl<H: AuthedHandler> Handler for RequireLogin<H> {
    async fn run(&self, state: &mut State, args: &[String]) -> Result<(), CommandError> {
        let name = state.config.current_user_name.trim();
        if name.is_empty() {
            return Err(CommandError::NotLoggedIn);
        }

        let user = state
            .db
            .get_user(name)
            .await
            .map_err(CommandError::AuthResolution)?;

        tracing::debug!(user = %user.name, "Resolved current user");
        self.0.run(state, args, &user).await
    }
}
