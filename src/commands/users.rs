use async_trait::async_trait;
use std::io::Write;

use super::{expect_args, CommandError, CommandName, Handler, State};
use crate::storage::{NewUser, StoreError};

/// `login <username>`: switch the current user to an existing account.
pub struct Login;

#[async_trait]
impl Handler for Login {
    async fn run(&self, state: &mut State, args: &[String]) -> Result<(), CommandError> {
        let [name] = expect_args::<1>(CommandName::Login, args)?;

        let user = state.db.get_user(name).await?;
        state.config.set_user(&state.config_path, &user.name)?;

        tracing::info!(user = %user.name, "Logged in");
        writeln!(state.out, "user has been logged in: {}", user.name)?;
        Ok(())
    }
}

/// `register <username>`: create an account and log in as it.
pub struct Register;

#[async_trait]
impl Handler for Register {
    async fn run(&self, state: &mut State, args: &[String]) -> Result<(), CommandError> {
        let [name] = expect_args::<1>(CommandName::Register, args)?;

        match state.db.get_user(name).await {
            Ok(_) => {
                return Err(CommandError::Conflict(format!(
                    "user already exists: {}",
                    name
                )))
            }
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        // A concurrent register can still win the race; the UNIQUE constraint
        // turns that into a Conflict as well.
        let user = state.db.create_user(&NewUser::new(name)).await?;
        state.config.set_user(&state.config_path, &user.name)?;

        tracing::info!(user = %user.name, id = %user.id, "Registered user");
        writeln!(state.out, "user was created: {}", user.name)?;
        writeln!(state.out, "  id:         {}", user.id)?;
        writeln!(state.out, "  created at: {}", user.created_at.to_rfc3339())?;
        Ok(())
    }
}

/// `reset`: delete every user, feed, and follow.
pub struct Reset;

#[async_trait]
impl Handler for Reset {
    async fn run(&self, state: &mut State, _args: &[String]) -> Result<(), CommandError> {
        // Children first, so no table is emptied by a cascade before it is counted
        let follows = state.db.delete_feed_follows().await?;
        writeln!(state.out, "feed_follows table reset ({} removed)", follows)?;

        let feeds = state.db.delete_feeds().await?;
        writeln!(state.out, "feeds table reset ({} removed)", feeds)?;

        let users = state.db.delete_users().await?;
        writeln!(state.out, "users table reset ({} removed)", users)?;

        tracing::info!(users, feeds, follows, "Database reset");
        Ok(())
    }
}

/// `users`: list accounts, marking the logged-in one.
pub struct ListUsers;

#[async_trait]
impl Handler for ListUsers {
    async fn run(&self, state: &mut State, _args: &[String]) -> Result<(), CommandError> {
        let users = state.db.get_users().await?;
        if users.is_empty() {
            return Err(CommandError::Empty("users"));
        }

        for user in &users {
            if user.name == state.config.current_user_name {
                writeln!(state.out, "* {} (current)", user.name)?;
            } else {
                writeln!(state.out, "* {}", user.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Commands;
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_register_creates_user_and_logs_in() {
        let mut env = test_env().await;
        let commands = Commands::with_defaults();

        commands
            .run(&mut env.state, &cmd("register", &["ana"]))
            .await
            .unwrap();

        let user = env.state.db.get_user("ana").await.unwrap();
        assert_eq!(user.name, "ana");
        assert_eq!(env.state.config.current_user_name, "ana");
        assert_eq!(
            Config::load(&env.state.config_path).unwrap().current_user_name,
            "ana"
        );
        assert!(env.out.contents().starts_with("user was created: ana\n"));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict_and_keeps_row() {
        let mut env = test_env().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut env.state, &cmd("register", &["ana"]))
            .await
            .unwrap();
        let original = env.state.db.get_user("ana").await.unwrap();

        let err = commands
            .run(&mut env.state, &cmd("register", &["ana"]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Conflict(_)), "{:?}", err);
        let after = env.state.db.get_user("ana").await.unwrap();
        assert_eq!(after.id, original.id);
        assert_eq!(after.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_not_found() {
        let mut env = test_env().await;
        let commands = Commands::with_defaults();

        let err = commands
            .run(&mut env.state, &cmd("login", &["nobody"]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::NotFound { entity: "user", .. }));
        assert!(env.state.config.current_user_name.is_empty());
        assert!(!env.state.config_path.exists());
    }

    #[tokio::test]
    async fn test_login_switches_user() {
        let mut env = test_env().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut env.state, &cmd("register", &["ana"]))
            .await
            .unwrap();
        commands
            .run(&mut env.state, &cmd("register", &["bob"]))
            .await
            .unwrap();
        env.out.clear();

        commands
            .run(&mut env.state, &cmd("login", &["ana"]))
            .await
            .unwrap();

        assert_eq!(env.state.config.current_user_name, "ana");
        assert_eq!(env.out.contents(), "user has been logged in: ana\n");
    }

    #[tokio::test]
    async fn test_users_marks_current() {
        let mut env = test_env().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut env.state, &cmd("register", &["ana"]))
            .await
            .unwrap();
        commands
            .run(&mut env.state, &cmd("register", &["bob"]))
            .await
            .unwrap();
        env.out.clear();

        commands
            .run(&mut env.state, &cmd("users", &[]))
            .await
            .unwrap();

        assert_eq!(env.out.contents(), "* ana\n* bob (current)\n");
    }

    #[tokio::test]
    async fn test_users_empty_store() {
        let mut env = test_env().await;
        let err = Commands::with_defaults()
            .run(&mut env.state, &cmd("users", &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Empty("users")));
        assert_eq!(err.to_string(), "users database is empty");
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut env = test_env().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut env.state, &cmd("register", &["ana"]))
            .await
            .unwrap();
        commands
            .run(
                &mut env.state,
                &cmd("addfeed", &["HN", "https://news.ycombinator.com/rss"]),
            )
            .await
            .unwrap();
        env.out.clear();

        commands
            .run(&mut env.state, &cmd("reset", &[]))
            .await
            .unwrap();

        assert_eq!(
            env.out.contents(),
            "feed_follows table reset (1 removed)\n\
             feeds table reset (1 removed)\n\
             users table reset (1 removed)\n"
        );
        assert!(env.state.db.get_users().await.unwrap().is_empty());
        assert!(env.state.db.get_feeds().await.unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_register_then_login_sets_current_user(name in "[a-zA-Z0-9_.-]{1,24}") {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let current = rt.block_on(async {
                let mut env = test_env().await;
                let commands = Commands::with_defaults();
                commands
                    .run(&mut env.state, &cmd("register", &[name.as_str()]))
                    .await
                    .unwrap();
                commands
                    .run(&mut env.state, &cmd("login", &[name.as_str()]))
                    .await
                    .unwrap();
                Config::load(&env.state.config_path).unwrap().current_user_name
            });
            prop_assert_eq!(current, name);
        }
    }
}
