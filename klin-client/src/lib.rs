use klin_shared::api::rest::RestError;
use tracing::debug;

pub mod cli;
pub mod commands;
pub mod config;
pub mod router;
pub mod session;
pub mod state;

pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};
pub use router::{Route, RouteEvent};

const KEYRING_SERVICE: &str = "klin";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("{0}")]
    State(String),
}

impl From<RestError> for AppError {
    fn from(e: RestError) -> Self {
        match e {
            // Server errors carry a JSON body like {"error": "..."}
            RestError::Status { status, body } => {
                let msg = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|m| m.as_str()).map(str::to_string))
                    .unwrap_or(body);
                AppError::Http(format!("{status}: {msg}"))
            }
            other => AppError::Http(other.to_string()),
        }
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn keyring_entry(server_url: &str) -> Result<keyring::Entry, AppError> {
    keyring::Entry::new(KEYRING_SERVICE, &config::normalize_server_url(server_url))
        .map_err(|e| AppError::Keyring(e.to_string()))
}

/// Stored session token for `server_url`, if any.
pub(crate) fn read_token_from_keyring(server_url: &str) -> Result<Option<String>, AppError> {
    match keyring_entry(server_url)?.get_password() {
        Ok(t) => Ok(Some(t)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(AppError::Keyring(e.to_string())),
    }
}

pub(crate) fn store_token_in_keyring(server_url: &str, token: &str) -> Result<(), AppError> {
    keyring_entry(server_url)?
        .set_password(token)
        .map_err(|e| AppError::Keyring(e.to_string()))
}

pub(crate) fn delete_token_from_keyring(server_url: &str) -> Result<(), AppError> {
    match keyring_entry(server_url)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AppError::Keyring(e.to_string())),
    }
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    init_tracing();

    let mut session = session::Session::load(cli.config)?;
    debug!(route = %session.route(), "session loaded");

    match cli.command {
        Command::Signup {
            server,
            email,
            name,
            timezone,
        } => session.sign_up(server, email, name, timezone).await,
        Command::Signin { server, email } => session.sign_in(server, email).await,
        Command::Signout => session.sign_out().await,
        Command::Renew => session.renew().await,
        Command::Status => commands::status(&mut session).await,
        Command::Household(cmd) => commands::household(&mut session, cmd).await,
        Command::Tasks(cmd) => commands::tasks(&mut session, cmd).await,
        Command::Points { action } => commands::points(&mut session, action).await,
        Command::Streak { action } => commands::streak(&mut session, action).await,
        Command::Badges { action } => commands::badges(&mut session, action).await,
        Command::Leaderboard => commands::leaderboard(&mut session).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_status_errors_surface_server_message() {
        let err: AppError = RestError::Status {
            status: 409,
            body: r#"{"error":"already a member"}"#.into(),
        }
        .into();
        assert_eq!(err.to_string(), "http error: 409: already a member");

        let err: AppError = RestError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.to_string(), "http error: 502: bad gateway");
    }
}
