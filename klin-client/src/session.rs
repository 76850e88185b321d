use std::io::{self, Write};
use std::path::PathBuf;

use klin_shared::api::{self, rest::RestError};
use tracing::{info, warn};

use crate::config::{self, ClientConfig};
use crate::router::{Route, RouteEvent};
use crate::state::{ACTIVE_HOUSEHOLD_KEY, LocalStore};
use crate::{AppError, delete_token_from_keyring, read_token_from_keyring, store_token_in_keyring};

/// Client-side session: server, token, persisted selection and the current route.
pub struct Session {
    config_path: PathBuf,
    server_url: Option<String>,
    token: Option<String>,
    store: LocalStore,
    route: Route,
}

impl Session {
    pub fn load(cli_config: Option<PathBuf>) -> Result<Self, AppError> {
        let explicit = cli_config.is_some() || std::env::var(config::ENV_CONFIG).is_ok();
        let config_path = config::resolve_config_path(cli_config)?;
        let server_url = if config_path.exists() {
            Some(config::normalize_server_url(
                &config::load_config(&config_path)?.server_url,
            ))
        } else {
            None
        };
        let store = LocalStore::open(config::state_path(&config_path, explicit)?)?;
        let token = match &server_url {
            Some(url) => read_token_from_keyring(url)?,
            None => None,
        };
        let route = Route::launch(token.is_some(), store.active_household());
        Ok(Self {
            config_path,
            server_url,
            token,
            store,
            route,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    /// Feeds an event to the router and mirrors the household selection to local state.
    pub fn apply(&mut self, event: RouteEvent) -> Result<(), AppError> {
        let next = std::mem::replace(&mut self.route, Route::Unauthenticated).on(event);
        match next.household_id() {
            Some(hid) => self.store.set(ACTIVE_HOUSEHOLD_KEY, hid)?,
            None => self.store.remove(ACTIVE_HOUSEHOLD_KEY)?,
        }
        self.route = next;
        Ok(())
    }

    /// Server URL and token of a signed-in session.
    pub fn credentials(&self) -> Result<(String, String), AppError> {
        match (&self.server_url, &self.token) {
            (Some(url), Some(token)) if self.route.is_signed_in() => {
                Ok((url.clone(), token.clone()))
            }
            _ => Err(AppError::State(
                "not signed in; run `klin signin` or `klin signup`".into(),
            )),
        }
    }

    /// Credentials plus the active household id.
    pub fn household_scope(&self) -> Result<(String, String, String), AppError> {
        let (url, token) = self.credentials()?;
        let hid = self.route.household_id().ok_or_else(|| {
            AppError::State(
                "no active household; run `klin household create|join|use` first".into(),
            )
        })?;
        Ok((url, token, hid.to_string()))
    }

    /// Converts a REST failure, dropping the local session when the server rejects the token.
    pub fn check<T>(&mut self, res: Result<T, RestError>) -> Result<T, AppError> {
        match res {
            Ok(v) => Ok(v),
            Err(e) if e.status() == Some(401) => {
                warn!("server rejected the session token; signing out locally");
                self.forget_session()?;
                Err(AppError::State(
                    "session expired; run `klin signin` again".into(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn forget_session(&mut self) -> Result<(), AppError> {
        if let Some(url) = &self.server_url {
            delete_token_from_keyring(url)?;
        }
        self.token = None;
        self.apply(RouteEvent::SignedOut)
    }

    fn resolve_server(&self, server_arg: Option<String>) -> Result<String, AppError> {
        Ok(match (server_arg, &self.server_url) {
            (Some(s), _) => config::normalize_server_url(&s),
            (None, Some(s)) => s.clone(),
            (None, None) => {
                let typed = prompt(&format!(
                    "Server URL [{}]: ",
                    config::DEFAULT_SERVER_URL
                ))?;
                if typed.is_empty() {
                    config::DEFAULT_SERVER_URL.to_string()
                } else {
                    config::normalize_server_url(&typed)
                }
            }
        })
    }

    pub async fn sign_up(
        &mut self,
        server_arg: Option<String>,
        email_arg: Option<String>,
        name_arg: Option<String>,
        timezone_arg: Option<String>,
    ) -> Result<(), AppError> {
        let server_url = self.resolve_server(server_arg)?;
        let email = arg_or_prompt(email_arg, "Email: ")?;
        let name = arg_or_prompt(name_arg, "Name: ")?;
        let password = read_password("Password (min. 6 characters): ")?;
        let confirm = read_password("Repeat password: ")?;
        if password != confirm {
            return Err(AppError::State("passwords do not match".into()));
        }
        let resp = api::rest::sign_up(
            &server_url,
            &api::SignUpReq {
                email,
                password,
                name,
                timezone: timezone_arg,
            },
        )
        .await?;
        self.establish(server_url, resp).await
    }

    pub async fn sign_in(
        &mut self,
        server_arg: Option<String>,
        email_arg: Option<String>,
    ) -> Result<(), AppError> {
        let server_url = self.resolve_server(server_arg)?;
        let email = arg_or_prompt(email_arg, "Email: ")?;
        let password = read_password("Password: ")?;
        let resp = api::rest::sign_in(&server_url, &api::SignInReq { email, password })
            .await
            .map_err(|e| match e.status() {
                Some(401) => AppError::Http("sign in failed: wrong email or password".into()),
                _ => e.into(),
            })?;
        self.establish(server_url, resp).await
    }

    /// Persists a fresh session and picks the household to land in.
    async fn establish(&mut self, server_url: String, resp: api::AuthResp) -> Result<(), AppError> {
        store_token_in_keyring(&server_url, &resp.token)?;
        config::save_config(
            &self.config_path,
            &ClientConfig {
                server_url: server_url.clone(),
            },
        )?;

        let households = api::rest::list_households(&server_url, &resp.token).await?;
        let remembered = self.store.active_household().map(str::to_string);
        let active = match remembered {
            Some(hid) if households.iter().any(|h| h.id == hid) => Some(hid),
            _ if households.len() == 1 => Some(households[0].id.clone()),
            _ => None,
        };

        self.server_url = Some(server_url.clone());
        self.token = Some(resp.token);
        self.apply(RouteEvent::SignedIn {
            active_household: active,
        })?;
        info!(user_id = %resp.user.id, "signed in");
        println!("Signed in to {} as {} <{}>", server_url, resp.user.name, resp.user.email);
        match self.route.household_id() {
            Some(hid) => println!("Active household: {hid}"),
            None if households.is_empty() => {
                println!("No household yet: `klin household create <name>` or `klin household join <code>`")
            }
            None => println!("Pick a household with `klin household use <id>` (see `klin household list`)"),
        }
        Ok(())
    }

    /// Swaps the current token for a fresh one; the old session ends server-side.
    pub async fn renew(&mut self) -> Result<(), AppError> {
        let (url, token) = self.credentials()?;
        let resp = self.check(api::rest::renew_token(&url, &token).await)?;
        store_token_in_keyring(&url, &resp.token)?;
        self.token = Some(resp.token);
        info!(user_id = %resp.user.id, "session renewed");
        println!("Session renewed for {}", resp.user.email);
        Ok(())
    }

    pub async fn sign_out(&mut self) -> Result<(), AppError> {
        if let (Some(url), Some(token)) = (&self.server_url, &self.token) {
            match api::rest::sign_out(url, token).await {
                Ok(()) => {}
                Err(e) if e.status() == Some(401) => {}
                Err(e) => warn!(error=%e, "server sign-out failed; clearing local session anyway"),
            }
        }
        self.forget_session()?;
        println!("Signed out");
        Ok(())
    }
}

fn arg_or_prompt(arg: Option<String>, msg: &str) -> Result<String, AppError> {
    match arg {
        Some(v) => Ok(v),
        None => prompt(msg),
    }
}

fn prompt(msg: &str) -> Result<String, AppError> {
    print!("{}", msg);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).map_err(AppError::Io)?;
    Ok(buf.trim().to_string())
}

fn read_password(msg: &str) -> Result<String, AppError> {
    rpassword::prompt_password(msg).map_err(AppError::Io)
}
