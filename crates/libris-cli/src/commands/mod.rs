//! Subcommands and the state they share.

mod auth;
mod books;
mod categories;
mod loans;
mod stats;
mod users;

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tracing::warn;

use libris_core::api::ApiError;
use libris_core::models::Identity;
use libris_core::storage::KeyValueStore;
use libris_core::{ApiClient, Config, SessionStore};

pub use stats::StatsReport;

pub struct Context {
    pub config: Config,
    pub client: ApiClient,
    pub session: SessionStore<Box<dyn KeyValueStore>, ApiClient>,
    pub json: bool,
}

impl Context {
    /// The signed-in identity, or an error telling the user to sign in.
    pub fn require_login(&self) -> Result<Identity> {
        match self.session.identity() {
            Some(identity) => Ok(identity),
            None => bail!("Not signed in. Run `libris login` first."),
        }
    }

    pub fn require_admin(&self) -> Result<Identity> {
        let identity = self.require_login()?;
        if !identity.is_admin() {
            bail!("This command requires an admin account.");
        }
        Ok(identity)
    }

    /// Pass an API result through, signing out if the server rejected the token.
    pub fn check<T>(&mut self, result: Result<T, ApiError>) -> Result<T> {
        result.map_err(|e| {
            if self.session.handle_api_error(&e) {
                warn!("Stored session was rejected by the server");
            }
            anyhow::Error::from(e)
        })
    }

    /// Print `value` as JSON when `--json` was given, otherwise call `table`.
    pub fn output<T: Serialize + ?Sized>(&self, value: &T, table: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            table(value);
        }
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Login(auth::Login),
    Register(auth::Register),
    Logout(auth::Logout),
    Whoami(auth::Whoami),
    #[command(subcommand)]
    Books(books::Books),
    #[command(subcommand)]
    Categories(categories::Categories),
    #[command(subcommand)]
    Users(users::Users),
    #[command(subcommand)]
    Loans(loans::Loans),
    Stats(stats::Stats),
}

impl Command {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Register(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx),
            Self::Whoami(cmd) => cmd.execute(ctx),
            Self::Books(cmd) => cmd.execute(ctx).await,
            Self::Categories(cmd) => cmd.execute(ctx).await,
            Self::Users(cmd) => cmd.execute(ctx).await,
            Self::Loans(cmd) => cmd.execute(ctx).await,
            Self::Stats(cmd) => cmd.execute(ctx).await,
        }
    }
}
