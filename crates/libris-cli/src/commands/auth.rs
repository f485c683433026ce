use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::warn;

use libris_core::auth::AuthBackend;
use libris_core::models::{LoginRequest, RegisterRequest, Role};
use libris_core::storage::KeyValueStore;
use libris_core::{Config, SessionStore};

use super::Context;
use crate::render;

/// Read one line from stdin after printing `label`. An empty answer falls
/// back to `default` when there is one.
fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    Ok(match (answer.is_empty(), default) {
        (true, Some(d)) => d.to_string(),
        _ => answer.to_string(),
    })
}

/// Store the email as the next login default. Only `last_email` is written,
/// so command-line and environment overrides never reach the file.
fn remember_email(ctx: &mut Context, email: String) {
    ctx.config.last_email = Some(email.clone());
    let result = Config::config_path()
        .and_then(|path| {
            let mut stored = Config::load_from(&path)?;
            stored.last_email = Some(email);
            stored.save_to(&path)
        });
    if let Err(e) = result {
        warn!(error = %e, "Failed to save config");
    }
}

/// Login and register never replace an active session.
fn already_signed_in<S: KeyValueStore, A: AuthBackend>(session: &SessionStore<S, A>) -> Option<String> {
    session.identity().map(|identity| {
        format!(
            "Already signed in as {}. Run `libris logout` first.",
            identity.username
        )
    })
}

fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

/// Sign in with email and password.
#[derive(Debug, Args)]
pub struct Login {
    /// Account email; prompted for when omitted.
    #[arg(short, long)]
    email: Option<String>,
}

impl Login {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        if let Some(notice) = already_signed_in(&ctx.session) {
            println!("{}", notice);
            return Ok(());
        }

        let email = match self.email {
            Some(email) => email,
            None => prompt("Email", ctx.config.last_email.as_deref())?,
        };
        let password = prompt_password()?;

        let identity = ctx.session.login(&LoginRequest::new(email.clone(), password)).await?;

        remember_email(ctx, email);
        if !ctx.session.storage().is_persistent() {
            println!("Note: session storage is in-memory; this sign-in ends with the process.");
        }

        println!("Signed in as {} ({})", identity.username, identity.role);
        Ok(())
    }
}

/// Create an account and sign in with it.
#[derive(Debug, Args)]
pub struct Register {
    #[arg(short, long)]
    username: String,

    #[arg(short, long)]
    email: String,

    /// Requested role; the server decides whether to honour it.
    #[arg(long)]
    role: Option<Role>,
}

impl Register {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        if let Some(notice) = already_signed_in(&ctx.session) {
            println!("{}", notice);
            return Ok(());
        }

        let password = prompt_password()?;
        let request = RegisterRequest {
            username: self.username,
            email: self.email.clone(),
            password,
            role: self.role,
        };

        let identity = ctx.session.register(&request).await?;

        remember_email(ctx, self.email);

        println!("Registered and signed in as {} ({})", identity.username, identity.role);
        Ok(())
    }
}

/// Forget the stored session.
#[derive(Debug, Args)]
pub struct Logout;

impl Logout {
    pub fn execute(self, ctx: &mut Context) -> Result<()> {
        let was_signed_in = ctx.session.is_authenticated();
        ctx.session.logout();
        if was_signed_in {
            println!("Signed out.");
        } else {
            println!("Not signed in.");
        }
        Ok(())
    }
}

/// Show the signed-in identity.
#[derive(Debug, Args)]
pub struct Whoami;

impl Whoami {
    pub fn execute(self, ctx: &mut Context) -> Result<()> {
        match ctx.session.identity() {
            Some(identity) => ctx.output(&identity, render::identity),
            None => {
                println!("{}", ctx.session.state());
                Ok(())
            }
        }
    }
}
