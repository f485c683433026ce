use anyhow::{bail, Context as _, Result};
use clap::Subcommand;

use libris_core::models::{NewUser, Role, UserUpdate};

use super::Context;
use crate::render;

/// Manage accounts (admin).
#[derive(Debug, Subcommand)]
pub enum Users {
    List,
    Show {
        id: String,
    },
    /// Create an account; the password is prompted for.
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    Update {
        id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        /// Prompt for a new password.
        #[arg(long)]
        password: bool,
    },
    Delete {
        id: String,
    },
}

fn read_password(label: &str) -> Result<String> {
    rpassword::prompt_password(label).context("Failed to read password")
}

impl Users {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.client.clone();
        let me = ctx.require_admin()?;
        match self {
            Users::List => {
                let users = ctx.check(client.list_users().await)?;
                ctx.output(&users, render::user_list)
            }
            Users::Show { id } => {
                let user = ctx.check(client.get_user(&id).await)?;
                ctx.output(&user, render::user_detail)
            }
            Users::Add {
                username,
                email,
                role,
            } => {
                let user = NewUser {
                    username,
                    email,
                    password: read_password("Password for new account: ")?,
                    role,
                };
                if let Some(field) = user.missing_field() {
                    bail!("{} is required", field);
                }
                let created = ctx.check(client.create_user(&user).await)?;
                println!("Created {} ({}, {})", created.username, created.role, created.id);
                Ok(())
            }
            Users::Update {
                id,
                username,
                email,
                role,
                password,
            } => {
                let update = UserUpdate {
                    username,
                    email,
                    role,
                    password: if password {
                        Some(read_password("New password: ")?)
                    } else {
                        None
                    },
                };
                let updated = ctx.check(client.update_user(&id, &update).await)?;
                println!("Updated {}", updated.username);
                Ok(())
            }
            Users::Delete { id } => {
                if id == me.id {
                    bail!("Refusing to delete the account you are signed in with.");
                }
                ctx.check(client.delete_user(&id).await)?;
                println!("Deleted user {}", id);
                Ok(())
            }
        }
    }
}
