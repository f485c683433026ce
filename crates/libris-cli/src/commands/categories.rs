use anyhow::{bail, Result};
use clap::Subcommand;

use libris_core::models::CategoryInput;

use super::Context;
use crate::render;

/// Browse and manage book categories.
#[derive(Debug, Subcommand)]
pub enum Categories {
    List,
    Show {
        id: String,
    },
    /// Add a category (admin).
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename or redescribe a category (admin).
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Remove a category (admin).
    Delete {
        id: String,
    },
}

fn input(name: String, description: Option<String>) -> Result<CategoryInput> {
    let input = CategoryInput { name, description };
    if let Some(field) = input.missing_field() {
        bail!("{} is required", field);
    }
    Ok(input)
}

impl Categories {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.client.clone();
        ctx.require_login()?;
        match self {
            Categories::List => {
                let categories = ctx.check(client.list_categories().await)?;
                ctx.output(&categories, render::category_list)
            }
            Categories::Show { id } => {
                let category = ctx.check(client.get_category(&id).await)?;
                ctx.output(&category, render::category_detail)
            }
            Categories::Add { name, description } => {
                ctx.require_admin()?;
                let category = ctx.check(client.create_category(&input(name, description)?).await)?;
                println!("Added category \"{}\" ({})", category.name, category.id);
                Ok(())
            }
            Categories::Update {
                id,
                name,
                description,
            } => {
                ctx.require_admin()?;
                let category =
                    ctx.check(client.update_category(&id, &input(name, description)?).await)?;
                println!("Updated category \"{}\"", category.name);
                Ok(())
            }
            Categories::Delete { id } => {
                ctx.require_admin()?;
                ctx.check(client.delete_category(&id).await)?;
                println!("Deleted category {}", id);
                Ok(())
            }
        }
    }
}
