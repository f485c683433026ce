use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use libris_core::api::BookFilters;
use libris_core::models::{BookUpdate, NewBook};

use super::Context;
use crate::render;

/// Browse and manage the catalog.
#[derive(Debug, Subcommand)]
pub enum Books {
    /// Search the catalog.
    List(ListArgs),
    /// Show one book.
    Show { id: String },
    /// Add a book (admin).
    Add(BookFields),
    /// Change fields of a book (admin).
    Update {
        id: String,
        #[command(flatten)]
        fields: UpdateFields,
    },
    /// Remove a book (admin).
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct BookFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    /// Category id.
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    copies: Option<u32>,
}

#[derive(Debug, Args)]
pub struct UpdateFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    copies: Option<u32>,
    #[arg(long)]
    available: Option<u32>,
}

impl From<UpdateFields> for BookUpdate {
    fn from(f: UpdateFields) -> Self {
        BookUpdate {
            title: f.title,
            author: f.author,
            isbn: f.isbn,
            genre: f.genre,
            category: f.category,
            description: f.description,
            published_year: f.year,
            total_copies: f.copies,
            available_copies: f.available,
        }
    }
}

impl Books {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.client.clone();
        match self {
            Books::List(args) => {
                ctx.require_login()?;
                let filters = BookFilters {
                    title: args.title,
                    author: args.author,
                    genre: args.genre,
                    page: args.page,
                    limit: args.limit,
                };
                let books = ctx.check(client.list_books(&filters).await)?;
                ctx.output(&books, render::book_list)
            }
            Books::Show { id } => {
                ctx.require_login()?;
                let book = ctx.check(client.get_book(&id).await)?;
                ctx.output(&book, render::book_detail)
            }
            Books::Add(f) => {
                ctx.require_admin()?;
                let book = NewBook {
                    title: f.title,
                    author: f.author,
                    isbn: f.isbn,
                    genre: f.genre,
                    category: f.category,
                    description: f.description,
                    published_year: f.year,
                    total_copies: f.copies,
                };
                if let Some(field) = book.missing_field() {
                    bail!("{} is required", field);
                }
                let created = ctx.check(client.create_book(&book).await)?;
                println!("Added \"{}\" ({})", created.title, created.id);
                Ok(())
            }
            Books::Update { id, fields } => {
                ctx.require_admin()?;
                let updated = ctx.check(client.update_book(&id, &fields.into()).await)?;
                println!("Updated \"{}\"", updated.title);
                Ok(())
            }
            Books::Delete { id } => {
                ctx.require_admin()?;
                ctx.check(client.delete_book(&id).await)?;
                println!("Deleted book {}", id);
                Ok(())
            }
        }
    }
}
