use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use tracing::debug;

use libris_core::api::LoanFilters;
use libris_core::models::{LoanStatusFilter, NewLoan, DEFAULT_EXTENSION_DAYS};
use libris_core::utils::format_date;

use super::Context;
use crate::render;

/// Borrow, return and extend loans.
#[derive(Debug, Subcommand)]
pub enum Loans {
    /// All loans (admin).
    List(FilterArgs),
    /// Your own loans.
    Mine(FilterArgs),
    Show {
        id: String,
    },
    /// Borrow a book.
    Borrow {
        /// Book id.
        book: String,
        /// Borrow on behalf of another user (admin).
        #[arg(long)]
        user: Option<String>,
        /// Loan length; the server default applies when omitted.
        #[arg(long)]
        days: Option<u32>,
    },
    Return {
        id: String,
    },
    /// Push the due date back.
    Extend {
        id: String,
        #[arg(long, default_value_t = DEFAULT_EXTENSION_DAYS as u32)]
        days: u32,
    },
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// active, returned or all.
    #[arg(long, default_value = "all")]
    status: LoanStatusFilter,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

impl From<FilterArgs> for LoanFilters {
    fn from(args: FilterArgs) -> Self {
        LoanFilters {
            status: Some(args.status),
            page: args.page,
            limit: args.limit,
        }
    }
}

impl Loans {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.client.clone();
        let me = ctx.require_login()?;
        match self {
            Loans::List(args) => {
                ctx.require_admin()?;
                let loans = ctx.check(client.list_loans(&args.into()).await)?;
                ctx.output(&loans, render::loan_list)
            }
            Loans::Mine(args) => {
                let loans = ctx.check(client.user_loans(&me.id, &args.into()).await)?;
                ctx.output(&loans, render::loan_list)
            }
            Loans::Show { id } => {
                let loan = ctx.check(client.get_loan(&id).await)?;
                ctx.output(&loan, render::loan_detail)
            }
            Loans::Borrow { book, user, days } => {
                if user.is_some() {
                    ctx.require_admin()?;
                }
                let request = NewLoan {
                    user_id: user.unwrap_or_else(|| me.id.clone()),
                    book_id: book,
                    loan_days: days,
                };
                if let Some(field) = request.missing_field() {
                    bail!("{} is required", field);
                }
                let loan = ctx.check(client.create_loan(&request).await)?;
                println!("Borrowed, due {}", format_date(&loan.due_date));
                Ok(())
            }
            Loans::Return { id } => {
                let loan = ctx.check(client.return_loan(&id).await)?;
                println!("Returned loan {}", loan.id);
                Ok(())
            }
            Loans::Extend { id, days } => {
                let loan = ctx.check(client.get_loan(&id).await)?;
                let expected = loan.extended_due_date(i64::from(days))?;
                debug!(loan = %loan.id, days, "Requesting extension");

                let extended = ctx.check(client.extend_loan(&id, days).await)?;
                if extended.due_date != expected {
                    debug!(expected = %expected, actual = %extended.due_date, "Server chose a different due date");
                }
                println!(
                    "Extended, now due {} ({} extension(s) left)",
                    format_date(&extended.due_date),
                    extended.extensions_remaining()
                );
                Ok(())
            }
        }
    }
}
