use anyhow::Result;
use clap::Args;
use serde::Serialize;

use libris_core::models::{Loan, LoanOverview};

use super::Context;
use crate::render;

/// Loan statistics (admin).
#[derive(Debug, Args)]
pub struct Stats {
    /// Also list every overdue loan.
    #[arg(long)]
    overdue: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub active_count: u64,
    pub overview: LoanOverview,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overdue: Vec<Loan>,
}

impl Stats {
    pub async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.client.clone();
        ctx.require_admin()?;

        let fetched = futures::try_join!(
            client.active_loan_count(),
            client.loan_overview(),
            async {
                if self.overdue {
                    client.overdue_loans().await.map(|page| page.into_items())
                } else {
                    Ok(Vec::new())
                }
            }
        );
        let (active_count, overview, overdue) = ctx.check(fetched)?;

        let report = StatsReport {
            active_count,
            overview,
            overdue,
        };
        ctx.output(&report, render::stats)
    }
}
