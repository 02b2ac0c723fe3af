//! Point-in-time dashboard snapshot and its plain-text rendering.
//!
//! The chat assistant does not query the data store. It receives the
//! dashboard's current view, rendered by [`DashboardSnapshot::render`], as part
//! of its system instruction.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::Deal;
use crate::error::PipelineError;
use crate::forecast;
use crate::funnel::Funnel;

/// Everything the dashboard currently shows for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Tenant (organization) display name.
    pub tenant: String,
    /// ISO 4217 currency code for every money value.
    pub currency: String,
    /// Deals visible to the current user.
    #[serde(default)]
    pub deals: Vec<Deal>,
    /// Configured conversion funnel, if the tenant has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel: Option<Funnel>,
}

impl DashboardSnapshot {
    /// Render the snapshot as a compact, line-oriented text block.
    ///
    /// Output is deterministic for a given snapshot: deals keep their input
    /// order and numbers are printed without trailing zeros. A total that
    /// overflows prints as `n/a`, and a funnel with out-of-range rates is
    /// reported as unavailable instead of listed.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let cur = &self.currency;

        // Writing into a String cannot fail.
        let _ = writeln!(out, "Tenant: {}", self.tenant);
        let _ = writeln!(
            out,
            "Open pipeline: {} {cur} (weighted {} {cur})",
            fmt_total(forecast::open_pipeline(&self.deals)),
            fmt_total(forecast::weighted_pipeline(&self.deals)),
        );
        let _ = writeln!(
            out,
            "Closed won: {} {cur}",
            fmt_total(forecast::closed_won(&self.deals))
        );
        match forecast::win_rate(&self.deals) {
            Some(rate) => {
                let _ = writeln!(out, "Win rate: {}", fmt_percent(rate));
            }
            None => {
                let _ = writeln!(out, "Win rate: n/a");
            }
        }

        if let Some(funnel) = &self.funnel
            && !funnel.stages.is_empty()
        {
            match funnel.validate().and_then(|()| funnel.overall_conversion()) {
                Ok(overall) => {
                    let steps: Vec<String> = funnel
                        .stages
                        .iter()
                        .map(|s| format!("{} {}", s.name, fmt_percent(s.conversion_rate)))
                        .collect();
                    let _ = writeln!(
                        out,
                        "Funnel: {} (overall {})",
                        steps.join(" -> "),
                        fmt_percent(overall)
                    );
                }
                Err(e) => {
                    let _ = writeln!(out, "Funnel: unavailable ({e})");
                }
            }
        }

        if self.deals.is_empty() {
            let _ = writeln!(out, "Deals: none");
        } else {
            let _ = writeln!(out, "Deals ({}):", self.deals.len());
            for deal in &self.deals {
                let _ = writeln!(
                    out,
                    "- [{}] {} | owner {} | stage {} | value {} {cur} | weighted {} {cur}",
                    deal.id,
                    deal.name,
                    deal.owner,
                    deal.stage.label(),
                    fmt_amount(deal.value),
                    fmt_amount(deal.weighted_value()),
                );
            }
        }

        out
    }
}

fn fmt_total(total: Result<Decimal, PipelineError>) -> String {
    match total {
        Ok(value) => fmt_amount(value),
        Err(_) => "n/a".to_string(),
    }
}

fn fmt_amount(value: Decimal) -> String {
    value.round_dp(2).normalize().to_string()
}

fn fmt_percent(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).round_dp(2).normalize())
}
