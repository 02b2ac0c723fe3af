//! Revenue forecasting calculators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::{Deal, Stage};
use crate::error::PipelineError;

/// Longest projection [`project`] will compute, in months.
pub const MAX_PROJECTION_MONTHS: u32 = 1200;

fn checked_sum(mut values: impl Iterator<Item = Decimal>) -> Result<Decimal, PipelineError> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or(PipelineError::Overflow)
    })
}

/// Sum of probability-weighted values across open deals.
///
/// # Errors
///
/// [`PipelineError::Overflow`] if the total does not fit in a `Decimal`.
pub fn weighted_pipeline(deals: &[Deal]) -> Result<Decimal, PipelineError> {
    checked_sum(
        deals
            .iter()
            .filter(|d| d.stage.is_open())
            .map(Deal::weighted_value),
    )
}

/// Total value of open deals, unweighted.
///
/// # Errors
///
/// [`PipelineError::Overflow`] if the total does not fit in a `Decimal`.
pub fn open_pipeline(deals: &[Deal]) -> Result<Decimal, PipelineError> {
    checked_sum(deals.iter().filter(|d| d.stage.is_open()).map(|d| d.value))
}

/// Total value of deals marked won.
///
/// # Errors
///
/// [`PipelineError::Overflow`] if the total does not fit in a `Decimal`.
pub fn closed_won(deals: &[Deal]) -> Result<Decimal, PipelineError> {
    checked_sum(
        deals
            .iter()
            .filter(|d| d.stage == Stage::ClosedWon)
            .map(|d| d.value),
    )
}

/// Share of closed deals that were won, as a fraction in `[0, 1]`.
///
/// Returns `None` when nothing has closed yet.
#[must_use]
pub fn win_rate(deals: &[Deal]) -> Option<Decimal> {
    let won = deals.iter().filter(|d| d.stage == Stage::ClosedWon).count();
    let lost = deals.iter().filter(|d| d.stage == Stage::ClosedLost).count();
    let closed = won + lost;
    if closed == 0 {
        return None;
    }
    Some((Decimal::from(won) / Decimal::from(closed)).round_dp(4))
}

/// Percentage of quota achieved, rounded to one decimal place.
pub fn quota_attainment(achieved: Decimal, quota: Decimal) -> Result<Decimal, PipelineError> {
    if quota <= Decimal::ZERO {
        return Err(PipelineError::NonPositive("quota"));
    }
    let ratio = achieved
        .checked_div(quota)
        .ok_or(PipelineError::Overflow)?;
    let percent = ratio
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(PipelineError::Overflow)?;
    Ok(percent.round_dp(1))
}

/// Inputs to the compound-growth revenue calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    /// Revenue for the month preceding the projection.
    pub baseline: Decimal,
    /// Month-over-month growth as a fraction; may be negative but not below -1.
    pub monthly_growth_rate: Decimal,
    /// Number of months to project, at most [`MAX_PROJECTION_MONTHS`].
    pub months: u32,
}

/// One month of projected revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthProjection {
    /// 1-based month offset from the baseline.
    pub month: u32,
    /// Projected revenue for that month.
    pub revenue: Decimal,
    /// Running total from month 1 through this month.
    pub cumulative: Decimal,
}

/// Project revenue forward with compound monthly growth.
///
/// Each month's figure is `baseline * (1 + rate)^month`, rounded to cents.
/// The unrounded value is carried between months so rounding does not drift.
pub fn project(input: &ForecastInput) -> Result<Vec<MonthProjection>, PipelineError> {
    if input.baseline < Decimal::ZERO {
        return Err(PipelineError::NonPositive("baseline"));
    }
    if input.monthly_growth_rate < Decimal::NEGATIVE_ONE {
        return Err(PipelineError::InvalidRate {
            field: "monthly_growth_rate".into(),
            value: input.monthly_growth_rate,
        });
    }
    if input.months > MAX_PROJECTION_MONTHS {
        return Err(PipelineError::HorizonTooLong(input.months));
    }

    let factor = Decimal::ONE + input.monthly_growth_rate;
    let mut current = input.baseline;
    let mut cumulative = Decimal::ZERO;
    let mut out = Vec::with_capacity(input.months as usize);

    for month in 1..=input.months {
        current = current.checked_mul(factor).ok_or(PipelineError::Overflow)?;
        let revenue = current.round_dp(2);
        cumulative = cumulative
            .checked_add(revenue)
            .ok_or(PipelineError::Overflow)?;
        out.push(MonthProjection {
            month,
            revenue,
            cumulative,
        });
    }

    Ok(out)
}
