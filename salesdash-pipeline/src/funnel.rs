//! Conversion funnel arithmetic for the funnel visualizer.
//!
//! A funnel is an ordered list of stages. Each stage carries the fraction of
//! the previous stage's volume that reaches it; the first stage's rate applies
//! to the top-of-funnel volume.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One step of the funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    /// Display name, e.g. `"demo booked"`.
    pub name: String,
    /// Fraction in `(0, 1]` of the previous stage that converts into this one.
    pub conversion_rate: Decimal,
}

/// Volume reaching a stage for a given top-of-funnel count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageVolume {
    /// Stage name.
    pub name: String,
    /// Expected count reaching this stage, rounded to two places.
    pub volume: Decimal,
}

/// Ordered conversion funnel.
///
/// Deserializing runs the same checks as [`Funnel::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunnelRepr")]
pub struct Funnel {
    /// Stages from top to bottom.
    pub stages: Vec<FunnelStage>,
}

#[derive(Deserialize)]
struct FunnelRepr {
    stages: Vec<FunnelStage>,
}

impl TryFrom<FunnelRepr> for Funnel {
    type Error = PipelineError;

    fn try_from(repr: FunnelRepr) -> Result<Self, Self::Error> {
        Funnel::new(repr.stages)
    }
}

impl Funnel {
    /// Build a funnel, validating every rate.
    pub fn new(stages: Vec<FunnelStage>) -> Result<Self, PipelineError> {
        let funnel = Self { stages };
        funnel.validate()?;
        Ok(funnel)
    }

    /// Check that the funnel is non-empty and every rate is in `(0, 1]`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::EmptyFunnel);
        }
        for stage in &self.stages {
            if stage.conversion_rate <= Decimal::ZERO || stage.conversion_rate > Decimal::ONE {
                return Err(PipelineError::InvalidRate {
                    field: stage.name.clone(),
                    value: stage.conversion_rate,
                });
            }
        }
        Ok(())
    }

    /// Product of all stage rates: the fraction of leads that make it to the
    /// final stage.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Overflow`] if unvalidated rates push the product out
    /// of range.
    pub fn overall_conversion(&self) -> Result<Decimal, PipelineError> {
        self.stages.iter().try_fold(Decimal::ONE, |acc, s| {
            acc.checked_mul(s.conversion_rate)
                .ok_or(PipelineError::Overflow)
        })
    }

    /// Cascade a top-of-funnel volume through every stage.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Overflow`] if a stage volume does not fit in a `Decimal`.
    pub fn stage_volumes(&self, top: Decimal) -> Result<Vec<StageVolume>, PipelineError> {
        let mut current = top;
        self.stages
            .iter()
            .map(|stage| {
                current = current
                    .checked_mul(stage.conversion_rate)
                    .ok_or(PipelineError::Overflow)?;
                Ok(StageVolume {
                    name: stage.name.clone(),
                    volume: current.round_dp(2),
                })
            })
            .collect()
    }

    /// Leads needed at the top of the funnel to close `target_revenue` at an
    /// average deal size of `avg_deal_size`. Rounded up to whole leads.
    pub fn required_leads(
        &self,
        target_revenue: Decimal,
        avg_deal_size: Decimal,
    ) -> Result<u64, PipelineError> {
        self.validate()?;
        if avg_deal_size <= Decimal::ZERO {
            return Err(PipelineError::NonPositive("avg_deal_size"));
        }
        if target_revenue <= Decimal::ZERO {
            return Ok(0);
        }

        let deals_needed = target_revenue
            .checked_div(avg_deal_size)
            .ok_or(PipelineError::Overflow)?
            .ceil();
        let leads = deals_needed
            .checked_div(self.overall_conversion()?)
            .ok_or(PipelineError::Overflow)?
            .ceil();
        leads.to_u64().ok_or(PipelineError::Overflow)
    }
}
