//! Deals and pipeline stages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position of a deal in the sales pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Unqualified inbound or outbound lead.
    Lead,
    /// Budget and need confirmed.
    Qualified,
    /// Proposal sent.
    Proposal,
    /// Terms under negotiation.
    Negotiation,
    /// Signed.
    ClosedWon,
    /// Lost or abandoned.
    ClosedLost,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::Lead,
        Stage::Qualified,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::ClosedWon,
        Stage::ClosedLost,
    ];

    /// Win probability assumed for a deal in this stage when the deal does
    /// not carry its own estimate.
    #[must_use]
    pub fn default_probability(self) -> Decimal {
        match self {
            Stage::Lead => Decimal::new(10, 2),
            Stage::Qualified => Decimal::new(25, 2),
            Stage::Proposal => Decimal::new(50, 2),
            Stage::Negotiation => Decimal::new(75, 2),
            Stage::ClosedWon => Decimal::ONE,
            Stage::ClosedLost => Decimal::ZERO,
        }
    }

    /// Whether deals in this stage are still being worked.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, Stage::ClosedWon | Stage::ClosedLost)
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Stage::Lead => "lead",
            Stage::Qualified => "qualified",
            Stage::Proposal => "proposal",
            Stage::Negotiation => "negotiation",
            Stage::ClosedWon => "closed won",
            Stage::ClosedLost => "closed lost",
        }
    }
}

/// A single opportunity tracked on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Stable identifier.
    pub id: String,
    /// Account or opportunity name.
    pub name: String,
    /// Owning sales rep.
    pub owner: String,
    /// Current pipeline stage.
    pub stage: Stage,
    /// Contract value.
    pub value: Decimal,
    /// Rep-entered win probability in `[0, 1]`, overriding the stage default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<Decimal>,
}

impl Deal {
    /// Win probability used for weighting, clamped to `[0, 1]`.
    ///
    /// Closed stages always report their fixed probability regardless of any
    /// override.
    #[must_use]
    pub fn effective_probability(&self) -> Decimal {
        if !self.stage.is_open() {
            return self.stage.default_probability();
        }
        self.probability
            .unwrap_or_else(|| self.stage.default_probability())
            .clamp(Decimal::ZERO, Decimal::ONE)
    }

    /// Value weighted by win probability, rounded to cents.
    #[must_use]
    pub fn weighted_value(&self) -> Decimal {
        (self.value * self.effective_probability()).round_dp(2)
    }
}
