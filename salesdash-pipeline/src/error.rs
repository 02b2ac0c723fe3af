//! Error types for pipeline arithmetic.

use rust_decimal::Decimal;

/// Errors from forecast and funnel calculations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// A rate fell outside its permitted range.
    #[error("invalid rate for {field}: {value}")]
    InvalidRate {
        /// Which input carried the rate.
        field: String,
        /// The offending value.
        value: Decimal,
    },
    /// A value that must be strictly positive was zero or negative.
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
    /// The funnel has no stages to convert through.
    #[error("funnel has no stages")]
    EmptyFunnel,
    /// A projection asked for more months than the calculator allows.
    #[error(
        "projection of {0} months exceeds the limit of {max}",
        max = crate::forecast::MAX_PROJECTION_MONTHS
    )]
    HorizonTooLong(u32),
    /// The result does not fit in the output type.
    #[error("calculation overflowed")]
    Overflow,
}
