#![deny(missing_docs)]
//! Sales pipeline model for salesdash.
//!
//! Pure, stateless arithmetic behind the dashboard's forecasting calculators
//! and funnel visualizer, plus the [`DashboardSnapshot`] that the chat
//! assistant receives as its grounding context.
//!
//! All money and rate values are [`rust_decimal::Decimal`] so that totals are
//! exact to the cent.

pub mod deal;
pub mod error;
pub mod forecast;
pub mod funnel;
pub mod snapshot;

pub use deal::{Deal, Stage};
pub use error::PipelineError;
pub use forecast::{ForecastInput, MonthProjection};
pub use funnel::{Funnel, FunnelStage, StageVolume};
pub use snapshot::DashboardSnapshot;
