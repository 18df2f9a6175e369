//! Risk Values
//!
//! Portfolio risk metrics published by the risk service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Portfolio-level risk snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskMetrics {
    /// One-day value at risk at 95% confidence.
    #[serde(alias = "var95")]
    pub var_95: Decimal,
    /// One-day value at risk at 99% confidence.
    #[serde(alias = "var99")]
    pub var_99: Decimal,
    /// Expected loss beyond the 95% VaR.
    #[serde(alias = "cvar")]
    pub expected_shortfall: Decimal,
    /// Annualised Sharpe ratio.
    pub sharpe_ratio: Decimal,
    /// Largest peak-to-trough decline, as a fraction.
    pub max_drawdown: Decimal,
    /// Time the snapshot was computed.
    #[serde(deserialize_with = "crate::domain::timestamp::deserialize_optional")]
    pub timestamp: Option<DateTime<Utc>>,
}
