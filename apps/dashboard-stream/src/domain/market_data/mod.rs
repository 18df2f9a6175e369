//! Market Data Values
//!
//! Price updates delivered to the dashboard, whether pushed or polled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest price for one asset.
///
/// Missing fields default, so partial updates from older backends still
/// decode as long as `asset` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceUpdate {
    /// Asset symbol, e.g. `BTC`.
    pub asset: String,
    /// Last traded price.
    pub price: Decimal,
    /// Absolute price change over 24 hours.
    #[serde(alias = "change24h")]
    pub change_24h: Decimal,
    /// Traded volume over 24 hours.
    #[serde(alias = "volume24h")]
    pub volume_24h: Decimal,
    /// Server timestamp of the price.
    #[serde(deserialize_with = "crate::domain::timestamp::deserialize_optional")]
    pub timestamp: Option<DateTime<Utc>>,
}
