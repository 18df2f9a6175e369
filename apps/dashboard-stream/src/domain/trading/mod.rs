//! Trading Values
//!
//! Positions and orders as shown on the trading dashboard.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
    /// Side not reported or not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, nothing filled yet.
    New,
    /// Some quantity filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Cancelled before completion.
    #[serde(alias = "canceled")]
    Cancelled,
    /// Rejected by the venue or risk checks.
    Rejected,
    /// Status not reported or not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Open position in one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    /// Instrument symbol.
    pub symbol: String,
    /// Signed quantity; negative for short positions.
    #[serde(alias = "qty")]
    pub quantity: Decimal,
    /// Average entry price.
    #[serde(alias = "avg_entry_price")]
    pub average_price: Decimal,
    /// Latest mark price.
    pub current_price: Decimal,
    /// Quantity times mark price.
    pub market_value: Decimal,
    /// Mark-to-market profit or loss.
    #[serde(alias = "unrealized_pl")]
    pub unrealized_pnl: Decimal,
}

/// Order as reported by the trading service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    /// Order identifier.
    pub order_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order type label, e.g. `limit`.
    #[serde(alias = "type")]
    pub order_type: String,
    /// Requested quantity.
    #[serde(alias = "qty")]
    pub quantity: Decimal,
    /// Quantity filled so far.
    #[serde(alias = "filled_qty")]
    pub filled_quantity: Decimal,
    /// Limit price, for limit orders.
    pub limit_price: Option<Decimal>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Creation time.
    #[serde(deserialize_with = "crate::domain::timestamp::deserialize_optional")]
    pub created_at: Option<DateTime<Utc>>,
}
