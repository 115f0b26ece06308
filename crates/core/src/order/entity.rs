use crate::common::time::unix_seconds;
use crate::common::{Symbol, wire_enum};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

wire_enum! {
    /// # Summary
    /// Order type discriminant carried in the `type` field of every order.
    ///
    /// # Invariants
    /// - An unknown discriminant is a decode error.
    pub enum OrderType {
        Market = 0,
        Limit = 1,
        StopMarket = 2,
        StopLimit = 3,
        MarketOnOpen = 4,
        MarketOnClose = 5,
        OptionExercise = 6,
        LimitIfTouched = 7,
        ComboMarket = 8,
        ComboLimit = 9,
        ComboLegLimit = 10,
        TrailingStop = 11,
    }
}

wire_enum! {
    /// # Summary
    /// Order lifecycle status.
    pub enum OrderStatus {
        New = 0,
        Submitted = 1,
        PartiallyFilled = 2,
        Filled = 3,
        Canceled = 5,
        None = 6,
        Invalid = 7,
        CancelPending = 8,
        UpdateSubmitted = 9,
    }
}

wire_enum! {
    /// # Summary
    /// Trade direction of an order or fill.
    pub enum OrderDirection {
        Buy = 0,
        Sell = 1,
        Hold = 2,
    }
}

/// # Summary
/// Order as carried inside result snapshots.
///
/// # Invariants
/// - Fields that are not modelled explicitly are kept verbatim in `extra`, so an order
///   survives a decode/encode cycle field for field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub symbol: Symbol,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<OrderDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// # Summary
/// Fee charged for a fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrderFee {
    pub amount: Decimal,
    pub currency: Option<String>,
}

/// # Summary
/// A single fill or update of an order.
///
/// # Invariants
/// - `order_id`, `symbol`, `time`, `status`, `fill_price`, `fill_quantity` and `direction`
///   are required on the wire.
/// - `id` and `algorithm_id` stay empty until the event is stamped by the algorithm-specific
///   decode rule; afterwards `id` is `"{algorithm_id}-{order_id}-{order_event_id}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub algorithm_id: String,
    pub order_id: i64,
    #[serde(default)]
    pub order_event_id: i64,
    pub symbol: Symbol,
    #[serde(with = "unix_seconds")]
    pub time: DateTime<Utc>,
    pub status: OrderStatus,
    pub fill_price: Decimal,
    #[serde(default)]
    pub fill_price_currency: Option<String>,
    pub fill_quantity: Decimal,
    pub direction: OrderDirection,
    #[serde(default)]
    pub is_assignment: bool,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub order_fee_amount: Decimal,
    #[serde(default)]
    pub order_fee_currency: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub limit_price: Decimal,
    #[serde(default)]
    pub stop_price: Decimal,
}

impl OrderEvent {
    /// # Summary
    /// Binds the event to the algorithm that produced it.
    ///
    /// # Logic
    /// 1. Records the algorithm identifier.
    /// 2. Derives the composite event id from algorithm, order and event sequence.
    pub fn stamp(&mut self, algorithm_id: &str) {
        self.algorithm_id = algorithm_id.to_string();
        self.id = format!("{}-{}-{}", algorithm_id, self.order_id, self.order_event_id);
    }

    pub fn order_fee(&self) -> OrderFee {
        OrderFee {
            amount: self.order_fee_amount,
            currency: self.order_fee_currency.clone(),
        }
    }
}
