use crate::common::{Symbol, wire_enum};
use crate::order::entity::{Order, OrderEvent};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

wire_enum! {
    /// # Summary
    /// Rendering style of a chart series.
    pub enum SeriesType {
        Line = 0,
        Scatter = 1,
        Candle = 2,
        Bar = 3,
        Flag = 4,
        StackedArea = 5,
        Pie = 6,
        Treemap = 7,
    }
}

impl Default for SeriesType {
    fn default() -> Self {
        SeriesType::Line
    }
}

// ---------------------------------------------------------------------------
// Backend (wire) schemas
// ---------------------------------------------------------------------------

/// # Summary
/// A point of a wire series.
///
/// # Invariants
/// - The variant is selected by the explicit `type` tag; an unknown tag fails to decode.
/// - Times are whole unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SeriesPoint {
    Point {
        x: i64,
        y: Option<Decimal>,
    },
    Candlestick {
        time: i64,
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
        close: Option<Decimal>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub series_type: SeriesType,
    #[serde(default)]
    pub values: Vec<SeriesPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scatter_marker_symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    #[serde(default)]
    pub series: HashMap<String, Series>,
}

/// # Summary
/// Position held by a live algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: Symbol,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(default)]
    pub average_price: Decimal,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub market_price: Decimal,
    #[serde(default)]
    pub conversion_rate: Option<Decimal>,
    #[serde(default)]
    pub market_value: Decimal,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
}

/// # Summary
/// One currency entry of the cash ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cash {
    pub symbol: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub conversion_rate: Decimal,
    #[serde(default)]
    pub currency_symbol: String,
    #[serde(default)]
    pub value_in_account_currency: Option<Decimal>,
}

/// Cash ledger keyed by currency symbol.
pub type CashBook = BTreeMap<String, Cash>;

/// # Summary
/// Result snapshot emitted by a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BacktestResult {
    pub charts: HashMap<String, Chart>,
    pub orders: BTreeMap<i64, Order>,
    pub profit_loss: BTreeMap<DateTime<Utc>, Decimal>,
    pub statistics: HashMap<String, String>,
    pub runtime_statistics: HashMap<String, String>,
    pub rolling_window: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_events: Option<Vec<OrderEvent>>,
}

/// # Summary
/// Result snapshot emitted by a live algorithm node.
///
/// # Invariants
/// - Snapshots may be partial: `cash` and `holdings` are frequently empty and are
///   reconciled by the catch-up merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveResult {
    pub charts: HashMap<String, Chart>,
    pub orders: BTreeMap<i64, Order>,
    pub profit_loss: BTreeMap<DateTime<Utc>, Decimal>,
    pub statistics: HashMap<String, String>,
    pub runtime_statistics: HashMap<String, String>,
    pub server_statistics: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_events: Option<Vec<OrderEvent>>,
    pub holdings: HashMap<String, Holding>,
    pub cash: CashBook,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_currency_symbol: Option<String>,
}

// ---------------------------------------------------------------------------
// Unified model
// ---------------------------------------------------------------------------

/// # Summary
/// Which backend a unified result was converted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Backtest,
    Live,
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultKind::Backtest => write!(f, "Backtest"),
            ResultKind::Live => write!(f, "Live"),
        }
    }
}

/// # Summary
/// Chart point in the unified model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstantPoint {
    Value {
        x: DateTime<Utc>,
        y: Decimal,
    },
    Candlestick {
        x: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },
}

impl InstantPoint {
    pub fn x(&self) -> DateTime<Utc> {
        match self {
            InstantPoint::Value { x, .. } | InstantPoint::Candlestick { x, .. } => *x,
        }
    }

    /// Plotted value; a candlestick plots its close.
    pub fn y(&self) -> Decimal {
        match self {
            InstantPoint::Value { y, .. } => *y,
            InstantPoint::Candlestick { close, .. } => *close,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDefinition {
    pub name: String,
    pub unit: String,
    pub index: i32,
    pub series_type: SeriesType,
    pub values: Vec<InstantPoint>,
    pub color: Option<String>,
    pub scatter_marker_symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDefinition {
    pub name: String,
    pub series: HashMap<String, SeriesDefinition>,
}

/// # Summary
/// Backend-independent result every consumer works with.
///
/// # Invariants
/// - `kind` is fixed at construction and has no setter.
/// - Live-only fields (`holdings`, `cash`, `server_statistics`, account currency) are
///   `Some` only for `ResultKind::Live`; `rolling_window` only for `ResultKind::Backtest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmResult {
    kind: ResultKind,
    pub charts: HashMap<String, ChartDefinition>,
    pub orders: BTreeMap<i64, Order>,
    pub profit_loss: BTreeMap<DateTime<Utc>, Decimal>,
    pub statistics: HashMap<String, String>,
    pub runtime_statistics: HashMap<String, String>,
    pub rolling_window: Option<HashMap<String, serde_json::Value>>,
    pub order_events: Option<Vec<OrderEvent>>,
    pub holdings: Option<HashMap<String, Holding>>,
    pub cash: Option<CashBook>,
    pub server_statistics: Option<HashMap<String, String>>,
    pub account_currency: Option<String>,
    pub account_currency_symbol: Option<String>,
}

impl AlgorithmResult {
    /// # Summary
    /// Creates an empty result of the given kind.
    pub fn new(kind: ResultKind) -> Self {
        Self {
            kind,
            charts: HashMap::new(),
            orders: BTreeMap::new(),
            profit_loss: BTreeMap::new(),
            statistics: HashMap::new(),
            runtime_statistics: HashMap::new(),
            rolling_window: None,
            order_events: None,
            holdings: None,
            cash: None,
            server_statistics: None,
            account_currency: None,
            account_currency_symbol: None,
        }
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }
}
