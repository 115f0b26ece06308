use std::collections::HashMap;
use vigil_core::common::time::from_unix_seconds;
use vigil_core::result::entity::{
    AlgorithmResult, BacktestResult, Chart, ChartDefinition, InstantPoint, LiveResult, ResultKind,
    Series, SeriesDefinition, SeriesPoint,
};
use vigil_core::result::error::ConvertError;

/// # Summary
/// Converts a backtest snapshot into the unified model.
///
/// # Logic
/// 1. Charts are remapped key by key, series point by point.
/// 2. Every other field is carried over; `rolling_window` is kept, live-only fields stay `None`.
pub fn from_backtest_result(source: BacktestResult) -> Result<AlgorithmResult, ConvertError> {
    let mut result = AlgorithmResult::new(ResultKind::Backtest);
    result.charts = charts_from_wire(source.charts)?;
    result.orders = source.orders;
    result.profit_loss = source.profit_loss;
    result.statistics = source.statistics;
    result.runtime_statistics = source.runtime_statistics;
    result.rolling_window = Some(source.rolling_window);
    result.order_events = source.order_events;
    Ok(result)
}

/// # Summary
/// Converts a live snapshot into the unified model.
pub fn from_live_result(source: LiveResult) -> Result<AlgorithmResult, ConvertError> {
    let mut result = AlgorithmResult::new(ResultKind::Live);
    result.charts = charts_from_wire(source.charts)?;
    result.orders = source.orders;
    result.profit_loss = source.profit_loss;
    result.statistics = source.statistics;
    result.runtime_statistics = source.runtime_statistics;
    result.order_events = source.order_events;
    result.holdings = Some(source.holdings);
    result.cash = Some(source.cash);
    result.server_statistics = Some(source.server_statistics);
    result.account_currency = source.account_currency;
    result.account_currency_symbol = source.account_currency_symbol;
    Ok(result)
}

/// # Summary
/// Maps a unified result back onto the backtest schema.
///
/// # Returns
/// `ConvertError::KindMismatch` when the result did not come from a backtest.
pub fn to_backtest_result(result: &AlgorithmResult) -> Result<BacktestResult, ConvertError> {
    expect_kind(result, ResultKind::Backtest)?;
    Ok(BacktestResult {
        charts: charts_to_wire(&result.charts),
        orders: result.orders.clone(),
        profit_loss: result.profit_loss.clone(),
        statistics: result.statistics.clone(),
        runtime_statistics: result.runtime_statistics.clone(),
        rolling_window: result.rolling_window.clone().unwrap_or_default(),
        order_events: result.order_events.clone(),
    })
}

/// # Summary
/// Maps a unified result back onto the live schema.
///
/// # Returns
/// `ConvertError::KindMismatch` when the result did not come from a live node.
pub fn to_live_result(result: &AlgorithmResult) -> Result<LiveResult, ConvertError> {
    expect_kind(result, ResultKind::Live)?;
    Ok(LiveResult {
        charts: charts_to_wire(&result.charts),
        orders: result.orders.clone(),
        profit_loss: result.profit_loss.clone(),
        statistics: result.statistics.clone(),
        runtime_statistics: result.runtime_statistics.clone(),
        server_statistics: result.server_statistics.clone().unwrap_or_default(),
        order_events: result.order_events.clone(),
        holdings: result.holdings.clone().unwrap_or_default(),
        cash: result.cash.clone().unwrap_or_default(),
        account_currency: result.account_currency.clone(),
        account_currency_symbol: result.account_currency_symbol.clone(),
    })
}

fn expect_kind(result: &AlgorithmResult, expected: ResultKind) -> Result<(), ConvertError> {
    if result.kind() == expected {
        Ok(())
    } else {
        Err(ConvertError::KindMismatch {
            expected,
            actual: result.kind(),
        })
    }
}

fn charts_from_wire(charts: HashMap<String, Chart>) -> Result<HashMap<String, ChartDefinition>, ConvertError> {
    charts
        .into_iter()
        .map(|(key, chart)| {
            let series = chart
                .series
                .into_iter()
                .map(|(key, series)| Ok((key, series_from_wire(series)?)))
                .collect::<Result<HashMap<_, _>, ConvertError>>()?;
            Ok((
                key,
                ChartDefinition {
                    name: chart.name,
                    series,
                },
            ))
        })
        .collect()
}

fn series_from_wire(series: Series) -> Result<SeriesDefinition, ConvertError> {
    let values = series
        .values
        .into_iter()
        .map(|point| point_from_wire(&series.name, point))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SeriesDefinition {
        name: series.name,
        unit: series.unit,
        index: series.index,
        series_type: series.series_type,
        values,
        color: series.color,
        scatter_marker_symbol: series.scatter_marker_symbol,
    })
}

// missing values plot as zero
fn point_from_wire(series: &str, point: SeriesPoint) -> Result<InstantPoint, ConvertError> {
    let timestamp = |seconds: i64| {
        from_unix_seconds(seconds).ok_or_else(|| ConvertError::InvalidTimestamp {
            series: series.to_string(),
            seconds,
        })
    };
    Ok(match point {
        SeriesPoint::Point { x, y } => InstantPoint::Value {
            x: timestamp(x)?,
            y: y.unwrap_or_default(),
        },
        SeriesPoint::Candlestick {
            time,
            open,
            high,
            low,
            close,
        } => InstantPoint::Candlestick {
            x: timestamp(time)?,
            open: open.unwrap_or_default(),
            high: high.unwrap_or_default(),
            low: low.unwrap_or_default(),
            close: close.unwrap_or_default(),
        },
    })
}

fn charts_to_wire(charts: &HashMap<String, ChartDefinition>) -> HashMap<String, Chart> {
    charts
        .iter()
        .map(|(key, chart)| {
            let series = chart
                .series
                .iter()
                .map(|(key, series)| (key.clone(), series_to_wire(series)))
                .collect();
            (
                key.clone(),
                Chart {
                    name: chart.name.clone(),
                    series,
                },
            )
        })
        .collect()
}

fn series_to_wire(series: &SeriesDefinition) -> Series {
    Series {
        name: series.name.clone(),
        unit: series.unit.clone(),
        index: series.index,
        series_type: series.series_type,
        values: series.values.iter().map(point_to_wire).collect(),
        color: series.color.clone(),
        scatter_marker_symbol: series.scatter_marker_symbol.clone(),
    }
}

fn point_to_wire(point: &InstantPoint) -> SeriesPoint {
    match point {
        InstantPoint::Value { x, y } => SeriesPoint::Point {
            x: x.timestamp(),
            y: Some(*y),
        },
        InstantPoint::Candlestick {
            x,
            open,
            high,
            low,
            close,
        } => SeriesPoint::Candlestick {
            time: x.timestamp(),
            open: Some(*open),
            high: Some(*high),
            low: Some(*low),
            close: Some(*close),
        },
    }
}
