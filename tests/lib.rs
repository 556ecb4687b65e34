// Shared scripted collaborators for the behavioral test suites.
//
// Each fixture implements one of the core contracts with fully deterministic
// behavior driven by a script the test sets up front, plus counters the test
// can assert against afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::Date;

pub use std::sync::Arc;

use trendgate_core::{
    Bar, EventPublisher, ExchangeAdapter, ExchangeError, IdempotentKey, IndicatorError,
    IndicatorService, MarketDataError, MarketDataSource, OrderRequest, OrderState, OrderStatus,
    Phase, PublishError, SessionMetrics, Symbol, Timeframe, UtcDateTime,
};

/// One scripted response to a `submit_order` call.
#[derive(Debug, Clone)]
pub enum SubmitStep {
    /// Register the order and acknowledge it.
    Accept,
    /// Register the order but lose the acknowledgment: the caller sees a
    /// timeout while the exchange holds a live order under the key.
    AcceptLostAck,
    /// Fail without registering anything.
    Fail(ExchangeError),
}

/// Deterministic in-memory exchange.
///
/// Consumes one [`SubmitStep`] per submission; an exhausted script accepts.
/// Registered orders are deduplicated by idempotent key, so the number of
/// live orders after a run is the real exactly-once measure.
pub struct ScriptedExchange {
    script: Mutex<VecDeque<SubmitStep>>,
    orders: Mutex<HashMap<String, OrderStatus>>,
    next_id: AtomicU32,
    pub submit_calls: AtomicU32,
    pub lookup_calls: AtomicU32,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self::with_script([])
    }

    pub fn with_script(steps: impl IntoIterator<Item = SubmitStep>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            orders: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            submit_calls: AtomicU32::new(0),
            lookup_calls: AtomicU32::new(0),
        }
    }

    /// Orders the exchange actually holds, regardless of what callers saw.
    pub fn live_orders(&self) -> usize {
        self.orders.lock().expect("orders lock").len()
    }

    fn register(&self, key: &IdempotentKey) -> OrderStatus {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let status = OrderStatus {
            order_id: format!("ord-{id}"),
            state: OrderState::Filled,
            fill_price: Some(187.50),
        };
        self.orders
            .lock()
            .expect("orders lock")
            .insert(key.as_str().to_owned(), status.clone());
        status
    }
}

impl Default for ScriptedExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeAdapter for ScriptedExchange {
    async fn submit_order(
        &self,
        _order: &OrderRequest,
        key: &IdempotentKey,
    ) -> Result<OrderStatus, ExchangeError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(existing) = self.orders.lock().expect("orders lock").get(key.as_str()) {
            return Ok(existing.clone());
        }

        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(SubmitStep::Accept);

        match step {
            SubmitStep::Accept => Ok(self.register(key)),
            SubmitStep::AcceptLostAck => {
                self.register(key);
                Err(ExchangeError::timeout("acknowledgment lost in transit"))
            }
            SubmitStep::Fail(error) => Err(error),
        }
    }

    async fn get_order_by_idempotent_key(
        &self,
        key: &IdempotentKey,
    ) -> Result<Option<OrderStatus>, ExchangeError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .orders
            .lock()
            .expect("orders lock")
            .get(key.as_str())
            .cloned())
    }
}

/// Market data source serving canned bar series per timeframe, with an
/// optional number of leading failures before the data appears.
pub struct ScriptedMarketData {
    bars: Mutex<HashMap<Timeframe, Vec<Bar>>>,
    failures_remaining: Mutex<HashMap<Timeframe, u32>>,
    pub fetch_calls: AtomicU32,
}

impl ScriptedMarketData {
    pub fn new() -> Self {
        Self {
            bars: Mutex::new(HashMap::new()),
            failures_remaining: Mutex::new(HashMap::new()),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub fn with_bars(self, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.bars.lock().expect("bars lock").insert(timeframe, bars);
        self
    }

    /// Fail the first `count` fetches for the timeframe, then serve bars.
    pub fn failing_first(self, timeframe: Timeframe, count: u32) -> Self {
        self.failures_remaining
            .lock()
            .expect("failures lock")
            .insert(timeframe, count);
        self
    }
}

impl Default for ScriptedMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarketData {
    async fn fetch_bars(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        _min_bars: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let mut failures = self.failures_remaining.lock().expect("failures lock");
        if let Some(remaining) = failures.get_mut(&timeframe) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MarketDataError::Unavailable {
                    symbol: symbol.clone(),
                    timeframe,
                    reason: String::from("scripted outage"),
                });
            }
        }
        drop(failures);

        self.bars
            .lock()
            .expect("bars lock")
            .get(&timeframe)
            .cloned()
            .ok_or_else(|| MarketDataError::Unavailable {
                symbol: symbol.clone(),
                timeframe,
                reason: String::from("no series configured"),
            })
    }
}

/// Indicator service returning fixed values, for scenarios pinned to exact
/// EMA/MACD readings.
pub struct FixedIndicators {
    pub ema_20: f64,
    pub macd_line: f64,
}

impl IndicatorService for FixedIndicators {
    fn ema(&self, _bars: &[Bar], _period: usize) -> Result<f64, IndicatorError> {
        Ok(self.ema_20)
    }

    fn macd(&self, _bars: &[Bar]) -> Result<f64, IndicatorError> {
        Ok(self.macd_line)
    }
}

/// Indicator service derived from the series itself: EMA as the mean close,
/// MACD as last minus first close. Lets a test steer the signal per
/// timeframe purely through the bar data it scripts.
pub struct SeriesIndicators;

impl IndicatorService for SeriesIndicators {
    fn ema(&self, bars: &[Bar], period: usize) -> Result<f64, IndicatorError> {
        if bars.is_empty() {
            return Err(IndicatorError::InsufficientBars {
                indicator: "ema",
                required: period,
                available: 0,
            });
        }
        let sum: f64 = bars.iter().map(|bar| bar.close).sum();
        Ok(sum / bars.len() as f64)
    }

    fn macd(&self, bars: &[Bar]) -> Result<f64, IndicatorError> {
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(last.close - first.close),
            _ => Err(IndicatorError::InsufficientBars {
                indicator: "macd",
                required: 2,
                available: bars.len(),
            }),
        }
    }
}

/// Event publisher that records everything it is handed; optionally fails
/// every publish to prove callers tolerate a dead bus.
pub struct RecordingPublisher {
    pub events: Mutex<Vec<(String, serde_json::Value)>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// The `event` tags of everything published, in order.
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("events lock")
            .iter()
            .map(|(_, payload)| {
                payload["event"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned()
            })
            .collect()
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .expect("events lock")
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        channel: &str,
        payload: serde_json::Value,
    ) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("events lock")
            .push((channel.to_owned(), payload));

        if self.fail {
            return Err(PublishError {
                channel: channel.to_owned(),
                reason: String::from("bus offline"),
            });
        }
        Ok(())
    }
}

/// Flat bar series: every bar closes at `close`.
pub fn make_bars(count: usize, close: f64) -> Vec<Bar> {
    make_trend_bars(count, close, 0.0)
}

/// Linear bar series: bar `i` closes at `start + step * i`.
pub fn make_trend_bars(count: usize, start: f64, step: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = start + step * i as f64;
            Bar::new(UtcDateTime::now(), close, close, close, close, Some(1_000))
                .expect("test bar")
        })
        .collect()
}

/// A decided trading session with the given record.
pub fn make_session(date: Date, phase: Phase, wins: u32, losses: u32, rr: f64) -> SessionMetrics {
    SessionMetrics::new(
        date,
        phase,
        wins + losses,
        wins,
        losses,
        rr,
        0.0,
        vec![100.0; (wins + losses) as usize],
        0,
    )
    .expect("test session")
}
