use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::bar::validate_positive;
use crate::{Symbol, UtcDateTime, ValidationError};

/// Order type accepted by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
        }
    }
}

impl Display for OrderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-built, immutable order intent.
///
/// Construction enforces the quantity/price invariants so the executor never
/// has to re-validate mid-retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub quantity: u32,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: Symbol, quantity: u32) -> Result<Self, ValidationError> {
        Self::new(symbol, quantity, OrderType::Market, None)
    }

    pub fn limit(symbol: Symbol, quantity: u32, limit_price: f64) -> Result<Self, ValidationError> {
        Self::new(symbol, quantity, OrderType::Limit, Some(limit_price))
    }

    pub fn new(
        symbol: Symbol,
        quantity: u32,
        order_type: OrderType,
        limit_price: Option<f64>,
    ) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity);
        }

        match (order_type, limit_price) {
            (OrderType::Limit, None) => return Err(ValidationError::MissingLimitPrice),
            (OrderType::Limit, Some(price)) => validate_positive("limit_price", price)?,
            (OrderType::Market, Some(_)) => return Err(ValidationError::UnexpectedLimitPrice),
            (OrderType::Market, None) => {}
        }

        Ok(Self {
            symbol,
            quantity,
            order_type,
            limit_price,
        })
    }

    /// Price component of the idempotent key: the limit price for limit
    /// orders, the literal `MARKET` otherwise.
    pub fn price_tag(&self) -> String {
        match self.limit_price {
            Some(price) => format!("{price:.2}"),
            None => String::from("MARKET"),
        }
    }
}

/// Deterministic identifier for one logical trade submission.
///
/// The same key is sent to the exchange (which must dedup on it) and used for
/// the caller-side duplicate lookup between retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotentKey(String);

const KEY_VERSION: &str = "v1";

impl IdempotentKey {
    /// Derive the key from the trader, the order, and the submission instant.
    pub fn derive(trader_id: &str, order: &OrderRequest, at: UtcDateTime) -> Self {
        Self(format!(
            "{trader_id}:{symbol}:{quantity}:{price}:{millis}:{KEY_VERSION}",
            symbol = order.symbol,
            quantity = order.quantity,
            price = order.price_tag(),
            millis = at.unix_millis(),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one `execute_order` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub fill_price: Option<f64>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub retry_count: u32,
}

impl ExecutionResult {
    pub fn succeeded(order_id: String, fill_price: Option<f64>, retry_count: u32) -> Self {
        Self {
            success: true,
            order_id: Some(order_id),
            fill_price,
            error: None,
            error_code: None,
            retry_count,
        }
    }

    pub fn failed(
        error: impl Into<String>,
        error_code: impl Into<String>,
        retry_count: u32,
    ) -> Self {
        Self {
            success: false,
            order_id: None,
            fill_price: None,
            error: Some(error.into()),
            error_code: Some(error_code.into()),
            retry_count,
        }
    }
}
