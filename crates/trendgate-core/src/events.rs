//! Order lifecycle events published for audit.
//!
//! Every `execute_order` call publishes a `started` event and exactly one
//! terminal `executed` / `execution_failed` event, plus a `recovered` event
//! when success followed at least one retry. Publishing is fire-and-forget;
//! a dead event bus never fails an order.

use serde::{Deserialize, Serialize};

use crate::{IdempotentKey, UtcDateTime};

/// Channel all order lifecycle events are published on.
pub const ORDER_EVENTS_CHANNEL: &str = "orders.events";

/// Lifecycle stage tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventType {
    #[serde(rename = "order.execution_started")]
    ExecutionStarted,
    #[serde(rename = "order.recovered")]
    Recovered,
    #[serde(rename = "order.executed")]
    Executed,
    #[serde(rename = "order.execution_failed")]
    ExecutionFailed,
}

impl OrderEventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExecutionStarted => "order.execution_started",
            Self::Recovered => "order.recovered",
            Self::Executed => "order.executed",
            Self::ExecutionFailed => "order.execution_failed",
        }
    }
}

/// One order lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event: OrderEventType,
    pub idempotent_key: IdempotentKey,
    pub trader_id: String,
    pub at: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl OrderEvent {
    fn base(event: OrderEventType, key: &IdempotentKey, trader_id: &str) -> Self {
        Self {
            event,
            idempotent_key: key.clone(),
            trader_id: trader_id.to_owned(),
            at: UtcDateTime::now(),
            attempt: None,
            order_id: None,
            error: None,
            error_code: None,
        }
    }

    pub fn started(key: &IdempotentKey, trader_id: &str) -> Self {
        Self::base(OrderEventType::ExecutionStarted, key, trader_id)
    }

    pub fn recovered(key: &IdempotentKey, trader_id: &str, attempt: u32) -> Self {
        Self {
            attempt: Some(attempt),
            ..Self::base(OrderEventType::Recovered, key, trader_id)
        }
    }

    pub fn executed(key: &IdempotentKey, trader_id: &str, order_id: &str) -> Self {
        Self {
            order_id: Some(order_id.to_owned()),
            ..Self::base(OrderEventType::Executed, key, trader_id)
        }
    }

    pub fn failed(
        key: &IdempotentKey,
        trader_id: &str,
        error: &str,
        error_code: &str,
    ) -> Self {
        Self {
            error: Some(error.to_owned()),
            error_code: Some(error_code.to_owned()),
            ..Self::base(OrderEventType::ExecutionFailed, key, trader_id)
        }
    }

    /// Wire payload for the event bus.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("order event serializes to JSON")
    }
}
