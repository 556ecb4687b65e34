use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::contracts::{ExchangeAdapter, ExchangeError, ExchangeErrorKind, OrderState, OrderStatus};
use crate::http::{HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::{IdempotentKey, OrderRequest, OrderType};

const DEFAULT_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Alpaca brokerage adapter.
///
/// The idempotent key travels as Alpaca's `client_order_id`, which the
/// exchange dedups on, and `GET /v2/orders:by_client_order_id` backs the
/// duplicate lookup between retries.
#[derive(Clone)]
pub struct AlpacaExchangeAdapter {
    http: Arc<dyn HttpClient>,
    api_key: String,
    secret_key: String,
    base_url: String,
    submit_timeout: Duration,
}

impl Default for AlpacaExchangeAdapter {
    fn default() -> Self {
        Self {
            http: Arc::new(NoopHttpClient),
            api_key: std::env::var("TRENDGATE_ALPACA_API_KEY")
                .unwrap_or_else(|_| String::from("demo")),
            secret_key: std::env::var("TRENDGATE_ALPACA_SECRET_KEY")
                .unwrap_or_else(|_| String::from("demo")),
            base_url: String::from(DEFAULT_BASE_URL),
            submit_timeout: Duration::from_secs(5),
        }
    }
}

impl AlpacaExchangeAdapter {
    pub fn with_http_client(
        http: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    fn authed(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_header("APCA-API-KEY-ID", &self.api_key)
            .with_header("APCA-API-SECRET-KEY", &self.secret_key)
            .with_timeout(self.submit_timeout)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError> {
        self.http.execute(request).await.map_err(|error| {
            if error.timed_out() {
                ExchangeError::timeout(format!("alpaca transport: {}", error.message()))
            } else {
                ExchangeError::connection(format!("alpaca transport: {}", error.message()))
            }
        })
    }

    fn order_body(order: &OrderRequest, key: &IdempotentKey) -> String {
        let mut body = serde_json::json!({
            "symbol": order.symbol.as_str(),
            "qty": order.quantity.to_string(),
            "side": "buy",
            "type": order.order_type.as_str(),
            "time_in_force": "day",
            "client_order_id": key.as_str(),
        });
        if order.order_type == OrderType::Limit {
            if let Some(price) = order.limit_price {
                body["limit_price"] = serde_json::json!(format!("{price:.2}"));
            }
        }
        body.to_string()
    }

    fn classify_status(response: &HttpResponse) -> ExchangeError {
        let body = response.body.to_ascii_lowercase();
        let kind = match response.status {
            401 => ExchangeErrorKind::Unauthorized,
            403 => {
                if body.contains("buying power") || body.contains("insufficient") {
                    ExchangeErrorKind::InsufficientFunds
                } else {
                    ExchangeErrorKind::Unauthorized
                }
            }
            422 => {
                if body.contains("client_order_id") {
                    // Duplicate client_order_id: the order already exists, so
                    // route the caller to the idempotent-key lookup.
                    ExchangeErrorKind::Connection
                } else if body.contains("symbol") {
                    ExchangeErrorKind::InvalidSymbol
                } else {
                    ExchangeErrorKind::Rejected
                }
            }
            429 => ExchangeErrorKind::RateLimited,
            500..=599 => ExchangeErrorKind::Connection,
            _ => ExchangeErrorKind::Unknown,
        };

        ExchangeError::new(
            kind,
            format!("alpaca returned status {}", response.status),
        )
    }

    fn parse_order(body: &str, key: &IdempotentKey) -> Result<OrderStatus, ExchangeError> {
        let payload: AlpacaOrderPayload = serde_json::from_str(body)
            .map_err(|e| ExchangeError::unknown(format!("unparseable alpaca order payload: {e}")))?;

        // The offline Noop transport answers with an empty object; keep it
        // deterministic by deriving an id from the key.
        let order_id = if payload.id.is_empty() {
            format!("sim-{}", key.as_str())
        } else {
            payload.id
        };

        let state = match payload.status.as_str() {
            "filled" => OrderState::Filled,
            "partially_filled" => OrderState::PartiallyFilled,
            "canceled" | "expired" | "rejected" => OrderState::Canceled,
            _ => OrderState::Accepted,
        };

        let fill_price = payload
            .filled_avg_price
            .and_then(|price| price.parse::<f64>().ok());

        Ok(OrderStatus {
            order_id,
            state,
            fill_price,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct AlpacaOrderPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    filled_avg_price: Option<String>,
}

#[async_trait]
impl ExchangeAdapter for AlpacaExchangeAdapter {
    async fn submit_order(
        &self,
        order: &OrderRequest,
        key: &IdempotentKey,
    ) -> Result<OrderStatus, ExchangeError> {
        let request = self.authed(HttpRequest::post_json(
            format!("{}/v2/orders", self.base_url),
            Self::order_body(order, key),
        ));

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(Self::classify_status(&response));
        }

        Self::parse_order(&response.body, key)
    }

    async fn get_order_by_idempotent_key(
        &self,
        key: &IdempotentKey,
    ) -> Result<Option<OrderStatus>, ExchangeError> {
        let request = self.authed(HttpRequest::get(format!(
            "{}/v2/orders:by_client_order_id?client_order_id={}",
            self.base_url,
            key.as_str()
        )));

        let response = self.execute(request).await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(Self::classify_status(&response));
        }

        Self::parse_order(&response.body, key).map(Some)
    }
}
