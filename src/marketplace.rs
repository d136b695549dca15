use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::latency::LatencyStats;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{CollectionStats, SaleEvent, TrendingCollection};

/// Read-only view of one upstream marketplace.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    async fn fetch_stats(&self, collection: &str) -> Result<CollectionStats>;

    /// Never fails: upstream errors are logged and yield an empty list.
    async fn fetch_events(
        &self,
        collection: &str,
        event_type: Option<&str>,
        limit: usize,
    ) -> Vec<SaleEvent>;

    /// Collection slugs ordered by one-day volume, highest first.
    async fn fetch_top_collections(&self, limit: usize) -> Result<Vec<String>>;

    /// Collections ordered by one-day change, highest first.
    async fn fetch_trending_collections(&self, limit: usize) -> Result<Vec<TrendingCollection>>;
}

type Throttle = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// OpenSea v2 REST client. Every request waits on a single-slot limiter so
/// sequential calls are spaced by at least the configured request delay.
pub struct OpenSeaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    throttle: Throttle,
    latency: Arc<LatencyStats>,
}

impl OpenSeaClient {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>) -> Result<Self> {
        let api_key = cfg.api_key()?.to_string();
        let quota = Quota::with_period(cfg.request_delay())
            .ok_or_else(|| AppError::Config("request delay must be non-zero".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.opensea_api_url.trim_end_matches('/').to_string(),
            api_key,
            throttle: RateLimiter::direct(quota),
            latency,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)], subject: &str) -> Result<Value> {
        self.throttle.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("X-API-KEY", &self.api_key)
            .query(query)
            .send()
            .await;
        self.latency.record(started.elapsed());
        let resp = resp?;

        let status = resp.status();
        debug!(%url, status = status.as_u16(), "upstream response");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, subject, body));
        }

        Ok(resp.json::<Value>().await?)
    }

    async fn try_fetch_events(
        &self,
        collection: &str,
        event_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SaleEvent>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(kind) = event_type {
            query.push(("event_type", kind.to_string()));
        }
        let resp = self
            .get_json(&format!("/events/collection/{collection}"), &query, collection)
            .await?;
        Ok(parse_events(&resp))
    }
}

#[async_trait]
impl MarketplaceClient for OpenSeaClient {
    async fn fetch_stats(&self, collection: &str) -> Result<CollectionStats> {
        let resp = self
            .get_json(&format!("/collections/{collection}/stats"), &[], collection)
            .await?;
        parse_stats(collection, &resp)
    }

    async fn fetch_events(
        &self,
        collection: &str,
        event_type: Option<&str>,
        limit: usize,
    ) -> Vec<SaleEvent> {
        match self.try_fetch_events(collection, event_type, limit).await {
            Ok(events) => events,
            Err(e) => {
                warn!(collection, "event fetch failed: {e}");
                Vec::new()
            }
        }
    }

    async fn fetch_top_collections(&self, limit: usize) -> Result<Vec<String>> {
        let query = [
            ("limit", limit.to_string()),
            ("order_by", "one_day_volume".to_string()),
        ];
        let resp = self.get_json("/collections", &query, "collections").await?;
        let mut slugs = parse_collection_slugs(&resp);
        slugs.truncate(limit);
        Ok(slugs)
    }

    async fn fetch_trending_collections(&self, limit: usize) -> Result<Vec<TrendingCollection>> {
        let query = [
            ("limit", limit.to_string()),
            ("order_by", "one_day_change".to_string()),
        ];
        let resp = self.get_json("/collections", &query, "collections").await?;
        Ok(parse_trending(&resp))
    }
}

fn classify_status(status: StatusCode, subject: &str, body: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Auth(format!("{subject}: upstream rejected API key ({status})"))
        }
        StatusCode::NOT_FOUND => AppError::NotFound(subject.to_string()),
        _ => AppError::Upstream {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn num(v: Option<&Value>) -> f64 {
    v.and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
        .filter(|x| x.is_finite())
        .unwrap_or(0.0)
}

fn count(v: Option<&Value>) -> u64 {
    let n = num(v);
    if n > 0.0 {
        n as u64
    } else {
        0
    }
}

fn text(v: Option<&Value>) -> Option<String> {
    v.and_then(|x| x.as_str()).map(|s| s.to_string())
}

/// Find a stats interval by name, falling back to its conventional position
/// (one_day, seven_day, thirty_day).
fn interval<'a>(intervals: &'a [Value], name: &str, position: usize) -> Option<&'a Value> {
    intervals
        .iter()
        .find(|i| i.get("interval").and_then(|n| n.as_str()) == Some(name))
        .or_else(|| intervals.get(position))
}

pub fn parse_stats(collection: &str, v: &Value) -> Result<CollectionStats> {
    let total = v.get("total").ok_or_else(|| AppError::Upstream {
        status: 200,
        message: format!("{collection}: stats response has no `total` object"),
    })?;
    let intervals: &[Value] = v
        .get("intervals")
        .and_then(|i| i.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[]);
    let one = interval(intervals, "one_day", 0);
    let seven = interval(intervals, "seven_day", 1);
    let thirty = interval(intervals, "thirty_day", 2);

    Ok(CollectionStats {
        collection: collection.to_string(),
        floor_price: num(total.get("floor_price")),
        floor_price_symbol: text(total.get("floor_price_symbol"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "ETH".to_string()),
        one_day_volume: num(one.and_then(|i| i.get("volume"))),
        seven_day_volume: num(seven.and_then(|i| i.get("volume"))),
        thirty_day_volume: num(thirty.and_then(|i| i.get("volume"))),
        one_day_sales: count(one.and_then(|i| i.get("sales"))),
        seven_day_sales: count(seven.and_then(|i| i.get("sales"))),
        thirty_day_sales: count(thirty.and_then(|i| i.get("sales"))),
        one_day_volume_change_pct: num(one.and_then(|i| i.get("volume_change"))),
        seven_day_volume_change_pct: num(seven.and_then(|i| i.get("volume_change"))),
        thirty_day_volume_change_pct: num(thirty.and_then(|i| i.get("volume_change"))),
        one_day_average_price: num(one.and_then(|i| i.get("average_price"))),
        total_volume: num(total.get("volume")),
        total_sales: count(total.get("sales")),
        total_supply: count(total.get("total_supply")),
        num_owners: count(total.get("num_owners")),
        market_cap: num(total.get("market_cap")),
    })
}

/// Parse `asset_events`. Handles both the current payment shape
/// (`payment.quantity` in base units + `decimals`) and the older
/// `price.value` shape.
pub fn parse_events(v: &Value) -> Vec<SaleEvent> {
    let Some(events) = v.get("asset_events").and_then(|e| e.as_array()) else {
        return Vec::new();
    };

    events
        .iter()
        .map(|e| {
            let (price, currency) = match e.get("payment") {
                Some(p) => {
                    let decimals = p.get("decimals").and_then(|d| d.as_i64()).unwrap_or(18);
                    let quantity = num(p.get("quantity"));
                    (
                        quantity / 10f64.powi(decimals as i32),
                        text(p.get("symbol")).unwrap_or_else(|| "ETH".to_string()),
                    )
                }
                None => (
                    num(e.get("price").and_then(|p| p.get("value"))),
                    text(e.get("price").and_then(|p| p.get("currency")))
                        .unwrap_or_else(|| "ETH".to_string()),
                ),
            };

            let token_id = text(e.get("nft").and_then(|n| n.get("identifier")))
                .or_else(|| text(e.get("token_id")));
            let from_address = text(e.get("seller"))
                .or_else(|| text(e.get("from_account").and_then(|a| a.get("address"))));
            let to_address = text(e.get("buyer"))
                .or_else(|| text(e.get("to_account").and_then(|a| a.get("address"))));
            let transaction_hash = e
                .get("transaction")
                .and_then(|t| t.as_str().map(str::to_string).or_else(|| text(t.get("hash"))));

            SaleEvent {
                event_type: text(e.get("event_type")).unwrap_or_else(|| "unknown".to_string()),
                token_id,
                price,
                currency,
                from_address,
                to_address,
                timestamp: parse_timestamp(e.get("event_timestamp")),
                transaction_hash,
            }
        })
        .collect()
}

fn parse_timestamp(v: Option<&Value>) -> Option<DateTime<Utc>> {
    let v = v?;
    if let Some(secs) = v.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let s = v.as_str()?;
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // OpenSea sometimes omits the offset: "2024-05-01T10:00:00"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}

pub fn parse_collection_slugs(v: &Value) -> Vec<String> {
    v.get("collections")
        .and_then(|c| c.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|c| text(c.get("collection")))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_trending(v: &Value) -> Vec<TrendingCollection> {
    v.get("collections")
        .and_then(|c| c.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    Some(TrendingCollection {
                        collection: text(c.get("collection"))?,
                        name: text(c.get("name")),
                        floor_price: num(c.get("floor_price")),
                        one_day_change_pct: num(c.get("one_day_change")),
                        one_day_volume: num(c.get("one_day_volume")),
                        one_day_sales: count(c.get("one_day_sales")),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
