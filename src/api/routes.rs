use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::ALERT_HISTORY_CAP;
use crate::dashboard;
use crate::persistence::LogStore;
use crate::state::SharedLog;
use crate::types::{MonitoringLog, ScanCycleSummary, WatchListEntry};

/// Where handlers read the monitoring log from.
#[derive(Clone)]
pub enum LogSource {
    /// In-memory log of a running monitor.
    Live(SharedLog),
    /// Persisted file, re-read per request (read-only `serve`).
    File(LogStore),
}

impl LogSource {
    pub async fn snapshot(&self) -> MonitoringLog {
        match self {
            LogSource::Live(log) => log.read().await.clone(),
            LogSource::File(store) => store.load().await,
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub log: LogSource,
    pub latency: Arc<LatencyStats>,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/health", get(get_health))
        .route("/api/log", get(get_log))
        .route("/api/watchlist", get(get_watchlist))
        .route("/api/history", get(get_history))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub monitor_running: bool,
    pub cycle_in_progress: bool,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_cycle_failures: u64,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_dashboard(State(state): State<ApiState>) -> Html<String> {
    let log = state.log.snapshot().await;
    Html(dashboard::render(&log, Utc::now()))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last_update = state.log.snapshot().await.last_update;
    let last_cycle_at = match state.health.last_cycle_at() {
        0 => None,
        secs => DateTime::from_timestamp(secs, 0),
    };
    Json(HealthResponse {
        status: "ok",
        monitor_running: state.health.monitor_running(),
        cycle_in_progress: state.health.cycle_in_progress(),
        cycles_completed: state.health.cycles_completed(),
        last_cycle_at,
        last_cycle_failures: state.health.last_cycle_failures(),
        last_update,
    })
}

async fn get_log(State(state): State<ApiState>) -> Json<MonitoringLog> {
    Json(state.log.snapshot().await)
}

/// Watch list, highest risk score first.
async fn get_watchlist(State(state): State<ApiState>) -> Json<Vec<WatchListEntry>> {
    let mut entries = state.log.snapshot().await.high_priority_alerts;
    entries.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| a.first_seen_at.cmp(&b.first_seen_at))
    });
    Json(entries)
}

/// Most recent cycle summaries, newest first.
async fn get_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<ScanCycleSummary>> {
    let limit = params.limit.unwrap_or(20).min(ALERT_HISTORY_CAP);
    let history = state
        .log
        .snapshot()
        .await
        .alert_history
        .into_iter()
        .rev()
        .take(limit)
        .collect();
    Json(history)
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tokio::sync::RwLock;

    use super::*;
    use crate::types::{Action, Confidence, Recommendation};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_557_600, 0).unwrap()
    }

    fn entry(collection: &str, score: u8) -> WatchListEntry {
        WatchListEntry {
            collection: collection.to_string(),
            first_seen_at: t0(),
            risk_score: score,
            recommendation: Recommendation {
                action: Action::Watch,
                confidence: Confidence::Low,
                reasoning: String::new(),
            },
            last_qualified_at: None,
            cycles_since_qualified: 0,
        }
    }

    fn state() -> ApiState {
        let log = MonitoringLog {
            last_update: Some(t0()),
            alert_history: (0..30)
                .map(|i| ScanCycleSummary {
                    timestamp: t0() + Duration::minutes(i),
                    total_alerts: i as usize,
                    high_priority_count: 0,
                    alerts: Vec::new(),
                })
                .collect(),
            high_priority_alerts: vec![entry("azuki", 60), entry("pudgy", 90)],
        };
        ApiState {
            log: LogSource::Live(Arc::new(RwLock::new(log))),
            latency: Arc::new(LatencyStats::new()),
            health: Arc::new(HealthState::new()),
        }
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let Json(history) = get_history(State(state()), Query(HistoryQuery { limit: Some(3) })).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].total_alerts, 29);
        assert_eq!(history[2].total_alerts, 27);

        let Json(history) = get_history(State(state()), Query(HistoryQuery { limit: None })).await;
        assert_eq!(history.len(), 20);
    }

    #[tokio::test]
    async fn watchlist_sorted_by_score() {
        let Json(entries) = get_watchlist(State(state())).await;
        assert_eq!(entries[0].collection, "pudgy");
        assert_eq!(entries[1].collection, "azuki");
    }

    #[tokio::test]
    async fn health_reports_monitor_state() {
        let state = state();
        state.health.set_monitor_running(true);
        let Json(health) = get_health(State(state)).await;
        assert!(health.monitor_running);
        assert!(health.last_cycle_at.is_none());
        assert_eq!(health.last_update, Some(t0()));
    }

    #[tokio::test]
    async fn latency_reflects_histogram() {
        let state = state();
        state.latency.record_ms(120);
        let Json(latency) = get_stats_latency(State(state)).await;
        assert_eq!(latency.samples, 1);
        assert!(latency.p50_ms.is_some());
    }

    #[tokio::test]
    async fn file_source_reads_persisted_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().join("log.json"));
        let live = state().log.snapshot().await;
        store.save(&live).await.unwrap();

        let file_state = ApiState {
            log: LogSource::File(store),
            ..state()
        };
        let Json(log) = get_log(State(file_state)).await;
        assert_eq!(log, live);
    }

    #[tokio::test]
    async fn dashboard_renders_html() {
        let Html(body) = get_dashboard(State(state())).await;
        assert!(body.contains("pudgy"));
    }
}
