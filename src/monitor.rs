use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::baseline::BaselineProvider;
use crate::config::Config;
use crate::detector::detect_with_signal;
use crate::error::Result;
use crate::marketplace::MarketplaceClient;
use crate::persistence::LogStore;
use crate::scorer::assess;
use crate::signals::SocialSignalProvider;
use crate::state::{apply_cycle, SharedLog};
use crate::types::{MonitoringLog, ScanResult};

/// Scheduling knobs taken from `Config`.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub batch_size: usize,
    /// When non-empty, scanned instead of the top collections by volume.
    pub collections: Vec<String>,
    pub watchlist_expiry_cycles: u32,
}

impl MonitorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval: cfg.interval(),
            batch_size: cfg.batch_size,
            collections: cfg.collections.clone(),
            watchlist_expiry_cycles: cfg.watchlist_expiry_cycles,
        }
    }
}

// ---------------------------------------------------------------------------
// ContinuousMonitor
// ---------------------------------------------------------------------------

/// Idle/Running scheduler around the scan cycle. `start` and `stop` are
/// idempotent; while running, one background task ticks every
/// `settings.interval` and never runs two cycles at once.
pub struct ContinuousMonitor {
    inner: Arc<Scanner>,
    running: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ContinuousMonitor {
    pub fn new(
        settings: MonitorSettings,
        client: Arc<dyn MarketplaceClient>,
        baseline: Arc<dyn BaselineProvider>,
        signals: Arc<dyn SocialSignalProvider>,
        store: LogStore,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            inner: Arc::new(Scanner {
                settings,
                client,
                baseline,
                signals,
                store,
                log: Arc::new(RwLock::new(MonitoringLog::default())),
                health,
            }),
            running: Mutex::new(None),
        }
    }

    /// Handle to the in-memory log, for API readers.
    pub fn log(&self) -> SharedLog {
        Arc::clone(&self.inner.log)
    }

    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.inner.health)
    }

    #[cfg(test)]
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Replace the in-memory log with the persisted one, unless memory holds
    /// newer state that never reached the file.
    pub async fn load(&self) {
        let loaded = self.inner.store.load().await;
        let mut log = self.inner.log.write().await;
        if log.last_update > loaded.last_update {
            warn!(
                path = %self.inner.store.path().display(),
                "Persisted monitoring log is older than in-memory state, keeping memory"
            );
            return;
        }
        info!(
            path = %self.inner.store.path().display(),
            history = loaded.alert_history.len(),
            watchlist = loaded.high_priority_alerts.len(),
            "Monitoring log loaded"
        );
        *log = loaded;
    }

    /// Idle → Running: load the persisted log, run one cycle, then arm the
    /// timer. A no-op when already running.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            info!("Monitor already running, ignoring start");
            return;
        }

        info!(
            interval_secs = self.inner.settings.interval.as_secs(),
            "Starting continuous monitor"
        );
        self.load().await;
        self.inner.health.set_monitor_running(true);

        self.inner.run_cycle().await;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let scanner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { scanner.run(shutdown_rx).await });
        *running = Some(RunningTask { shutdown, handle });
    }

    /// Running → Idle: disarm the timer, wait for an in-flight cycle, flush
    /// the log once. A no-op when idle.
    pub async fn stop(&self) {
        let Some(task) = self.running.lock().await.take() else {
            debug!("Monitor not running, ignoring stop");
            return;
        };

        // Receiver gone means the task already exited.
        let _ = task.shutdown.send(());
        if let Err(e) = task.handle.await {
            error!("Monitor task ended abnormally: {e}");
        }
        self.inner.health.set_monitor_running(false);

        if let Err(e) = self.inner.flush().await {
            error!("Final monitoring log flush failed: {e}");
        }
        info!("Continuous monitor stopped");
    }

    /// One scan cycle outside the schedule. Returns the results that raised
    /// alerts; empty when another cycle is already in progress.
    pub async fn run_cycle(&self) -> Vec<ScanResult> {
        self.inner.run_cycle().await
    }
}

// ---------------------------------------------------------------------------
// Scanner: per-cycle work, shared with the timer task
// ---------------------------------------------------------------------------

struct Scanner {
    settings: MonitorSettings,
    client: Arc<dyn MarketplaceClient>,
    baseline: Arc<dyn BaselineProvider>,
    signals: Arc<dyn SocialSignalProvider>,
    store: LogStore,
    log: SharedLog,
    health: Arc<HealthState>,
}

impl Scanner {
    async fn run(self: Arc<Self>, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // first tick is immediate; start() already ran a cycle

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = &mut shutdown => break,
            }
        }
    }

    /// Never fails: every error is logged here.
    async fn run_cycle(&self) -> Vec<ScanResult> {
        if !self.health.try_begin_cycle() {
            warn!("Previous scan cycle still running, skipping this one");
            return Vec::new();
        }

        let started = std::time::Instant::now();
        let slugs = match self.collections().await {
            Ok(slugs) => slugs,
            Err(e) => {
                error!("Collection discovery failed: {e}");
                Vec::new()
            }
        };

        let mut results = Vec::new();
        let mut assessed = HashSet::new();
        let mut failures = 0u64;
        for slug in &slugs {
            let outcome = self.scan_collection(slug).await;
            if outcome.is_ok() {
                assessed.insert(slug.clone());
            }
            match outcome {
                Ok(result) if !result.alerts.is_empty() => {
                    debug!(
                        collection = %slug,
                        alerts = result.alerts.len(),
                        risk_score = result.risk_score,
                        action = %result.recommendation.action,
                        "Activity detected"
                    );
                    results.push(result);
                }
                Ok(_) => {}
                Err(e) if e.is_upstream() => {
                    failures += 1;
                    warn!(collection = %slug, "Skipping collection this cycle: {e}");
                }
                Err(e) => {
                    failures += 1;
                    error!(collection = %slug, "Unexpected error scanning collection: {e}");
                }
            }
        }

        let now = Utc::now();
        let snapshot = {
            let mut log = self.log.write().await;
            let current = std::mem::take(&mut *log);
            *log = apply_cycle(
                current,
                &results,
                &assessed,
                now,
                self.settings.watchlist_expiry_cycles,
            );
            log.clone()
        };

        let high_priority = snapshot
            .alert_history
            .last()
            .map(|s| s.high_priority_count)
            .unwrap_or(0);
        info!(
            scanned = slugs.len(),
            failed = failures,
            with_alerts = results.len(),
            high_priority,
            watchlist = snapshot.high_priority_alerts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan cycle complete"
        );

        if let Err(e) = self.store.save(&snapshot).await {
            error!("Failed to persist monitoring log, keeping state in memory: {e}");
        }

        self.health.end_cycle(now.timestamp(), failures);
        results
    }

    async fn collections(&self) -> Result<Vec<String>> {
        if !self.settings.collections.is_empty() {
            return Ok(self.settings.collections.clone());
        }
        self.client.fetch_top_collections(self.settings.batch_size).await
    }

    async fn scan_collection(&self, slug: &str) -> Result<ScanResult> {
        let stats = self.client.fetch_stats(slug).await?;
        let baseline = self.baseline.baseline(&stats);
        let signal = self.signals.signal(slug);
        let alerts = detect_with_signal(&stats, &baseline, signal.as_ref());
        self.baseline.record(&stats);
        Ok(assess(stats, alerts, Utc::now()))
    }

    async fn flush(&self) -> Result<()> {
        let snapshot = self.log.read().await.clone();
        self.store.save(&snapshot).await
    }
}
