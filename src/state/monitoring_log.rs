use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::ALERT_HISTORY_CAP;
use crate::scorer::is_high_priority;
use crate::types::{LoggedAlert, MonitoringLog, ScanCycleSummary, ScanResult, WatchListEntry};

/// In-memory log shared between the monitor (sole writer) and API readers.
pub type SharedLog = Arc<RwLock<MonitoringLog>>;

/// Fold one scan cycle into the log.
///
/// - every high-priority result is upserted into the watch list: `first_seen_at`
///   is kept, score and recommendation are replaced;
/// - entries whose collection was assessed this cycle but did not requalify
///   age by one cycle and are dropped after `expiry_cycles` (0 keeps them
///   forever); collections with no data this cycle do not age;
/// - one summary is appended to the history, oldest evicted beyond the cap;
/// - `last_update` becomes `now`.
pub fn apply_cycle(
    mut log: MonitoringLog,
    results: &[ScanResult],
    assessed: &HashSet<String>,
    now: DateTime<Utc>,
    expiry_cycles: u32,
) -> MonitoringLog {
    let qualified: Vec<&ScanResult> = results
        .iter()
        .filter(|r| is_high_priority(r.risk_score, &r.recommendation))
        .collect();

    for entry in &mut log.high_priority_alerts {
        if assessed.contains(&entry.collection)
            && !qualified.iter().any(|r| r.collection == entry.collection)
        {
            entry.cycles_since_qualified = entry.cycles_since_qualified.saturating_add(1);
        }
    }
    if expiry_cycles > 0 {
        log.high_priority_alerts
            .retain(|e| e.cycles_since_qualified < expiry_cycles);
    }

    for result in &qualified {
        match log
            .high_priority_alerts
            .iter_mut()
            .find(|e| e.collection == result.collection)
        {
            Some(entry) => {
                entry.risk_score = result.risk_score;
                entry.recommendation = result.recommendation.clone();
                entry.last_qualified_at = Some(now);
                entry.cycles_since_qualified = 0;
            }
            None => log.high_priority_alerts.push(WatchListEntry {
                collection: result.collection.clone(),
                first_seen_at: now,
                risk_score: result.risk_score,
                recommendation: result.recommendation.clone(),
                last_qualified_at: Some(now),
                cycles_since_qualified: 0,
            }),
        }
    }

    let alerts: Vec<LoggedAlert> = results
        .iter()
        .flat_map(|r| {
            r.alerts.iter().map(move |a| LoggedAlert {
                time: r.timestamp,
                collection: r.collection.clone(),
                alert: a.clone(),
            })
        })
        .collect();

    log.alert_history.push(ScanCycleSummary {
        timestamp: now,
        total_alerts: results.iter().filter(|r| !r.alerts.is_empty()).count(),
        high_priority_count: qualified.len(),
        alerts,
    });
    if log.alert_history.len() > ALERT_HISTORY_CAP {
        let excess = log.alert_history.len() - ALERT_HISTORY_CAP;
        log.alert_history.drain(..excess);
    }

    log.last_update = Some(now);
    log
}
