use chrono::{DateTime, Utc};

use crate::config::HIGH_PRIORITY_SCORE;
use crate::types::{
    Action, Alert, AlertType, CollectionStats, Confidence, Recommendation, ScanResult, Severity,
};

/// Sum of severity weights, clamped to [0, 100].
pub fn score(alerts: &[Alert]) -> u8 {
    let total = alerts
        .iter()
        .fold(0u32, |acc, a| acc.saturating_add(a.severity.weight()));
    total.min(100) as u8
}

/// Map an alert set to an action. Pure: same input, same output.
///
/// Only HIGH and MEDIUM alerts are actionable; a set made entirely of LOW
/// alerts is treated like an empty one.
pub fn recommend(stats: &CollectionStats, alerts: &[Alert]) -> Recommendation {
    let has = |t: AlertType| alerts.iter().any(|a| a.alert_type == t);
    let actionable = alerts.iter().any(|a| a.severity != Severity::Low);
    let high_count = alerts.iter().filter(|a| a.severity == Severity::High).count();

    let (action, confidence, reasoning) = if !actionable {
        (
            Action::Hold,
            Confidence::Low,
            "No significant activity detected".to_string(),
        )
    } else if high_count >= 2 && (has(AlertType::VolumeSurge) || has(AlertType::FloorPump)) {
        (
            Action::Buy,
            Confidence::High,
            format!("{high_count} strong bullish signals with floor at {:.3} {}", stats.floor_price, stats.floor_price_symbol),
        )
    } else if has(AlertType::SalesSpike) && has(AlertType::FloorPump) {
        (
            Action::Buy,
            Confidence::Medium,
            "Organic demand driving both price and sales".to_string(),
        )
    } else if has(AlertType::FloorDump) {
        (
            Action::Wait,
            Confidence::Medium,
            "Floor declining, wait for stabilization".to_string(),
        )
    } else {
        (
            Action::Watch,
            Confidence::Low,
            "Activity detected, monitor for confirmation".to_string(),
        )
    };

    Recommendation { action, confidence, reasoning }
}

/// Watch-list qualification.
pub fn is_high_priority(risk_score: u8, recommendation: &Recommendation) -> bool {
    risk_score >= HIGH_PRIORITY_SCORE || recommendation.action == Action::Buy
}

/// Score and recommend for one collection's alerts.
pub fn assess(stats: CollectionStats, alerts: Vec<Alert>, now: DateTime<Utc>) -> ScanResult {
    let risk_score = score(&alerts);
    let recommendation = recommend(&stats, &alerts);
    ScanResult {
        collection: stats.collection.clone(),
        timestamp: now,
        stats,
        alerts,
        risk_score,
        recommendation,
    }
}
