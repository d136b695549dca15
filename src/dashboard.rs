//! HTML dashboard over the monitoring log. One template; every page
//! variant (live server, CLI `serve`) renders through `render`.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::types::{Action, MonitoringLog, Severity};

/// Cycles whose alerts are listed in the "recent alerts" panel.
const RECENT_CYCLES: usize = 5;

/// Aggregate figures shown in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub total_scans: usize,
    pub watchlist_size: usize,
    pub avg_alerts_per_scan: f64,
    /// Hours since the oldest retained scan.
    pub running_hours: f64,
}

impl SessionStats {
    pub fn from_log(log: &MonitoringLog, now: DateTime<Utc>) -> Self {
        let total_scans = log.alert_history.len();
        let avg_alerts_per_scan = if total_scans == 0 {
            0.0
        } else {
            log.alert_history.iter().map(|s| s.total_alerts).sum::<usize>() as f64 / total_scans as f64
        };
        let running_hours = log
            .alert_history
            .first()
            .map(|s| (now - s.timestamp).num_seconds().max(0) as f64 / 3600.0)
            .unwrap_or(0.0);
        Self {
            total_scans,
            watchlist_size: log.high_priority_alerts.len(),
            avg_alerts_per_scan,
            running_hours,
        }
    }
}

pub fn render(log: &MonitoringLog, now: DateTime<Utc>) -> String {
    let stats = SessionStats::from_log(log, now);
    let mut html = String::with_capacity(8 * 1024);

    html.push_str(HEAD);
    let _ = write!(
        html,
        r#"<div class="header"><h1>NFT Market Activity Monitor</h1><div class="subtitle">Generated {} &middot; last scan {}</div></div>"#,
        now.format("%Y-%m-%d %H:%M:%S UTC"),
        log.last_update
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string()),
    );

    let _ = write!(
        html,
        r#"<div class="stats"><div class="stat"><span class="value">{}</span><span class="label">Scans</span></div><div class="stat"><span class="value">{}</span><span class="label">Watch list</span></div><div class="stat"><span class="value">{:.1}</span><span class="label">Alerts / scan</span></div><div class="stat"><span class="value">{:.1}h</span><span class="label">Running</span></div></div>"#,
        stats.total_scans, stats.watchlist_size, stats.avg_alerts_per_scan, stats.running_hours,
    );

    html.push_str(r#"<div class="section"><h2>High priority watch list</h2>"#);
    if log.high_priority_alerts.is_empty() {
        html.push_str(r#"<p class="empty">No collections on the watch list</p>"#);
    } else {
        html.push_str("<table><tr><th>Collection</th><th>Score</th><th>Action</th><th>Confidence</th><th>First seen</th><th>Reasoning</th></tr>");
        let mut entries: Vec<_> = log.high_priority_alerts.iter().collect();
        entries.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
        for e in entries {
            let _ = write!(
                html,
                r#"<tr><td>{}</td><td>{}</td><td class="{}">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                escape(&e.collection),
                e.risk_score,
                action_class(e.recommendation.action),
                e.recommendation.action,
                e.recommendation.confidence,
                e.first_seen_at.format("%b %d %H:%M"),
                escape(&e.recommendation.reasoning),
            );
        }
        html.push_str("</table>");
    }
    html.push_str("</div>");

    html.push_str(r#"<div class="section"><h2>Recent alerts</h2>"#);
    let recent: Vec<_> = log
        .alert_history
        .iter()
        .rev()
        .take(RECENT_CYCLES)
        .flat_map(|s| s.alerts.iter())
        .collect();
    if recent.is_empty() {
        html.push_str(r#"<p class="empty">No recent alerts</p>"#);
    } else {
        html.push_str("<ul class=\"alerts\">");
        for a in recent {
            let _ = write!(
                html,
                r#"<li class="{}"><span class="time">{}</span> <b>{}</b> {} &middot; {}</li>"#,
                severity_class(a.alert.severity),
                a.time.format("%b %d %H:%M"),
                escape(&a.collection),
                a.alert.alert_type,
                escape(&a.alert.message),
            );
        }
        html.push_str("</ul>");
    }
    html.push_str("</div>");

    html.push_str(r#"<div class="section"><h2>Scan history</h2>"#);
    if log.alert_history.is_empty() {
        html.push_str(r#"<p class="empty">No scans yet</p>"#);
    } else {
        html.push_str("<table><tr><th>Time</th><th>Collections with alerts</th><th>High priority</th></tr>");
        for s in log.alert_history.iter().rev() {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                s.timestamp.format("%b %d %H:%M"),
                s.total_alerts,
                s.high_priority_count,
            );
        }
        html.push_str("</table>");
    }
    html.push_str("</div></div></body></html>");
    html
}

fn action_class(action: Action) -> &'static str {
    match action {
        Action::Buy => "buy",
        Action::Wait => "wait",
        Action::Watch => "watch",
        Action::Hold => "hold",
    }
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
    }
}

/// Minimal HTML text escaping. Collection slugs and messages come from upstream.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta http-equiv="refresh" content="60">
<title>NFT Market Activity Monitor</title>
<style>
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'SF Mono', Monaco, monospace; background: #0a0b0d; color: #fff; line-height: 1.6; }
.dashboard { max-width: 1200px; margin: 0 auto; }
.header { padding: 30px; border-bottom: 2px solid #00ff88; background: #1a1b1e; }
.header h1 { font-size: 24px; }
.subtitle { color: #888; font-size: 13px; }
.stats { display: flex; gap: 16px; padding: 20px 30px; }
.stat { flex: 1; background: #1a1b1e; padding: 16px; border-radius: 6px; }
.stat .value { display: block; font-size: 22px; color: #00ff88; }
.stat .label { color: #888; font-size: 12px; text-transform: uppercase; }
.section { padding: 20px 30px; }
.section h2 { font-size: 16px; margin-bottom: 12px; color: #00ff88; }
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #2a2b2e; }
th { color: #888; font-weight: normal; }
.buy { color: #00ff88; } .wait { color: #ff4444; } .watch { color: #ffcc00; } .hold { color: #888; }
ul.alerts { list-style: none; font-size: 13px; }
ul.alerts li { padding: 4px 0; border-left: 3px solid #444; padding-left: 8px; margin-bottom: 4px; }
ul.alerts li.high { border-color: #ff4444; } ul.alerts li.medium { border-color: #ffcc00; }
.time { color: #888; }
.empty { color: #666; font-style: italic; }
</style>
</head>
<body>
<div class="dashboard">
"#;
