use crate::config::thresholds::*;
use crate::signals::SocialSignal;
use crate::types::{Alert, AlertType, Baseline, CollectionStats, Severity};

/// Run every anomaly rule against one snapshot. Rules are independent; a
/// snapshot may raise none or several alerts. Any comparison whose
/// denominator is zero (or non-finite) is skipped rather than evaluated.
pub fn detect(current: &CollectionStats, baseline: &Baseline) -> Vec<Alert> {
    [
        volume_surge(current),
        sales_spike(current),
        floor_move(current),
        market_cap_shift(current),
        listing_pattern(current, baseline),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// `detect` plus the social rule, when a signal is available.
pub fn detect_with_signal(
    current: &CollectionStats,
    baseline: &Baseline,
    signal: Option<&SocialSignal>,
) -> Vec<Alert> {
    let mut alerts = detect(current, baseline);
    if let Some(alert) = signal.and_then(social_trending) {
        alerts.push(alert);
    }
    alerts
}

/// `numerator / denominator`, or None when the denominator cannot support
/// a comparison.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if !denominator.is_finite() || denominator <= 0.0 || !numerator.is_finite() {
        return None;
    }
    let r = numerator / denominator;
    r.is_finite().then_some(r)
}

fn volume_surge(s: &CollectionStats) -> Option<Alert> {
    let pct = s.one_day_volume_change_pct;
    if !pct.is_finite() || pct <= VOLUME_SURGE_PCT {
        return None;
    }
    Some(Alert {
        alert_type: AlertType::VolumeSurge,
        severity: if pct > VOLUME_SURGE_HIGH_PCT { Severity::High } else { Severity::Medium },
        message: format!("Volume surged {pct:.1}% in 24h"),
        observed_value: pct,
        baseline_value: VOLUME_SURGE_PCT,
    })
}

fn sales_spike(s: &CollectionStats) -> Option<Alert> {
    let daily_avg = s.thirty_day_sales as f64 / 30.0;
    let multiple = ratio(s.one_day_sales as f64, daily_avg)?;
    if multiple <= SALES_SPIKE_MULTIPLE {
        return None;
    }
    Some(Alert {
        alert_type: AlertType::SalesSpike,
        severity: Severity::High,
        message: format!(
            "Sales {multiple:.1}x the 30-day daily average ({} vs {daily_avg:.1})",
            s.one_day_sales
        ),
        observed_value: s.one_day_sales as f64,
        baseline_value: daily_avg,
    })
}

fn floor_move(s: &CollectionStats) -> Option<Alert> {
    let avg = s.one_day_average_price;
    let delta = ratio(s.floor_price - avg, avg)?;
    let magnitude = delta.abs();
    if magnitude <= FLOOR_MOVE_RATIO {
        return None;
    }
    let (alert_type, verb) = if delta > 0.0 {
        (AlertType::FloorPump, "pumped")
    } else {
        (AlertType::FloorDump, "dumped")
    };
    Some(Alert {
        alert_type,
        severity: if magnitude > FLOOR_MOVE_HIGH_RATIO { Severity::High } else { Severity::Medium },
        message: format!(
            "Floor {verb} {:.1}% vs one-day average price ({:.3} vs {avg:.3})",
            magnitude * 100.0,
            s.floor_price
        ),
        observed_value: s.floor_price,
        baseline_value: avg,
    })
}

fn market_cap_shift(s: &CollectionStats) -> Option<Alert> {
    let avg = s.one_day_average_price;
    if !avg.is_finite() || avg <= 0.0 {
        return None;
    }
    let supply = s.total_supply as f64;
    let current_cap = s.floor_price * supply;
    let average_cap = avg * supply;
    let change = current_cap - average_cap;
    if !change.is_finite() || change.abs() <= MARKET_CAP_SHIFT {
        return None;
    }
    let verb = if change > 0.0 { "increased" } else { "decreased" };
    Some(Alert {
        alert_type: AlertType::MarketCapShift,
        severity: if change.abs() > MARKET_CAP_SHIFT_HIGH { Severity::High } else { Severity::Medium },
        message: format!("Market cap {verb} by {:.1} {}", change.abs(), s.floor_price_symbol),
        observed_value: current_cap,
        baseline_value: average_cap,
    })
}

/// Average sale value today vs. the baseline's. A large rise means holders
/// are delisting; a large drop means mass listings are pulling prices down.
fn listing_pattern(s: &CollectionStats, b: &Baseline) -> Option<Alert> {
    let current = ratio(s.one_day_volume, s.one_day_sales as f64)?;
    let historical = ratio(b.avg_volume, b.avg_sales)?;
    let deviation = ratio(current - historical, historical)?;
    if deviation.abs() <= LISTING_PATTERN_RATIO {
        return None;
    }
    let what = if deviation > 0.0 {
        "holders delisting, possible accumulation"
    } else {
        "mass listings, possible sell-off"
    };
    Some(Alert {
        alert_type: AlertType::ListingPattern,
        severity: Severity::Low,
        message: format!(
            "Average sale value {:.1}% {} baseline: {what}",
            deviation.abs() * 100.0,
            if deviation > 0.0 { "above" } else { "below" }
        ),
        observed_value: current,
        baseline_value: historical,
    })
}

fn social_trending(signal: &SocialSignal) -> Option<Alert> {
    if !signal.trending {
        return None;
    }
    Some(Alert {
        alert_type: AlertType::SocialTrending,
        severity: Severity::Medium,
        message: format!(
            "Social mentions up {:.1}% - {} trending",
            signal.mention_increase_pct, signal.platform
        ),
        observed_value: signal.mention_increase_pct,
        baseline_value: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quiet collection: no rule fires against its own baseline.
    fn quiet() -> CollectionStats {
        CollectionStats {
            collection: "azuki".to_string(),
            floor_price: 1.0,
            floor_price_symbol: "ETH".to_string(),
            one_day_volume: 30.0,
            one_day_sales: 30,
            thirty_day_sales: 900,
            one_day_volume_change_pct: 10.0,
            one_day_average_price: 1.0,
            total_supply: 100,
            ..Default::default()
        }
    }

    fn run(s: &CollectionStats) -> Vec<Alert> {
        detect(s, &Baseline::from_stats(s))
    }

    fn types(alerts: &[Alert]) -> Vec<AlertType> {
        alerts.iter().map(|a| a.alert_type).collect()
    }

    #[test]
    fn quiet_collection_raises_nothing() {
        assert!(run(&quiet()).is_empty());
    }

    #[test]
    fn volume_surge_boundary_is_exclusive() {
        let mut s = quiet();
        s.one_day_volume_change_pct = 100.0;
        assert!(!types(&run(&s)).contains(&AlertType::VolumeSurge));

        s.one_day_volume_change_pct = 100.01;
        let alerts = run(&s);
        let surge = alerts.iter().find(|a| a.alert_type == AlertType::VolumeSurge).unwrap();
        assert_eq!(surge.severity, Severity::Medium);
        assert!(surge.message.contains("100.0%"), "{}", surge.message);
    }

    #[test]
    fn no_volume_surge_at_or_below_threshold() {
        let mut s = quiet();
        for pct in [-50.0, 0.0, 42.0, 99.99, 100.0] {
            s.one_day_volume_change_pct = pct;
            assert!(!types(&run(&s)).contains(&AlertType::VolumeSurge), "pct={pct}");
        }
    }

    #[test]
    fn large_volume_surge_is_high() {
        let mut s = quiet();
        s.one_day_volume_change_pct = 300.5;
        let alerts = run(&s);
        assert_eq!(alerts[0].alert_type, AlertType::VolumeSurge);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[0].message.contains("300.5%"));
    }

    #[test]
    fn sales_spike_above_three_times_daily_average() {
        let mut s = quiet();
        // 30-day daily average = 30; spike needs > 90
        s.one_day_sales = 90;
        s.one_day_volume = 90.0;
        assert!(!types(&run(&s)).contains(&AlertType::SalesSpike));

        s.one_day_sales = 91;
        s.one_day_volume = 91.0;
        let alerts = run(&s);
        let spike = alerts.iter().find(|a| a.alert_type == AlertType::SalesSpike).unwrap();
        assert_eq!(spike.severity, Severity::High);
        assert!(spike.message.contains("3.0x"), "{}", spike.message);
        assert!((spike.baseline_value - 30.0).abs() < 1e-9);
    }

    #[test]
    fn sales_spike_skipped_without_thirty_day_history() {
        let mut s = quiet();
        s.thirty_day_sales = 0;
        s.one_day_sales = 50;
        assert!(!types(&run(&s)).contains(&AlertType::SalesSpike));
    }

    #[test]
    fn floor_pump_example() {
        let mut s = quiet();
        s.floor_price = 1.30;
        s.one_day_average_price = 1.00;
        let alerts = run(&s);
        assert_eq!(types(&alerts), vec![AlertType::FloorPump]);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert!(alerts[0].message.contains("30.0%"), "{}", alerts[0].message);
    }

    #[test]
    fn floor_dump_beyond_forty_percent_is_high() {
        let mut s = quiet();
        s.floor_price = 0.5;
        s.one_day_average_price = 1.0;
        s.total_supply = 0;
        let alerts = run(&s);
        assert_eq!(types(&alerts), vec![AlertType::FloorDump]);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[0].message.contains("50.0%"));
    }

    #[test]
    fn zero_average_price_skips_price_rules() {
        let mut s = quiet();
        s.one_day_average_price = 0.0;
        s.floor_price = 5.0;
        s.total_supply = 10_000;
        let alerts = run(&s);
        assert!(alerts.iter().all(|a| a.observed_value.is_finite() && a.baseline_value.is_finite()));
        assert!(!types(&alerts).contains(&AlertType::FloorPump));
        assert!(!types(&alerts).contains(&AlertType::MarketCapShift));
    }

    #[test]
    fn market_cap_shift_severity() {
        let mut s = quiet();
        s.floor_price = 1.1;
        s.one_day_average_price = 1.0;
        s.total_supply = 2_000; // delta 200
        let alerts = run(&s);
        let shift = alerts.iter().find(|a| a.alert_type == AlertType::MarketCapShift).unwrap();
        assert_eq!(shift.severity, Severity::Medium);
        assert!(shift.message.contains("increased by 200.0"), "{}", shift.message);

        s.total_supply = 6_000; // delta 600
        let alerts = run(&s);
        let shift = alerts.iter().find(|a| a.alert_type == AlertType::MarketCapShift).unwrap();
        assert_eq!(shift.severity, Severity::High);
    }

    #[test]
    fn listing_pattern_against_baseline() {
        let s = quiet(); // average sale value 1.0
        let baseline = Baseline { avg_volume: 50.0, avg_sales: 20.0, avg_floor_price: 1.0 }; // 2.5
        let alerts = detect(&s, &baseline);
        assert_eq!(types(&alerts), vec![AlertType::ListingPattern]);
        assert_eq!(alerts[0].severity, Severity::Low);
        assert!(alerts[0].message.contains("60.0% below"), "{}", alerts[0].message);

        let empty = Baseline { avg_volume: 40.0, avg_sales: 0.0, avg_floor_price: 1.0 };
        assert!(detect(&s, &empty).is_empty());
    }

    #[test]
    fn trending_signal_adds_social_alert() {
        let s = quiet();
        let signal = SocialSignal {
            platform: "Twitter".to_string(),
            mention_increase_pct: 120.0,
            trending: true,
        };
        let alerts = detect_with_signal(&s, &Baseline::from_stats(&s), Some(&signal));
        assert_eq!(types(&alerts), vec![AlertType::SocialTrending]);
        assert!(alerts[0].message.contains("120.0%"));

        let quiet_signal = SocialSignal { trending: false, ..signal };
        assert!(detect_with_signal(&s, &Baseline::from_stats(&s), Some(&quiet_signal)).is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let mut s = quiet();
        s.one_day_volume_change_pct = 450.0;
        s.floor_price = 1.6;
        s.total_supply = 10_000;
        let b = Baseline::from_stats(&s);
        assert_eq!(detect(&s, &b), detect(&s, &b));
    }
}
