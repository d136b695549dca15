use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::whales::*;
use crate::marketplace::MarketplaceClient;
use crate::types::{Alert, AlertType, SaleEvent, Severity, Whale, WhalePattern, WhalePurchase, WhaleReport};

/// Fetch recent sales and report on large buyers. Read-only; never fails
/// (an upstream error yields an empty event list and a NO_WHALES report).
pub async fn scan_whales(
    client: &dyn MarketplaceClient,
    collection: &str,
    min_value: f64,
) -> WhaleReport {
    let events = client.fetch_events(collection, Some("sale"), EVENT_LIMIT).await;
    analyze(collection, &events, min_value, Utc::now())
}

/// Cluster sales at or above `min_value` by buyer and classify the result.
pub fn analyze(
    collection: &str,
    events: &[SaleEvent],
    min_value: f64,
    now: DateTime<Utc>,
) -> WhaleReport {
    let large: Vec<&SaleEvent> = events
        .iter()
        .filter(|e| e.price.is_finite() && e.price >= min_value)
        .collect();

    let mut by_buyer: HashMap<&str, Whale> = HashMap::new();
    for tx in &large {
        let Some(buyer) = tx.to_address.as_deref() else { continue };
        let whale = by_buyer.entry(buyer).or_insert_with(|| Whale {
            address: buyer.to_string(),
            purchases: Vec::new(),
            total_spent: 0.0,
        });
        whale.purchases.push(WhalePurchase {
            token_id: tx.token_id.clone(),
            price: tx.price,
            timestamp: tx.timestamp,
        });
        whale.total_spent += tx.price;
    }

    let mut whales: Vec<Whale> = by_buyer
        .into_values()
        .filter(|w| w.purchases.len() >= MIN_PURCHASES || w.total_spent >= MIN_TOTAL_SPENT)
        .collect();
    whales.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| a.address.cmp(&b.address))
    });

    let pattern = classify(&whales, &large, now);
    let total_whale_volume = whales.iter().map(|w| w.total_spent).sum();
    let whale_count = whales.len();
    whales.truncate(TOP_WHALES);

    WhaleReport {
        collection: collection.to_string(),
        whale_count,
        total_whale_volume,
        top_whales: whales,
        whale_transactions: large.len(),
        pattern,
    }
}

/// `whales` must be sorted by spend, largest first.
pub fn classify(whales: &[Whale], transactions: &[&SaleEvent], now: DateTime<Utc>) -> WhalePattern {
    if whales.is_empty() {
        return WhalePattern::NoWhales;
    }

    let hour_ago = now - Duration::hours(1);
    let recent = transactions
        .iter()
        .filter(|tx| tx.timestamp.is_some_and(|t| t > hour_ago))
        .count();
    if recent > ACCUMULATION_TX_COUNT {
        return WhalePattern::WhaleAccumulation;
    }

    if whales.len() > MAJOR_INTEREST_WHALES && whales[0].total_spent > MAJOR_INTEREST_TOP_SPEND {
        return WhalePattern::MajorWhaleInterest;
    }

    WhalePattern::NormalWhaleActivity
}

impl WhaleReport {
    /// WHALE_ACTIVITY alert for patterns worth acting on.
    pub fn alert(&self) -> Option<Alert> {
        let severity = match self.pattern.urgency() {
            Some(s @ (Severity::High | Severity::Medium)) => s,
            _ => return None,
        };
        Some(Alert {
            alert_type: AlertType::WhaleActivity,
            severity,
            message: format!(
                "{}: {} whales spent {:.1} ETH across {} large purchases",
                self.pattern, self.whale_count, self.total_whale_volume, self.whale_transactions
            ),
            observed_value: self.total_whale_volume,
            baseline_value: MIN_TOTAL_SPENT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_557_600, 0).unwrap()
    }

    fn sale(buyer: &str, price: f64, minutes_ago: i64) -> SaleEvent {
        SaleEvent {
            event_type: "sale".to_string(),
            token_id: Some(format!("{buyer}-{minutes_ago}")),
            price,
            currency: "ETH".to_string(),
            from_address: Some("0xseller".to_string()),
            to_address: Some(buyer.to_string()),
            timestamp: Some(now() - Duration::minutes(minutes_ago)),
            transaction_hash: None,
        }
    }

    #[test]
    fn no_large_sales_means_no_whales() {
        let events = vec![sale("0xa", 1.0, 5), sale("0xb", 2.0, 5)];
        let report = analyze("azuki", &events, 10.0, now());
        assert_eq!(report.pattern, WhalePattern::NoWhales);
        assert_eq!(report.whale_count, 0);
        assert_eq!(report.whale_transactions, 0);
        assert!(report.alert().is_none());
    }

    #[test]
    fn single_small_whale_purchase_is_filtered_out() {
        // one purchase of 12 ETH: neither 2 purchases nor 20 ETH spend
        let report = analyze("azuki", &[sale("0xa", 12.0, 120)], 10.0, now());
        assert_eq!(report.whale_count, 0);
        assert_eq!(report.whale_transactions, 1);
        assert_eq!(report.pattern, WhalePattern::NoWhales);
    }

    #[test]
    fn clusters_by_buyer_and_sorts_by_spend() {
        let events = vec![
            sale("0xa", 10.0, 300),
            sale("0xa", 11.0, 300),
            sale("0xb", 25.0, 300),
            sale("0xc", 5.0, 300),
        ];
        let report = analyze("azuki", &events, 10.0, now());
        assert_eq!(report.whale_count, 2);
        assert_eq!(report.top_whales[0].address, "0xb");
        assert_eq!(report.top_whales[1].address, "0xa");
        assert_eq!(report.top_whales[1].purchases.len(), 2);
        assert!((report.total_whale_volume - 46.0).abs() < 1e-9);
        assert_eq!(report.pattern, WhalePattern::NormalWhaleActivity);
        assert!(report.alert().is_none());
    }

    #[test]
    fn dense_recent_buying_is_accumulation() {
        let events: Vec<SaleEvent> = (0..6).map(|i| sale("0xa", 15.0, i * 5)).collect();
        let report = analyze("azuki", &events, 10.0, now());
        assert_eq!(report.pattern, WhalePattern::WhaleAccumulation);
        let alert = report.alert().unwrap();
        assert_eq!(alert.alert_type, AlertType::WhaleActivity);
        assert_eq!(alert.severity, Severity::High);
        assert!(alert.message.contains("90.0"), "{}", alert.message);
    }

    #[test]
    fn many_big_whales_is_major_interest() {
        let events = vec![
            sale("0xa", 60.0, 600),
            sale("0xb", 25.0, 600),
            sale("0xc", 22.0, 600),
            sale("0xd", 21.0, 600),
        ];
        let report = analyze("azuki", &events, 10.0, now());
        assert_eq!(report.whale_count, 4);
        assert_eq!(report.pattern, WhalePattern::MajorWhaleInterest);
        assert_eq!(report.alert().unwrap().severity, Severity::Medium);
    }

    #[test]
    fn top_whales_are_capped() {
        let events: Vec<SaleEvent> = (0..8)
            .map(|i| sale(&format!("0x{i}"), 20.0 + i as f64, 600))
            .collect();
        let report = analyze("azuki", &events, 10.0, now());
        assert_eq!(report.whale_count, 8);
        assert_eq!(report.top_whales.len(), TOP_WHALES);
        assert_eq!(report.top_whales[0].address, "0x7");
    }
}
