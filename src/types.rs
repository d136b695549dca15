use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Collection snapshot
// ---------------------------------------------------------------------------

/// Snapshot of one collection at scan time. Prices and volumes are in the
/// collection's floor currency (ETH for most OpenSea collections).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub collection: String,
    pub floor_price: f64,
    pub floor_price_symbol: String,
    pub one_day_volume: f64,
    pub seven_day_volume: f64,
    pub thirty_day_volume: f64,
    pub one_day_sales: u64,
    pub seven_day_sales: u64,
    pub thirty_day_sales: u64,
    pub one_day_volume_change_pct: f64,
    pub seven_day_volume_change_pct: f64,
    pub thirty_day_volume_change_pct: f64,
    pub one_day_average_price: f64,
    pub total_volume: f64,
    pub total_sales: u64,
    pub total_supply: u64,
    pub num_owners: u64,
    pub market_cap: f64,
}

/// Rolling averages describing "normal" recent behaviour for a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub avg_volume: f64,
    pub avg_floor_price: f64,
    pub avg_sales: f64,
}

impl Baseline {
    /// Baseline for a never-seen collection: its own current stats.
    pub fn from_stats(stats: &CollectionStats) -> Self {
        Self {
            avg_volume: stats.one_day_volume,
            avg_floor_price: stats.floor_price,
            avg_sales: stats.one_day_sales as f64,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    VolumeSurge,
    SalesSpike,
    FloorPump,
    FloorDump,
    MarketCapShift,
    WhaleActivity,
    SocialTrending,
    ListingPattern,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertType::VolumeSurge => "VOLUME_SURGE",
            AlertType::SalesSpike => "SALES_SPIKE",
            AlertType::FloorPump => "FLOOR_PUMP",
            AlertType::FloorDump => "FLOOR_DUMP",
            AlertType::MarketCapShift => "MARKET_CAP_SHIFT",
            AlertType::WhaleActivity => "WHALE_ACTIVITY",
            AlertType::SocialTrending => "SOCIAL_TRENDING",
            AlertType::ListingPattern => "LISTING_PATTERN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Contribution to the aggregate risk score.
    pub fn weight(self) -> u32 {
        match self {
            Severity::High => 40,
            Severity::Medium => 20,
            Severity::Low => 10,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub observed_value: f64,
    pub baseline_value: f64,
}

/// An alert as recorded in a cycle summary: flattened across collections,
/// so it carries the collection and the time it was raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedAlert {
    pub time: DateTime<Utc>,
    pub collection: String,
    #[serde(flatten)]
    pub alert: Alert,
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Wait,
    Watch,
    Hold,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Wait => "WAIT",
            Action::Watch => "WATCH",
            Action::Hold => "HOLD",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub confidence: Confidence,
    pub reasoning: String,
}

// ---------------------------------------------------------------------------
// Scan results and persisted monitoring state
// ---------------------------------------------------------------------------

/// Outcome of running detection + scoring for one collection in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub collection: String,
    pub timestamp: DateTime<Utc>,
    pub stats: CollectionStats,
    pub alerts: Vec<Alert>,
    pub risk_score: u8,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchListEntry {
    pub collection: String,
    /// Set on first qualification and never changed afterwards.
    #[serde(alias = "firstSeen")]
    pub first_seen_at: DateTime<Utc>,
    pub risk_score: u8,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub last_qualified_at: Option<DateTime<Utc>>,
    /// Consecutive completed cycles in which this collection did not requalify.
    #[serde(default)]
    pub cycles_since_qualified: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCycleSummary {
    pub timestamp: DateTime<Utc>,
    pub total_alerts: usize,
    pub high_priority_count: usize,
    #[serde(default)]
    pub alerts: Vec<LoggedAlert>,
}

/// Persisted monitor state. Rewritten wholesale after every cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringLog {
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alert_history: Vec<ScanCycleSummary>,
    #[serde(default)]
    pub high_priority_alerts: Vec<WatchListEntry>,
}

// ---------------------------------------------------------------------------
// Auxiliary scan types
// ---------------------------------------------------------------------------

/// A marketplace event (sale, listing, transfer) for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEvent {
    pub event_type: String,
    pub token_id: Option<String>,
    /// Price in whole currency units (already scaled from wei).
    pub price: f64,
    pub currency: String,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCollection {
    pub collection: String,
    pub name: Option<String>,
    pub floor_price: f64,
    pub one_day_change_pct: f64,
    pub one_day_volume: f64,
    pub one_day_sales: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WhalePattern {
    NoWhales,
    WhaleAccumulation,
    MajorWhaleInterest,
    NormalWhaleActivity,
}

impl WhalePattern {
    pub fn interpretation(self) -> &'static str {
        match self {
            WhalePattern::NoWhales => "No significant whale activity",
            WhalePattern::WhaleAccumulation => "Whales are actively accumulating",
            WhalePattern::MajorWhaleInterest => "Large holders showing strong interest",
            WhalePattern::NormalWhaleActivity => "Standard whale trading patterns",
        }
    }

    pub fn urgency(self) -> Option<Severity> {
        match self {
            WhalePattern::NoWhales => None,
            WhalePattern::WhaleAccumulation => Some(Severity::High),
            WhalePattern::MajorWhaleInterest => Some(Severity::Medium),
            WhalePattern::NormalWhaleActivity => Some(Severity::Low),
        }
    }
}

impl std::fmt::Display for WhalePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WhalePattern::NoWhales => "NO_WHALES",
            WhalePattern::WhaleAccumulation => "WHALE_ACCUMULATION",
            WhalePattern::MajorWhaleInterest => "MAJOR_WHALE_INTEREST",
            WhalePattern::NormalWhaleActivity => "NORMAL_WHALE_ACTIVITY",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhalePurchase {
    pub token_id: Option<String>,
    pub price: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Whale {
    pub address: String,
    pub purchases: Vec<WhalePurchase>,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhaleReport {
    pub collection: String,
    pub whale_count: usize,
    pub total_whale_volume: f64,
    pub top_whales: Vec<Whale>,
    pub whale_transactions: usize,
    pub pattern: WhalePattern,
}
