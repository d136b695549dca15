#[cfg(test)]
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Social buzz observed for a collection on some platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSignal {
    pub platform: String,
    pub mention_increase_pct: f64,
    pub trending: bool,
}

/// Source of social signals (Twitter, Discord, ...). Implementations are
/// interchangeable: a real API, a fixture, or nothing at all.
pub trait SocialSignalProvider: Send + Sync {
    fn signal(&self, collection: &str) -> Option<SocialSignal>;
}

/// Default provider: no social data source configured.
pub struct NoSocialSignals;

impl SocialSignalProvider for NoSocialSignals {
    fn signal(&self, _collection: &str) -> Option<SocialSignal> {
        None
    }
}

/// Fixed per-collection signals for tests.
#[cfg(test)]
#[derive(Default)]
pub struct StaticSocialSignals {
    signals: HashMap<String, SocialSignal>,
}

#[cfg(test)]
impl StaticSocialSignals {
    pub fn with(mut self, collection: &str, signal: SocialSignal) -> Self {
        self.signals.insert(collection.to_string(), signal);
        self
    }
}

#[cfg(test)]
impl SocialSignalProvider for StaticSocialSignals {
    fn signal(&self, collection: &str) -> Option<SocialSignal> {
        self.signals.get(collection).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_signals_by_collection() {
        let provider = StaticSocialSignals::default().with(
            "azuki",
            SocialSignal {
                platform: "discord".to_string(),
                mention_increase_pct: 120.0,
                trending: true,
            },
        );
        assert_eq!(provider.signal("azuki").map(|s| s.platform), Some("discord".to_string()));
        assert!(provider.signal("doodles").is_none());
        assert!(NoSocialSignals.signal("azuki").is_none());
    }
}
