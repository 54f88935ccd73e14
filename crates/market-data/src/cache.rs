use chrono::{DateTime, Duration, Utc};
use core_types::MarketSnapshot;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The market state cache.
///
/// Writes for a symbol are serialized by the outer lock; reads across symbols
/// proceed in parallel. `latest` hands out a cheap `Arc` clone, so a reader
/// keeps a consistent snapshot for the whole evaluation even while new data
/// arrives.
pub struct SnapshotStore {
    slots: RwLock<HashMap<String, Arc<MarketSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the symbol's snapshot wholesale.
    ///
    /// Out-of-order snapshots (older than the one already stored) are dropped,
    /// so the cache timestamp never moves backwards.
    pub async fn update(&self, snapshot: MarketSnapshot) {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&snapshot.symbol) {
            Some(stored) => {
                if snapshot.timestamp < stored.timestamp {
                    tracing::debug!(
                        symbol = %snapshot.symbol,
                        stored = %stored.timestamp,
                        incoming = %snapshot.timestamp,
                        "dropping out-of-order snapshot"
                    );
                    return;
                }
                *stored = Arc::new(snapshot);
            }
            None => {
                slots.insert(snapshot.symbol.clone(), Arc::new(snapshot));
            }
        }
    }

    /// The most recent snapshot for a symbol, if one has ever arrived.
    pub async fn latest(&self, symbol: &str) -> Option<Arc<MarketSnapshot>> {
        self.slots.read().await.get(symbol).map(Arc::clone)
    }

    /// Latest mid prices for every symbol, for mark-to-market.
    pub async fn mid_prices(&self) -> HashMap<String, Decimal> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .filter_map(|(symbol, snapshot)| {
                snapshot.mid_price().map(|mid| (symbol.clone(), mid))
            })
            .collect()
    }

    /// True when the symbol has no snapshot, or its snapshot is older than
    /// `max_age` relative to `now`.
    pub async fn is_stale(&self, symbol: &str, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.slots.read().await.get(symbol) {
            Some(snapshot) => now - snapshot.timestamp > max_age,
            None => true,
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
