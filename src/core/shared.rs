/// A chain that can be read from many threads while one owner writes to it.
///
/// Readers take a snapshot (`Arc` clone) and walk it without holding the
/// lock. Bulk rebuilds happen off-lock and are published by swapping the
/// pointer, so a reader never sees a half-built table.
use rand::Rng;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::markov::MarkovChain;
use crate::schema::corpus::CorpusItem;

#[derive(Debug, Default)]
pub struct SharedChain {
    inner: RwLock<Arc<MarkovChain>>,
}

impl SharedChain {
    pub fn new(chain: MarkovChain) -> Self {
        Self {
            inner: RwLock::new(Arc::new(chain)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Arc<MarkovChain>> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("chain lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<MarkovChain>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("chain lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// The current chain. Later writes do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<MarkovChain> {
        Arc::clone(&*self.read())
    }

    /// Build a fresh chain from `items` and publish it in one swap.
    pub fn replace<I>(&self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<CorpusItem>,
    {
        let mut fresh = MarkovChain::new();
        fresh.ingest_bulk(items);
        self.publish(fresh);
    }

    /// Swap in an already built chain.
    pub fn publish(&self, chain: MarkovChain) {
        *self.write() = Arc::new(chain);
    }

    /// Merge one message. Outstanding snapshots keep their old contents.
    pub fn learn(&self, text: &str, weight: i64) {
        let mut guard = self.write();
        Arc::make_mut(&mut *guard).ingest_one(text, weight);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.publish(MarkovChain::new());
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, max_tokens: usize) -> String {
        self.snapshot().generate(rng, max_tokens)
    }

    pub fn key_count(&self) -> usize {
        self.read().key_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::thread;

    #[test]
    fn snapshot_survives_learning() {
        let shared = SharedChain::default();
        shared.learn("alpha beta gamma", 1);
        let before = shared.snapshot();
        shared.learn("delta epsilon zeta", 1);

        assert_eq!(before.key_count(), 1);
        assert_eq!(shared.key_count(), 2);
    }

    #[test]
    fn replace_swaps_whole_table() {
        let shared = SharedChain::default();
        shared.learn("old words stay here", 1);
        let old = shared.snapshot();
        shared.replace(["brand new words here"]);

        assert!(old.get("old words").is_some());
        assert!(shared.snapshot().get("old words").is_none());
        assert!(shared.snapshot().get("brand new").is_some());
    }

    #[test]
    fn concurrent_readers_see_complete_tables() {
        let shared = Arc::new(SharedChain::default());
        shared.replace(["one two three four"]);

        let readers: Vec<_> = (0..4)
            .map(|seed| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for _ in 0..200 {
                        let keys = shared.snapshot().key_count();
                        assert!(keys == 2 || keys == 3, "partial table with {} keys", keys);
                        let _ = shared.generate(&mut rng, 10);
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            shared.replace(["one two three four five"]);
            shared.replace(["one two three four"]);
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn clear_empties_chain() {
        let shared = SharedChain::default();
        shared.learn("alpha beta gamma", 1);
        shared.clear();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(shared.generate(&mut rng, 10), "");
    }
}
