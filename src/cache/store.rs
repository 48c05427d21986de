use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::gateway::{SheetData, SheetRange};
use crate::{LOG_TARGET, SharedClock};

/// Entries are scoped to a sheet so a write can drop all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sheet: String,
    pub range: String,
}

impl CacheKey {
    pub fn new(sheet: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            range: range.into(),
        }
    }
}

impl From<&SheetRange> for CacheKey {
    fn from(range: &SheetRange) -> Self {
        Self::new(range.sheet.clone(), range.span.clone().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Entry {
    data: SheetData,
    stored_at: DateTime<Utc>,
}

#[derive(Default)]
struct Entries {
    by_key: HashMap<CacheKey, Entry>,
    /// Bumped by every invalidation of the sheet.
    generations: HashMap<String, u64>,
}

/// An entry is served while `now - stored_at < ttl`. Expired entries are
/// evicted when looked up; nothing runs in the background.
pub struct SheetCache {
    entries: RwLock<Entries>,
    ttl: Duration,
    clock: SharedClock,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SheetCache {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<SheetData> {
        let now = self.clock.utc();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.by_key.get(key) {
                Some(entry) if now - entry.stored_at < self.ttl => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.data.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // expired
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .remove(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn store(&self, key: CacheKey, data: SheetData) {
        let entry = Entry {
            data,
            stored_at: self.clock.utc(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .insert(key, entry);
    }

    /// Invalidation count of `sheet`. Take it before a backend read and hand
    /// it to [`store_if_current`](Self::store_if_current) afterwards.
    pub fn generation(&self, sheet: &str) -> u64 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generations
            .get(sheet)
            .copied()
            .unwrap_or_default()
    }

    /// Stores `data` unless `key.sheet` was invalidated after `generation`
    /// was taken. Returns whether the entry was stored.
    pub fn store_if_current(&self, key: CacheKey, data: SheetData, generation: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let current = entries.generations.get(&key.sheet).copied().unwrap_or_default();
        if current != generation {
            log::debug!(
                target: LOG_TARGET,
                "msg=\"stale read not cached\", sheet=\"{}\"",
                key.sheet
            );
            return false;
        }
        let entry = Entry {
            data,
            stored_at: self.clock.utc(),
        };
        entries.by_key.insert(key, entry);
        true
    }

    /// Drops every entry of `sheet`. Returns how many were removed.
    pub fn invalidate_sheet(&self, sheet: &str) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        *entries.generations.entry(sheet.to_owned()).or_default() += 1;
        let before = entries.by_key.len();
        entries.by_key.retain(|key, _| key.sheet != sheet);
        let removed = before - entries.by_key.len();
        drop(entries);

        log::debug!(
            target: LOG_TARGET,
            "msg=\"sheet cache invalidated\", sheet=\"{sheet}\", removed={removed}"
        );
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .clear();
        log::debug!(target: LOG_TARGET, "msg=\"sheet cache cleared\"");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .by_key
                .len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::MutableClock;

    fn data(clock: &MutableClock, cell: &str) -> SheetData {
        SheetData {
            range: SheetRange::new("Ученики", "A:Z"),
            values: vec![vec![cell.to_owned()]],
            fetched_at: clock.now(),
        }
    }

    fn cache(clock: &Arc<MutableClock>) -> SheetCache {
        SheetCache::new(Duration::minutes(10), clock.clone())
    }

    #[test]
    fn test_store_then_lookup() {
        let clock = Arc::new(MutableClock::default());
        let cache = cache(&clock);
        let key = CacheKey::new("Ученики", "A:Z");

        cache.store(key.clone(), data(&clock, "v1"));
        assert_eq!(cache.lookup(&key), Some(data(&clock, "v1")));

        cache.store(key.clone(), data(&clock, "v2"));
        assert_eq!(cache.lookup(&key).unwrap().values[0][0], "v2");
    }

    #[test]
    fn test_ttl_boundary() {
        let clock = Arc::new(MutableClock::default());
        let cache = cache(&clock);
        let key = CacheKey::new("Ученики", "A:Z");
        cache.store(key.clone(), data(&clock, "v1"));

        clock.advance(Duration::minutes(10) - Duration::milliseconds(1));
        assert!(cache.lookup(&key).is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(cache.lookup(&key).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_invalidate_sheet_is_scoped() {
        let clock = Arc::new(MutableClock::default());
        let cache = cache(&clock);
        cache.store(CacheKey::new("Ученики", "A:Z"), data(&clock, "a"));
        cache.store(CacheKey::new("Ученики", "A1:C3"), data(&clock, "b"));
        cache.store(CacheKey::new("Группы", "A:Z"), data(&clock, "c"));

        assert_eq!(cache.invalidate_sheet("Ученики"), 2);
        assert!(cache.lookup(&CacheKey::new("Ученики", "A:Z")).is_none());
        assert!(cache.lookup(&CacheKey::new("Группы", "A:Z")).is_some());
    }

    #[test]
    fn test_sheet_name_prefix_not_confused() {
        let clock = Arc::new(MutableClock::default());
        let cache = cache(&clock);
        cache.store(CacheKey::new("Ученики_архив", "A:Z"), data(&clock, "a"));

        assert_eq!(cache.invalidate_sheet("Ученики"), 0);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_store_after_invalidation_is_dropped() {
        let clock = Arc::new(MutableClock::default());
        let cache = cache(&clock);
        let key = CacheKey::new("Ученики", "A:Z");

        let generation = cache.generation("Ученики");
        cache.invalidate_sheet("Ученики");
        assert!(!cache.store_if_current(key.clone(), data(&clock, "old"), generation));
        assert!(cache.lookup(&key).is_none());

        let generation = cache.generation("Ученики");
        assert!(cache.store_if_current(key.clone(), data(&clock, "new"), generation));
        assert_eq!(cache.lookup(&key).unwrap().values[0][0], "new");
    }

    #[test]
    fn test_stats_and_clear() {
        let clock = Arc::new(MutableClock::default());
        let cache = cache(&clock);
        let key = CacheKey::new("S", "A:Z");

        assert!(cache.lookup(&key).is_none());
        cache.store(key.clone(), data(&clock, "x"));
        assert!(cache.lookup(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
