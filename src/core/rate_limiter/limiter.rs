//! Identity keyed state shared by the in-process limiters

use super::types::LimiterOptions;
use lru::LruCache;
use parking_lot::{Mutex, MutexGuard};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-identity entries behind a single lock, optionally capped with LRU eviction
pub(super) struct KeyedEntries<E> {
    map: Mutex<LruCache<String, E>>,
    sweep: SweepSchedule,
    lazy_sweep: bool,
}

impl<E> KeyedEntries<E> {
    pub(super) fn new(options: &LimiterOptions) -> Self {
        let map = match options.max_tracked_keys.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            map: Mutex::new(map),
            sweep: SweepSchedule::new(options.maintenance_interval),
            lazy_sweep: options.lazy_sweep,
        }
    }

    /// Lock the map, running the expiry sweep first when one is due
    pub(super) fn lock_at<F>(&self, now: Instant, keep: F) -> MutexGuard<'_, LruCache<String, E>>
    where
        F: FnMut(&mut E) -> bool,
    {
        let mut map = self.map.lock();
        if self.lazy_sweep && self.sweep.due(now) {
            let removed = retain(&mut map, keep);
            if removed > 0 {
                debug!(removed, "Swept expired rate limit entries");
            }
        }
        map
    }

    /// Lock the map without sweeping
    pub(super) fn lock(&self) -> MutexGuard<'_, LruCache<String, E>> {
        self.map.lock()
    }

    /// Remove every entry `keep` rejects, returning how many were removed
    pub(super) fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&mut E) -> bool,
    {
        retain(&mut self.map.lock(), keep)
    }

    pub(super) fn len(&self) -> usize {
        self.map.lock().len()
    }
}

/// Fetch the entry for `key`, inserting `init()` when absent
pub(super) fn entry_or_insert<'a, E, F>(
    map: &'a mut LruCache<String, E>,
    key: &str,
    init: F,
) -> &'a mut E
where
    F: FnOnce() -> E,
{
    if map.len() >= map.cap().get() && !map.contains(key) {
        if let Some((evicted, _)) = map.peek_lru() {
            debug!(evicted = %evicted, "Evicting least recently used rate limit key");
        }
    }
    map.get_or_insert_mut(key.to_string(), init)
}

fn retain<E, F>(map: &mut LruCache<String, E>, mut keep: F) -> usize
where
    F: FnMut(&mut E) -> bool,
{
    let doomed: Vec<String> = map
        .iter_mut()
        .filter_map(|(key, entry)| (!keep(entry)).then(|| key.clone()))
        .collect();
    for key in &doomed {
        map.pop(key);
    }
    doomed.len()
}

/// Lazy maintenance clock: `due` returns true at most once per interval
pub(crate) struct SweepSchedule {
    interval: Duration,
    last: Mutex<Instant>,
}

impl SweepSchedule {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn due(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        if now.saturating_duration_since(*last) >= self.interval {
            *last = now;
            true
        } else {
            false
        }
    }
}
