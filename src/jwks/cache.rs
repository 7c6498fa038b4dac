use jsonwebtoken::jwk::Jwk;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_FRESH_TTL, DEFAULT_STALE_TTL};

/// Process-lifetime cache of the most recently fetched signing keys.
///
/// The key map always reflects exactly one complete fetch response: a
/// successful fetch replaces it wholesale, a failed fetch leaves it
/// untouched. No operation performs I/O or blocks beyond the lock.
#[derive(Debug)]
pub struct KeySetCache {
    inner: RwLock<Inner>,
    fresh_ttl: Duration,
    stale_ttl: Duration,
}

#[derive(Debug, Default)]
struct Inner {
    keys: HashMap<String, Jwk>,
    fetched_at: Option<Instant>,
}

impl KeySetCache {
    pub fn new(fresh_ttl: Duration, stale_ttl: Duration) -> Self {
        // The staleness window always contains the freshness window.
        let stale_ttl = stale_ttl.max(fresh_ttl);
        Self {
            inner: RwLock::new(Inner::default()),
            fresh_ttl,
            stale_ttl,
        }
    }

    /// Last fetch is recent enough that no refresh is needed.
    pub fn is_fresh(&self) -> bool {
        match self.inner.read().unwrap().fetched_at {
            Some(fetched_at) => fetched_at.elapsed() < self.fresh_ttl,
            None => false,
        }
    }

    /// Keys exist and are young enough to serve as a fallback when the
    /// endpoint is unreachable.
    pub fn is_usable_stale(&self) -> bool {
        let inner = self.inner.read().unwrap();
        match inner.fetched_at {
            Some(fetched_at) => {
                !inner.keys.is_empty() && fetched_at.elapsed() < self.stale_ttl
            }
            None => false,
        }
    }

    /// Atomically swaps in a complete key set from one fetch response.
    pub fn replace(&self, keys: HashMap<String, Jwk>) {
        let mut inner = self.inner.write().unwrap();
        inner.keys = keys;
        inner.fetched_at = Some(Instant::now());
    }

    pub fn lookup(&self, kid: &str) -> Option<Jwk> {
        self.inner.read().unwrap().keys.get(kid).cloned()
    }

    /// Time since the last successful fetch, if any.
    pub fn age(&self) -> Option<Duration> {
        self.inner
            .read()
            .unwrap()
            .fetched_at
            .map(|fetched_at| fetched_at.elapsed())
    }

    pub fn key_count(&self) -> usize {
        self.inner.read().unwrap().keys.len()
    }

    #[cfg(test)]
    pub(crate) fn rewind(&self, age: Duration) {
        let mut inner = self.inner.write().unwrap();
        inner.fetched_at = Instant::now().checked_sub(age);
    }
}

impl Default for KeySetCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRESH_TTL, DEFAULT_STALE_TTL)
    }
}
