//! Client-side query cache: canonical query keys mapped to the last result,
//! with explicit staleness and in-flight tracking.

use crate::{
    error::{Error, Result},
    reclamation::schema::{Reclamation, ReclamationList},
};
use futures::future::{BoxFuture, Shared};
use std::{
    collections::HashMap,
    fmt,
    time::{Duration, Instant},
};

/// Canonical identifier of a cached request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    List { page: u32, size: u32 },
    Detail { id: i64 },
    Form { id: i64 },
}

impl QueryKey {
    pub fn is_list(&self) -> bool {
        matches!(self, QueryKey::List { .. })
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::List { page, size } => write!(f, "reclamation.list(page={}, size={})", page, size),
            QueryKey::Detail { id } => write!(f, "reclamation.detail({})", id),
            QueryKey::Form { id } => write!(f, "reclamation.form({})", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedData {
    List(ReclamationList),
    Record(Reclamation),
}

impl CachedData {
    pub fn as_list(&self) -> Option<&ReclamationList> {
        match self {
            CachedData::List(list) => Some(list),
            CachedData::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Reclamation> {
        match self {
            CachedData::Record(record) => Some(record),
            CachedData::List(_) => None,
        }
    }
}

pub type SharedFetch = Shared<BoxFuture<'static, Result<CachedData>>>;

#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub data: Option<CachedData>,
    pub error: Option<Error>,
    pub stale: bool,
    pub updated_at: Option<Instant>,
    pub never_stale: bool,
    pub observers: usize,
}

impl CacheEntry {
    fn is_expired(&self, stale_time: Option<Duration>, now: Instant) -> bool {
        if self.never_stale {
            return false;
        }
        match (stale_time, self.updated_at) {
            (Some(limit), Some(at)) => now.saturating_duration_since(at) >= limit,
            _ => false,
        }
    }
}

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, InFlight>,
    next_generation: u64,
    stale_time: Option<Duration>,
}

impl QueryCache {
    pub fn new(stale_time: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            next_generation: 0,
            stale_time,
        }
    }

    pub fn entry(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn data(&self, key: &QueryKey) -> Option<&CachedData> {
        self.entries.get(key).and_then(|e| e.data.as_ref())
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Whether observing `key` right now should trigger a fetch.
    pub fn needs_fetch(&self, key: &QueryKey, now: Instant) -> bool {
        if self.is_fetching(key) {
            return false;
        }
        match self.entries.get(key) {
            None => true,
            Some(entry) if entry.data.is_none() && entry.error.is_none() => true,
            Some(entry) => entry.stale || (entry.error.is_none() && entry.is_expired(self.stale_time, now)),
        }
    }

    /// Join the request in flight for `key`, or register a new one built by
    /// `start` from a fresh generation number.
    pub fn begin(&mut self, key: QueryKey, start: impl FnOnce(u64) -> SharedFetch) -> SharedFetch {
        if let Some(in_flight) = self.in_flight.get(&key) {
            return in_flight.fetch.clone();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let fetch = start(generation);
        self.entries.entry(key).or_default();
        self.in_flight.insert(
            key,
            InFlight {
                generation,
                fetch: fetch.clone(),
            },
        );
        fetch
    }

    /// Record the outcome of the fetch started with `generation`. Returns
    /// false when that fetch was cancelled or superseded; the cache is left
    /// untouched in that case.
    pub fn settle(&mut self, key: &QueryKey, generation: u64, result: &Result<CachedData>, now: Instant) -> bool {
        match self.in_flight.get(key) {
            Some(in_flight) if in_flight.generation == generation => {}
            _ => return false,
        }
        self.in_flight.remove(key);

        let entry = self.entries.entry(*key).or_default();
        match result {
            Ok(data) => {
                entry.data = Some(data.clone());
                entry.error = None;
                entry.updated_at = Some(now);
            }
            Err(err) => {
                entry.error = Some(err.clone());
            }
        }
        entry.stale = false;
        true
    }

    /// Drop in-flight tracking for matching keys so their results are
    /// discarded when they arrive.
    pub fn cancel_where(&mut self, pred: impl Fn(&QueryKey) -> bool) -> usize {
        let before = self.in_flight.len();
        self.in_flight.retain(|key, _| !pred(key));
        before - self.in_flight.len()
    }

    /// Mark matching entries stale. Entries are kept, never removed.
    pub fn invalidate_where(&mut self, pred: impl Fn(&QueryKey) -> bool) -> usize {
        let mut count = 0;
        for (key, entry) in self.entries.iter_mut() {
            if pred(key) && !entry.never_stale {
                entry.stale = true;
                count += 1;
            }
        }
        count
    }

    /// Apply `patch` to every cached list page.
    pub fn patch_lists(&mut self, mut patch: impl FnMut(&mut ReclamationList)) {
        for (key, entry) in self.entries.iter_mut() {
            if !key.is_list() {
                continue;
            }
            if let Some(CachedData::List(list)) = entry.data.as_mut() {
                patch(list);
            }
        }
    }

    pub fn mark_never_stale(&mut self, key: QueryKey) {
        self.entries.entry(key).or_default().never_stale = true;
    }

    pub fn add_observer(&mut self, key: QueryKey) {
        self.entries.entry(key).or_default().observers += 1;
    }

    /// Release one observer; the entry is discarded once nobody observes it.
    pub fn release_observer(&mut self, key: &QueryKey) -> bool {
        let remove = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.observers = entry.observers.saturating_sub(1);
                entry.observers == 0
            }
            None => false,
        };
        if remove {
            self.entries.remove(key);
            self.in_flight.remove(key);
        }
        remove
    }

    pub fn pending(&self) -> Vec<SharedFetch> {
        self.in_flight.values().map(|f| f.fetch.clone()).collect()
    }
}
