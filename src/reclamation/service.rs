use crate::{
    error::{Error, Result},
    reclamation::{
        api::ReclamationApi,
        cache::{CachedData, QueryCache, QueryKey, SharedFetch},
        schema::{parse_reclamation, parse_reclamation_list, NewReclamation, Reclamation, ReclamationList},
    },
};
use futures::FutureExt;
use std::{
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Age after which a cached entry is refetched on observation; `None`
    /// means entries only go stale through invalidation.
    pub stale_time: Option<Duration>,
    /// Extra attempts for queries that fail at the transport level.
    pub query_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            stale_time: Some(Duration::from_secs(30)),
            query_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Delay before retry number `attempt` (zero-based), doubling up to 30s.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

pub fn total_pages(total_items: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        0
    } else {
        total_items.div_ceil(u64::from(page_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListParams {
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
}

impl ListParams {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::List {
            page: self.page,
            size: self.size,
        }
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Observed state of one list page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub params: ListParams,
    pub data: Option<ReclamationList>,
    pub error: Option<Error>,
    /// A request for this page is in flight, whether or not data is shown.
    pub is_fetching: bool,
    /// `data` belongs to the previously observed page.
    pub is_previous_data: bool,
}

impl ListQuery {
    pub fn reclamations(&self) -> &[Reclamation] {
        self.data.as_ref().map(|d| d.reclamations.as_slice()).unwrap_or(&[])
    }

    pub fn total_items(&self) -> u64 {
        self.data.as_ref().map(|d| d.total_items).unwrap_or(0)
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_items(), self.params.size)
    }

    pub fn has_more(&self) -> bool {
        u64::from(self.params.page) + 1 < self.total_pages()
    }

    /// Nothing to show yet: no data and no error.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }

    pub fn is_loading_page(&self) -> bool {
        self.is_fetching
    }

    #[cfg(test)]
    pub(crate) fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }
}

/// Observed state of a single-record query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordQuery {
    /// False when no id was given; no request is ever issued then.
    pub enabled: bool,
    pub data: Option<Reclamation>,
    pub error: Option<Error>,
    pub is_fetching: bool,
}

impl RecordQuery {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.enabled && self.data.is_none() && self.error.is_none()
    }
}

/// Identifies a record to remove. The name is kept for confirmation and
/// logging; the server only needs the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveTarget {
    pub id: i64,
    pub name: String,
}

impl From<&Reclamation> for RemoveTarget {
    fn from(record: &Reclamation) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
        }
    }
}

/// A record loaded for an edit form. Its cache entry never goes stale and
/// is discarded when the last handle is dropped.
pub struct FormRecord {
    record: Reclamation,
    key: QueryKey,
    cache: Arc<Mutex<QueryCache>>,
}

impl Deref for FormRecord {
    type Target = Reclamation;

    fn deref(&self) -> &Reclamation {
        &self.record
    }
}

impl Drop for FormRecord {
    fn drop(&mut self) {
        if lock(&self.cache).release_observer(&self.key) {
            debug!(key = %self.key, "form query discarded");
        }
    }
}

fn lock(cache: &Mutex<QueryCache>) -> MutexGuard<'_, QueryCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_query<A: ReclamationApi>(api: &A, key: QueryKey) -> Result<CachedData> {
    match key {
        QueryKey::List { page, size } => {
            let raw = api.list(page, size).await?;
            let list = parse_reclamation_list(&raw.body, raw.total_count.as_deref())?;
            Ok(CachedData::List(list))
        }
        QueryKey::Detail { id } | QueryKey::Form { id } => {
            let value = api.get(id).await?;
            Ok(CachedData::Record(parse_reclamation(&value)?))
        }
    }
}

async fn run_query_with_retry<A: ReclamationApi>(api: &A, key: QueryKey, options: &ServiceOptions) -> Result<CachedData> {
    let mut attempt = 0;
    loop {
        match run_query(api, key).await {
            Err(err) if err.is_retryable() && attempt < options.query_retries => {
                let delay = retry_delay(options.retry_base_delay, attempt);
                warn!(%key, attempt = attempt + 1, "query failed, retrying in {:?}: {}", delay, err);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Data access layer for reclamation records: queries through a shared
/// cache, mutations with cache reconciliation.
pub struct ReclamationService<A> {
    api: Arc<A>,
    cache: Arc<Mutex<QueryCache>>,
    options: ServiceOptions,
}

impl<A> Clone for ReclamationService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            cache: Arc::clone(&self.cache),
            options: self.options.clone(),
        }
    }
}

impl<A: ReclamationApi> ReclamationService<A> {
    pub fn new(api: A, options: ServiceOptions) -> Self {
        Self {
            cache: Arc::new(Mutex::new(QueryCache::new(options.stale_time))),
            api: Arc::new(api),
            options,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueryCache> {
        lock(&self.cache)
    }

    #[cfg(test)]
    pub(crate) fn api(&self) -> &A {
        &self.api
    }

    /// Start a fetch for `key`, or join the one already in flight.
    fn fetch(&self, key: QueryKey) -> SharedFetch {
        let mut cache = self.lock();
        cache.begin(key, |generation| {
            let api = Arc::clone(&self.api);
            let state = Arc::clone(&self.cache);
            let options = self.options.clone();
            let fetch = async move {
                debug!(%key, "fetching");
                let result = run_query_with_retry(api.as_ref(), key, &options).await;
                let applied = lock(&state).settle(&key, generation, &result, Instant::now());
                if !applied {
                    debug!(%key, "discarding result of cancelled fetch");
                    return Err(Error::Cancelled);
                }
                match &result {
                    Ok(_) => debug!(%key, "fetched"),
                    Err(err) => warn!(%key, "fetch failed: {}", err),
                }
                result
            }
            .boxed()
            .shared();

            // Settles the entry even when every awaiter goes away.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let driver = fetch.clone();
                handle.spawn(async move {
                    let _ = driver.await;
                });
            }
            fetch
        })
    }

    /// Fetch in the background when the entry is missing or stale.
    fn observe(&self, key: QueryKey) {
        if !self.lock().needs_fetch(&key, Instant::now()) {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(%key, "no async runtime, background refetch skipped");
            return;
        }
        drop(self.fetch(key));
    }

    /// Cached data when it is fresh, otherwise the result of a (possibly
    /// joined) request.
    async fn ensure(&self, key: QueryKey) -> Result<CachedData> {
        let fetch = {
            let cache = self.lock();
            let fresh = !cache.needs_fetch(&key, Instant::now()) && !cache.is_fetching(&key);
            match (fresh, cache.entry(&key)) {
                (true, Some(entry)) if entry.error.is_none() => {
                    if let Some(data) = &entry.data {
                        return Ok(data.clone());
                    }
                }
                _ => {}
            }
            drop(cache);
            self.fetch(key)
        };
        fetch.await
    }

    // Lists

    pub async fn fetch_list(&self, params: ListParams) -> Result<ReclamationList> {
        let data = self.ensure(params.key()).await?;
        data.as_list()
            .cloned()
            .ok_or_else(|| Error::Other(format!("{} holds a record", params.key())))
    }

    /// List(page, size): cached-or-fresh page plus derived pagination fields.
    pub async fn list(&self, params: ListParams) -> Result<ListQuery> {
        let data = self.fetch_list(params).await?;
        Ok(ListQuery {
            params,
            data: Some(data),
            error: None,
            is_fetching: self.lock().is_fetching(&params.key()),
            is_previous_data: false,
        })
    }

    /// Force a request for the page, joining one already in flight.
    pub async fn refetch_list(&self, params: ListParams) -> Result<ReclamationList> {
        let data = self.fetch(params.key()).await?;
        data.as_list()
            .cloned()
            .ok_or_else(|| Error::Other(format!("{} holds a record", params.key())))
    }

    /// Current cache state of the page; refetches in the background when the
    /// entry is missing or stale.
    pub fn list_snapshot(&self, params: ListParams) -> ListQuery {
        let key = params.key();
        self.observe(key);

        let cache = self.lock();
        let entry = cache.entry(&key);
        ListQuery {
            params,
            data: entry
                .and_then(|e| e.data.as_ref())
                .and_then(CachedData::as_list)
                .cloned(),
            error: entry.and_then(|e| e.error.clone()),
            is_fetching: cache.is_fetching(&key),
            is_previous_data: false,
        }
    }

    /// Cached page without triggering any request.
    #[cfg(test)]
    pub(crate) fn cached_list(&self, params: ListParams) -> Option<ReclamationList> {
        self.lock().data(&params.key()).and_then(CachedData::as_list).cloned()
    }

    pub fn list_observer(&self) -> ListObserver<A> {
        ListObserver {
            service: self.clone(),
            previous: None,
        }
    }

    // Single records

    /// Get(id); with no id nothing is requested and the query is disabled.
    pub async fn get(&self, id: Option<i64>) -> Result<RecordQuery> {
        let Some(id) = id else {
            return Ok(RecordQuery::disabled());
        };
        let key = QueryKey::Detail { id };
        let data = self.ensure(key).await?;
        Ok(RecordQuery {
            enabled: true,
            data: data.as_record().cloned(),
            error: None,
            is_fetching: self.lock().is_fetching(&key),
        })
    }

    pub fn record_snapshot(&self, id: Option<i64>) -> RecordQuery {
        let Some(id) = id else {
            return RecordQuery::disabled();
        };
        let key = QueryKey::Detail { id };
        self.observe(key);

        let cache = self.lock();
        let entry = cache.entry(&key);
        RecordQuery {
            enabled: true,
            data: entry
                .and_then(|e| e.data.as_ref())
                .and_then(CachedData::as_record)
                .cloned(),
            error: entry.and_then(|e| e.error.clone()),
            is_fetching: cache.is_fetching(&key),
        }
    }

    pub async fn refetch_record(&self, id: i64) -> Result<Reclamation> {
        let key = QueryKey::Detail { id };
        let data = self.fetch(key).await?;
        data.as_record()
            .cloned()
            .ok_or_else(|| Error::Other(format!("{} holds a list", key)))
    }

    /// GetForForm(id): a one-shot load for an edit form. The entry never
    /// goes stale and lives only as long as the returned handles.
    pub async fn get_for_form(&self, id: Option<i64>) -> Result<Option<FormRecord>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let key = QueryKey::Form { id };
        {
            let mut cache = self.lock();
            cache.mark_never_stale(key);
            cache.add_observer(key);
        }

        let result = self.ensure(key).await.and_then(|data| {
            data.as_record()
                .cloned()
                .ok_or_else(|| Error::Other(format!("{} holds a list", key)))
        });
        match result {
            Ok(record) => Ok(Some(FormRecord {
                record,
                key,
                cache: Arc::clone(&self.cache),
            })),
            Err(err) => {
                self.lock().release_observer(&key);
                Err(err)
            }
        }
    }

    // Mutations

    pub async fn update(&self, record: Reclamation) -> Result<Reclamation> {
        self.update_with(record, |_| {}).await
    }

    /// Update(record): on success, patches every cached page in place and
    /// marks lists and the record's detail stale before `on_success` runs.
    pub async fn update_with<F>(&self, record: Reclamation, on_success: F) -> Result<Reclamation>
    where
        F: FnOnce(&Reclamation),
    {
        info!(id = record.id, "updating reclamation");
        let value = self.api.update(&record).await?;
        let updated = parse_reclamation(&value)?;

        {
            let mut cache = self.lock();
            let cancelled = cache.cancel_where(QueryKey::is_list);
            let mut patched = 0;
            cache.patch_lists(|list| {
                if list.replace(&updated) {
                    patched += 1;
                }
            });
            let stale = cache.invalidate_where(QueryKey::is_list);
            cache.invalidate_where(|key| *key == QueryKey::Detail { id: record.id });
            debug!(cancelled, patched, stale, "cache reconciled after update");
        }

        on_success(&updated);
        Ok(updated)
    }

    pub async fn create(&self, payload: NewReclamation) -> Result<Reclamation> {
        self.create_with(payload, |_| {}).await
    }

    /// Create(payload): the new record's position is unknown locally, so
    /// every cached page is marked stale rather than patched.
    pub async fn create_with<F>(&self, payload: NewReclamation, on_success: F) -> Result<Reclamation>
    where
        F: FnOnce(&Reclamation),
    {
        info!(name = %payload.name, "creating reclamation");
        let value = self.api.create(&payload).await?;
        let created = parse_reclamation(&value)?;

        let stale = self.lock().invalidate_where(QueryKey::is_list);
        debug!(id = created.id, stale, "cache reconciled after create");

        on_success(&created);
        Ok(created)
    }

    pub async fn remove(&self, target: RemoveTarget) -> Result<()> {
        self.remove_with(target, |_| {}).await
    }

    pub async fn remove_with<F>(&self, target: RemoveTarget, on_success: F) -> Result<()>
    where
        F: FnOnce(&RemoveTarget),
    {
        info!(id = target.id, name = %target.name, "removing reclamation");
        self.api.delete(target.id).await?;

        let stale = self.lock().invalidate_where(QueryKey::is_list);
        debug!(id = target.id, stale, "cache reconciled after remove");

        on_success(&target);
        Ok(())
    }

    // Cache inspection

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.lock().entry(key).map(|e| e.stale).unwrap_or(false)
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, key: &QueryKey) -> bool {
        self.lock().entry(key).is_some()
    }

    /// Wait until no query is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let pending = self.lock().pending();
            if pending.is_empty() {
                return;
            }
            futures::future::join_all(pending).await;
        }
    }
}

/// Per-view list subscription that keeps the last page visible while the
/// next one loads.
pub struct ListObserver<A> {
    service: ReclamationService<A>,
    previous: Option<ReclamationList>,
}

impl<A: ReclamationApi> ListObserver<A> {
    pub fn observe(&mut self, params: ListParams) -> ListQuery {
        let mut query = self.service.list_snapshot(params);
        match &query.data {
            Some(data) => self.previous = Some(data.clone()),
            None if query.error.is_none() => {
                if let Some(previous) = &self.previous {
                    query.data = Some(previous.clone());
                    query.is_previous_data = true;
                }
            }
            None => {}
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKey,
        reclamation::{api::RawPage, testing::FakeApi},
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options() -> ServiceOptions {
        ServiceOptions {
            stale_time: None,
            query_retries: 0,
            retry_base_delay: Duration::from_millis(1),
        }
    }

    fn service(api: FakeApi) -> ReclamationService<FakeApi> {
        ReclamationService::new(api, options())
    }

    fn list_calls(service: &ReclamationService<FakeApi>) -> usize {
        service.api.list_calls.load(Ordering::SeqCst)
    }

    fn page(ids: std::ops::RangeInclusive<i64>, total: u64) -> ReclamationList {
        ReclamationList {
            reclamations: ids
                .rev()
                .map(|id| Reclamation {
                    id,
                    name: format!("reclamation-{}", id),
                    link: format!("https://example.org/{}", id),
                    description: None,
                })
                .collect(),
            total_items: total,
        }
    }

    #[test]
    fn test_derived_pagination_fields() {
        for (p, has_more) in [(0, true), (1, true), (2, false)] {
            let query = ListQuery {
                params: ListParams::new(p, 20),
                data: Some(page(1..=5, 45)),
                error: None,
                is_fetching: false,
                is_previous_data: false,
            };
            assert_eq!(query.total_pages(), 3);
            assert_eq!(query.has_more(), has_more, "page {}", p);
        }
    }

    #[test]
    fn test_total_pages_edge_cases() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(retry_delay(base, 0), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 2), Duration::from_secs(4));
        assert_eq!(retry_delay(base, 10), Duration::from_secs(30));
        assert_eq!(retry_delay(base, 64), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_full_single_page() {
        let service = service(FakeApi::with_records(20));
        let query = service.list(ListParams::new(0, 20)).await.unwrap();

        assert!(query.is_success());
        assert!(!query.data.as_ref().unwrap().is_empty());
        assert_eq!(query.reclamations().len(), 20);
        assert!(!query.has_more());
        assert_eq!(query.total_pages(), 1);
        assert_eq!(query.reclamations()[0].id, 20);
    }

    #[tokio::test]
    async fn test_default_page_size() {
        let service = service(FakeApi::with_records(15));
        let list = service.fetch_list(ListParams::default()).await.unwrap();
        assert_eq!(list.reclamations.len(), 10);
        assert_eq!(list.total_items, 15);
    }

    #[tokio::test]
    async fn test_concurrent_identical_lists_share_one_request() {
        let api = FakeApi::with_records(30);
        *api.list_delay.lock().unwrap() = Duration::from_millis(20);
        let service = service(api);
        let params = ListParams::new(0, 20);

        let (a, b) = tokio::join!(service.fetch_list(params), service.fetch_list(params));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(list_calls(&service), 1);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_still_settles() {
        let api = FakeApi::with_records(5);
        *api.list_delay.lock().unwrap() = Duration::from_millis(50);
        let service = service(api);
        let params = ListParams::new(0, 20);

        let abandoned = tokio::time::timeout(Duration::from_millis(5), service.list(params)).await;
        assert!(abandoned.is_err());
        assert!(service.list_snapshot(params).is_fetching);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let snapshot = service.list_snapshot(params);
        assert!(!snapshot.is_fetching);
        assert_eq!(snapshot.reclamations().len(), 5);
        assert_eq!(list_calls(&service), 1);
    }

    #[tokio::test]
    async fn test_fresh_cache_is_served_without_request() {
        let service = service(FakeApi::with_records(5));
        let params = ListParams::new(0, 20);
        service.fetch_list(params).await.unwrap();
        service.fetch_list(params).await.unwrap();
        let snapshot = service.list_snapshot(params);

        assert_eq!(list_calls(&service), 1);
        assert!(!snapshot.is_fetching);
        assert_eq!(snapshot.reclamations().len(), 5);
    }

    #[tokio::test]
    async fn test_get_without_id_is_disabled() {
        let service = service(FakeApi::with_records(3));

        let query = service.get(None).await.unwrap();
        assert!(!query.enabled);
        assert!(query.data.is_none());
        assert!(!query.is_loading());

        assert_eq!(service.record_snapshot(None), RecordQuery::disabled());
        service.wait_idle().await;
        assert_eq!(service.api.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_validates_record() {
        let service = service(FakeApi::with_records(3));
        let query = service.get(Some(2)).await.unwrap();
        assert_eq!(query.data.unwrap().name, "reclamation-2");

        let missing = service.get(Some(99)).await.unwrap_err();
        assert!(matches!(missing, Error::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_update_patches_every_cached_page() {
        let service = service(FakeApi::with_records(45));
        let first = ListParams::new(0, 20);
        let second_small = ListParams::new(1, 10);
        let last = ListParams::new(2, 20);
        for params in [first, second_small, last] {
            service.fetch_list(params).await.unwrap();
        }
        service.get(Some(30)).await.unwrap();
        let calls_before = list_calls(&service);

        let observer = service.clone();
        let mut hook_saw_patch = false;
        let updated = service
            .update_with(
                Reclamation {
                    id: 30,
                    name: "renamed".to_string(),
                    link: "https://example.org/renamed".to_string(),
                    description: Some("patched".to_string()),
                },
                |record| {
                    hook_saw_patch = observer
                        .cached_list(first)
                        .map(|list| list.reclamations.contains(record))
                        .unwrap_or(false);
                },
            )
            .await
            .unwrap();
        assert!(hook_saw_patch);

        for params in [first, second_small] {
            let cached = service.cached_list(params).unwrap();
            assert!(cached.reclamations.contains(&updated), "{:?}", params);
            assert!(service.is_stale(&params.key()));
        }
        assert!(!service.cached_list(last).unwrap().contains(30));
        assert!(service.is_stale(&last.key()));
        assert!(service.is_stale(&QueryKey::Detail { id: 30 }));
        assert_eq!(list_calls(&service), calls_before);

        // Next observation refetches each stale page exactly once.
        for params in [first, second_small, last, first, last] {
            service.list_snapshot(params);
        }
        service.wait_idle().await;
        assert_eq!(list_calls(&service), calls_before + 3);
        assert!(!service.is_stale(&first.key()));
    }

    #[tokio::test]
    async fn test_update_cancels_in_flight_list_fetch() {
        let api = FakeApi::with_records(10);
        let service = service(api);
        let params = ListParams::new(0, 20);
        service.fetch_list(params).await.unwrap();

        *service.api.list_delay.lock().unwrap() = Duration::from_millis(50);
        let background = tokio::spawn({
            let service = service.clone();
            async move { service.refetch_list(params).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = service
            .update(Reclamation {
                id: 7,
                name: "seven".to_string(),
                link: "https://example.org/seven".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let outcome = background.await.unwrap();
        assert_eq!(outcome, Err(Error::Cancelled));
        let cached = service.cached_list(params).unwrap();
        assert!(cached.reclamations.contains(&updated));
        assert!(service.is_stale(&params.key()));
    }

    #[tokio::test]
    async fn test_update_name_conflict_surfaces_error_key() {
        let service = service(FakeApi::with_records(3));
        let err = service
            .update(Reclamation {
                id: 1,
                name: "reclamation-2".to_string(),
                link: "l".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_name_already_used());
    }

    #[tokio::test]
    async fn test_create_marks_lists_stale_without_patching() {
        let service = service(FakeApi::with_records(4));
        let params = ListParams::new(0, 20);
        let before = service.fetch_list(params).await.unwrap();

        let mut hook_called = false;
        let created = service
            .create_with(
                NewReclamation {
                    name: "fresh".to_string(),
                    link: "https://example.org/fresh".to_string(),
                    description: None,
                },
                |_| hook_called = true,
            )
            .await
            .unwrap();

        assert!(hook_called);
        assert_eq!(created.id, 5);
        assert_eq!(service.cached_list(params), Some(before));
        assert!(service.is_stale(&params.key()));

        let after = service.fetch_list(params).await.unwrap();
        assert_eq!(after.reclamations[0], created);
        assert_eq!(list_calls(&service), 2);
    }

    #[tokio::test]
    async fn test_create_name_conflict() {
        let service = service(FakeApi::with_records(2));
        let err = service
            .create(NewReclamation {
                name: "reclamation-1".to_string(),
                link: "x".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_key(), Some(&ErrorKey::NameAlreadyUsed));
    }

    #[tokio::test]
    async fn test_remove_marks_lists_stale() {
        let service = service(FakeApi::with_records(3));
        let params = ListParams::new(0, 20);
        service.fetch_list(params).await.unwrap();

        let mut removed = None;
        service
            .remove_with(
                RemoveTarget {
                    id: 3,
                    name: "reclamation-3".to_string(),
                },
                |target| removed = Some(target.id),
            )
            .await
            .unwrap();

        assert_eq!(removed, Some(3));
        assert!(service.is_stale(&params.key()));
        assert_eq!(service.fetch_list(params).await.unwrap().total_items, 2);
    }

    #[tokio::test]
    async fn test_form_query_is_discarded_with_last_handle() {
        let service = service(FakeApi::with_records(3));
        let key = QueryKey::Form { id: 2 };

        let first = service.get_for_form(Some(2)).await.unwrap().unwrap();
        let second = service.get_for_form(Some(2)).await.unwrap().unwrap();
        assert_eq!(first.name, "reclamation-2");
        assert_eq!(service.api.get_calls.load(Ordering::SeqCst), 1);

        service
            .update(Reclamation {
                id: 2,
                name: "two".to_string(),
                link: "l".to_string(),
                description: None,
            })
            .await
            .unwrap();
        assert!(!service.is_stale(&key));

        drop(first);
        assert!(service.is_cached(&key));
        drop(second);
        assert!(!service.is_cached(&key));

        let reloaded = service.get_for_form(Some(2)).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "two");
        assert_eq!(service.api.get_calls.load(Ordering::SeqCst), 2);
        assert!(service.get_for_form(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_form_load_releases_entry() {
        let service = service(FakeApi::with_records(1));
        assert!(service.get_for_form(Some(9)).await.is_err());
        assert!(!service.is_cached(&QueryKey::Form { id: 9 }));
    }

    #[tokio::test]
    async fn test_observer_keeps_previous_page_visible() {
        let api = FakeApi::with_records(45);
        let service = service(api);
        let mut observer = service.list_observer();
        let first = ListParams::new(0, 20);

        let loading = observer.observe(first);
        assert!(loading.is_loading());
        assert!(loading.is_fetching);
        service.wait_idle().await;
        let loaded = observer.observe(first);
        assert_eq!(loaded.reclamations()[0].id, 45);

        *service.api.list_delay.lock().unwrap() = Duration::from_millis(10);
        let second = observer.observe(ListParams::new(1, 20));
        assert!(second.is_previous_data);
        assert!(second.is_loading_page());
        assert!(!second.is_loading());
        assert_eq!(second.reclamations()[0].id, 45);

        service.wait_idle().await;
        let second = observer.observe(ListParams::new(1, 20));
        assert!(!second.is_previous_data);
        assert_eq!(second.reclamations()[0].id, 25);
    }

    #[tokio::test]
    async fn test_error_state_and_manual_retry() {
        let api = FakeApi::with_records(2);
        *api.reject_list.lock().unwrap() = true;
        let service = service(api);
        let mut observer = service.list_observer();
        let params = ListParams::new(0, 20);

        observer.observe(params);
        service.wait_idle().await;
        let failed = observer.observe(params);
        assert!(failed.error.is_some());
        assert!(!failed.is_fetching);
        assert_eq!(list_calls(&service), 1);

        *service.api.reject_list.lock().unwrap() = false;
        service.refetch_list(params).await.unwrap();
        let recovered = observer.observe(params);
        assert!(recovered.is_success());
        assert_eq!(recovered.total_items(), 2);
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let api = FakeApi::with_records(2);
        api.fail_list_times.store(2, Ordering::SeqCst);
        let service = ReclamationService::new(
            api,
            ServiceOptions {
                query_retries: 2,
                ..options()
            },
        );

        let list = service.fetch_list(ListParams::new(0, 20)).await.unwrap();
        assert_eq!(list.total_items, 2);
        assert_eq!(list_calls(&service), 3);
    }

    #[tokio::test]
    async fn test_validation_errors_are_not_retried() {
        struct BadApi(AtomicUsize);

        #[async_trait]
        impl ReclamationApi for BadApi {
            async fn list(&self, _page: u32, _size: u32) -> Result<RawPage> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(RawPage {
                    body: json!([{"id": 1, "name": "a"}]),
                    total_count: Some("1".to_string()),
                })
            }
            async fn get(&self, _id: i64) -> Result<Value> {
                Ok(json!({}))
            }
            async fn update(&self, _record: &Reclamation) -> Result<Value> {
                Ok(json!({}))
            }
            async fn create(&self, _payload: &NewReclamation) -> Result<Value> {
                Ok(json!({}))
            }
            async fn delete(&self, _id: i64) -> Result<()> {
                Ok(())
            }
        }

        let service = ReclamationService::new(
            BadApi(AtomicUsize::new(0)),
            ServiceOptions {
                query_retries: 3,
                ..options()
            },
        );
        let err = service.fetch_list(ListParams::new(0, 20)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref v) if v.path == "reclamations[0].link"));
        assert_eq!(service.api.0.load(Ordering::SeqCst), 1);

        let err = service
            .update(Reclamation {
                id: 1,
                name: "a".to_string(),
                link: "b".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
