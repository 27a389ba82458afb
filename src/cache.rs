// src/cache.rs
//! Общий кэш запросов клиентского слоя
//!
//! Кэш - явный внедряемый объект (никакого глобального состояния), один
//! экземпляр на семейство записей. Ключ записи составной: экран плюс
//! разрешённая пара (filter, search). Гарантии:
//! - не более одного запроса в полёте на различающийся ключ, дубликаты
//!   присоединяются к текущему через watch-канал;
//! - устаревший ответ не перетирает более новый: результат записывается
//!   только если поколение ключа не менялось с момента старта запроса;
//! - задача запроса доводится до конца независимо от интереса вызвавших,
//!   поэтому результат попадает в кэш даже после ухода с экрана.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
// tokio::time::Instant подчиняется паузе времени в тестах
use tokio::time::Instant;

use crate::actions::{apply_mutation, ListMutation};
use crate::error::{ApiError, ApiResult};
use crate::filter::{FilterMap, FilterWhitelist, ListQuery};
use crate::models::Record;

// ==================== SCREEN ID ====================

/// Дискриминированный идентификатор экрана; ключи кэша не строковые,
/// чтобы экраны не могли случайно пересечься
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenId {
    AdminReservations,
    MyReservations,
    Users,
}

impl ScreenId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenId::AdminReservations => "all-reservations",
            ScreenId::MyReservations => "my-reservations",
            ScreenId::Users => "users",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all-reservations" => Some(ScreenId::AdminReservations),
            "my-reservations" => Some(ScreenId::MyReservations),
            "users" => Some(ScreenId::Users),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== KEYS ====================

/// Составной ключ кэшированного набора результатов
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub screen: ScreenId,
    pub query: ListQuery,
}

impl ListKey {
    pub fn new(screen: ScreenId, query: ListQuery) -> Self {
        Self { screen, query }
    }
}

// ==================== CONFIG ====================

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Свежая запись отдаётся без запроса; устаревшая дочитывается заново
    pub stale_after: Duration,
    /// Срок, после которого запись выметается сборкой
    pub gc_after: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(60),
            gc_after: Duration::from_secs(300),
        }
    }
}

// ==================== METRICS ====================

#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    coalesced: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            coalesced: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub errors: u64,
}

// ==================== INTERNAL STATE ====================

enum FetchState<T> {
    Pending,
    Done(ApiResult<Arc<Vec<T>>>),
}

impl<T> Clone for FetchState<T> {
    fn clone(&self) -> Self {
        match self {
            FetchState::Pending => FetchState::Pending,
            FetchState::Done(result) => FetchState::Done(result.clone()),
        }
    }
}

struct CachedSet<T> {
    records: Arc<Vec<T>>,
    fetched_at: Instant,
}

struct InFlight<T> {
    generation: u64,
    rx: watch::Receiver<FetchState<T>>,
}

struct CacheInner<T> {
    filters: HashMap<ScreenId, FilterMap>,
    searches: HashMap<ScreenId, String>,
    entries: HashMap<ListKey, CachedSet<T>>,
    in_flight: HashMap<ListKey, InFlight<T>>,
    generations: HashMap<ListKey, u64>,
}

impl<T> CacheInner<T> {
    fn new() -> Self {
        Self {
            filters: HashMap::new(),
            searches: HashMap::new(),
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            generations: HashMap::new(),
        }
    }

    /// Инвалидация ключа: поколение вперёд, запись и полётный канал долой.
    /// Ожидающие получат свой результат, но в кэш он уже не попадёт.
    fn invalidate_key(&mut self, key: &ListKey) {
        *self.generations.entry(key.clone()).or_insert(0) += 1;
        self.entries.remove(key);
        self.in_flight.remove(key);
    }

    fn screen_keys(&self, screen: ScreenId) -> HashSet<ListKey> {
        self.entries
            .keys()
            .chain(self.in_flight.keys())
            .filter(|key| key.screen == screen)
            .cloned()
            .collect()
    }
}

// ==================== QUERY CACHE ====================

pub struct QueryCache<T> {
    inner: Arc<Mutex<CacheInner<T>>>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl<T> QueryCache<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::new())),
            config,
            metrics: CacheMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    // ==================== FILTER SLOTS ====================

    pub fn filter(&self, screen: ScreenId) -> FilterMap {
        let inner = self.inner.lock().unwrap();
        inner.filters.get(&screen).cloned().unwrap_or_default()
    }

    /// Поверхностное слияние частичного фильтра; пустые и чужие для
    /// экрана поля отбрасываются. Смена фильтра меняет ключ, поэтому
    /// отдельная инвалидация не нужна.
    pub fn set_filter(&self, screen: ScreenId, patch: FilterMap) {
        let clean = FilterWhitelist::for_screen(screen).sanitize(patch);
        if clean.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.filters.entry(screen).or_default().extend(clean);
    }

    /// Сброс фильтра принудительно инвалидирует наборы экрана
    pub fn reset_filter(&self, screen: ScreenId) {
        let mut inner = self.inner.lock().unwrap();
        inner.filters.remove(&screen);
        for key in inner.screen_keys(screen) {
            inner.invalidate_key(&key);
        }
        log::debug!("filter reset for screen {}", screen);
    }

    // ==================== SEARCH SLOT ====================

    pub fn search(&self, screen: ScreenId) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.searches.get(&screen).cloned()
    }

    pub fn set_search(&self, screen: ScreenId, value: &str) {
        let trimmed = value.trim();
        let mut inner = self.inner.lock().unwrap();
        if trimmed.is_empty() {
            inner.searches.remove(&screen);
        } else {
            inner.searches.insert(screen, trimmed.to_string());
        }
    }

    pub fn reset_search(&self, screen: ScreenId) {
        let mut inner = self.inner.lock().unwrap();
        inner.searches.remove(&screen);
        for key in inner.screen_keys(screen) {
            inner.invalidate_key(&key);
        }
        log::debug!("search reset for screen {}", screen);
    }

    // ==================== QUERY RESOLUTION ====================

    /// Текущая пара (filter, search) экрана; пересчитывается при каждом
    /// обращении, нигде не кэшируется
    pub fn current_query(&self, screen: ScreenId) -> ListQuery {
        let inner = self.inner.lock().unwrap();
        ListQuery::new(
            inner.filters.get(&screen).cloned().unwrap_or_default(),
            inner.searches.get(&screen).cloned(),
        )
    }

    pub fn current_key(&self, screen: ScreenId) -> ListKey {
        ListKey::new(screen, self.current_query(screen))
    }

    // ==================== RESULT SETS ====================

    pub fn get(&self, key: &ListKey) -> Option<Arc<Vec<T>>> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(key).map(|entry| Arc::clone(&entry.records))
    }

    pub fn is_loading(&self, key: &ListKey) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.in_flight.contains_key(key)
    }

    pub fn entry_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.entries.len()
    }

    /// Выполняет запрос под ключом или присоединяется к уже летящему.
    /// Свежая запись отдаётся сразу; устаревшая дочитывается, но остаётся
    /// доступной через `get` до прихода нового результата.
    pub async fn fetch_with(
        &self,
        key: ListKey,
        fetch: BoxFuture<'static, ApiResult<Vec<T>>>,
    ) -> ApiResult<Arc<Vec<T>>> {
        let rx = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(entry) = inner.entries.get(&key) {
                if entry.fetched_at.elapsed() < self.config.stale_after {
                    self.metrics.record_hit();
                    return Ok(Arc::clone(&entry.records));
                }
            }

            if let Some(in_flight) = inner.in_flight.get(&key) {
                self.metrics.record_coalesced();
                in_flight.rx.clone()
            } else {
                self.metrics.record_miss();
                self.spawn_fetch(&mut inner, key.clone(), fetch)
            }
        };

        Self::wait_done(rx).await
    }

    fn spawn_fetch(
        &self,
        inner: &mut CacheInner<T>,
        key: ListKey,
        fetch: BoxFuture<'static, ApiResult<Vec<T>>>,
    ) -> watch::Receiver<FetchState<T>> {
        let generation = *inner.generations.entry(key.clone()).or_insert(0);
        let (tx, rx) = watch::channel(FetchState::Pending);
        inner.in_flight.insert(key.clone(), InFlight { generation, rx: rx.clone() });

        let inner_arc = Arc::clone(&self.inner);
        let metrics = self.metrics.clone();
        log::debug!("fetch start: screen={} key={}", key.screen, key.query.key_string());

        tokio::spawn(async move {
            let shared = fetch.await.map(Arc::new);

            {
                let mut inner = inner_arc.lock().unwrap();
                let current = inner.generations.get(&key).copied().unwrap_or(0);
                match &shared {
                    Ok(records) if current == generation => {
                        inner.entries.insert(
                            key.clone(),
                            CachedSet { records: Arc::clone(records), fetched_at: Instant::now() },
                        );
                    }
                    Ok(_) => {
                        log::debug!("stale response discarded: screen={}", key.screen);
                    }
                    Err(err) => {
                        metrics.record_error();
                        log::warn!("fetch failed: screen={} error={}", key.screen, err);
                    }
                }
                let still_ours = inner
                    .in_flight
                    .get(&key)
                    .map(|f| f.generation == generation)
                    .unwrap_or(false);
                if still_ours {
                    inner.in_flight.remove(&key);
                }
            }

            let _ = tx.send(FetchState::Done(shared));
        });

        rx
    }

    async fn wait_done(mut rx: watch::Receiver<FetchState<T>>) -> ApiResult<Arc<Vec<T>>> {
        loop {
            if let FetchState::Done(result) = &*rx.borrow() {
                return result.clone();
            }
            if rx.changed().await.is_err() {
                return Err(ApiError::fetch_failed("fetch task dropped"));
            }
        }
    }

    // ==================== INVALIDATION ====================

    pub fn invalidate(&self, key: &ListKey) {
        let mut inner = self.inner.lock().unwrap();
        inner.invalidate_key(key);
    }

    pub fn invalidate_screen(&self, screen: ScreenId) {
        let mut inner = self.inner.lock().unwrap();
        for key in inner.screen_keys(screen) {
            inner.invalidate_key(&key);
        }
    }

    /// Выметает записи, пережившие срок хранения
    pub fn purge_expired(&self) {
        let mut inner = self.inner.lock().unwrap();
        let gc_after = self.config.gc_after;
        inner.entries.retain(|_, entry| entry.fetched_at.elapsed() < gc_after);
    }

    // ==================== LOCAL MUTATIONS ====================

    /// Локальная правка одного набора; свежесть записи не меняется
    pub fn patch(&self, key: &ListKey, mutation: &ListMutation<T>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.records = Arc::new(apply_mutation(&entry.records, mutation));
        }
    }

    /// Правка всех кэшированных наборов экрана: после удаления или
    /// обновления записи каждый вариант (filter, search) остаётся связным
    pub fn patch_screen(&self, screen: ScreenId, mutation: &ListMutation<T>) {
        let mut inner = self.inner.lock().unwrap();
        for (key, entry) in inner.entries.iter_mut() {
            if key.screen == screen {
                entry.records = Arc::new(apply_mutation(&entry.records, mutation));
            }
        }
    }
}

impl<T> Default for QueryCache<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

// ==================== ТЕСТЫ ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        label: String,
    }

    impl Record for Item {
        fn record_id(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str) -> Item {
        Item { id: id.to_string(), label: format!("item {}", id) }
    }

    fn unfiltered_key() -> ListKey {
        ListKey::new(ScreenId::AdminReservations, ListQuery::default())
    }

    fn ready_fetch(items: Vec<Item>, calls: Arc<AtomicUsize>) -> BoxFuture<'static, ApiResult<Vec<Item>>> {
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(items)
        })
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_coalesced() {
        let cache = QueryCache::<Item>::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = unfiltered_key();

        let (a, b) = tokio::join!(
            cache.fetch_with(key.clone(), ready_fetch(vec![item("1")], Arc::clone(&calls))),
            cache.fetch_with(key.clone(), ready_fetch(vec![item("1")], Arc::clone(&calls))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(cache.metrics().snapshot().coalesced, 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_served_without_refetch() {
        let cache = QueryCache::<Item>::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = unfiltered_key();

        cache
            .fetch_with(key.clone(), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();
        cache
            .fetch_with(key.clone(), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics().snapshot().hits, 1);
    }

    #[tokio::test]
    async fn test_changed_filter_produces_new_key_and_refetch() {
        let cache = QueryCache::<Item>::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let screen = ScreenId::AdminReservations;

        cache
            .fetch_with(cache.current_key(screen), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();

        let mut patch = FilterMap::new();
        patch.insert("hotel_name".to_string(), FilterValue::string("Hilton"));
        cache.set_filter(screen, patch);

        cache
            .fetch_with(cache.current_key(screen), ready_fetch(vec![item("2")], Arc::clone(&calls)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidated_key_discards_in_flight_result() {
        let cache = Arc::new(QueryCache::<Item>::default());
        let key = unfiltered_key();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow: BoxFuture<'static, ApiResult<Vec<Item>>> = Box::pin(async move {
            let _ = release_rx.await;
            Ok(vec![item("old")])
        });

        let fetcher = Arc::clone(&cache);
        let fetch_key = key.clone();
        let handle = tokio::spawn(async move { fetcher.fetch_with(fetch_key, slow).await });

        // даём задаче встать в полёт, затем инвалидируем ключ
        tokio::task::yield_now().await;
        cache.invalidate(&key);
        release_tx.send(()).unwrap();

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.len(), 1);
        // ожидавший получил данные, но в кэш устаревший ответ не попал
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_entry() {
        let cache = QueryCache::<Item>::new(CacheConfig {
            stale_after: Duration::from_secs(0),
            gc_after: Duration::from_secs(300),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let key = unfiltered_key();

        cache
            .fetch_with(key.clone(), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();

        let failing: BoxFuture<'static, ApiResult<Vec<Item>>> =
            Box::pin(async { Err(ApiError::fetch_failed("boom")) });
        let result = cache.fetch_with(key.clone(), failing).await;

        assert!(result.is_err());
        assert_eq!(cache.get(&key).unwrap().len(), 1);
        assert_eq!(cache.metrics().snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_reset_filter_invalidates_screen_entries() {
        let cache = QueryCache::<Item>::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let screen = ScreenId::AdminReservations;

        let mut patch = FilterMap::new();
        patch.insert("hotel_name".to_string(), FilterValue::string("Hilton"));
        cache.set_filter(screen, patch);

        cache
            .fetch_with(cache.current_key(screen), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(cache.entry_count(), 1);

        cache.reset_filter(screen);
        assert_eq!(cache.entry_count(), 0);
        assert!(cache.filter(screen).is_empty());
    }

    #[tokio::test]
    async fn test_patch_screen_touches_all_variants() {
        let cache = QueryCache::<Item>::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let screen = ScreenId::AdminReservations;

        cache
            .fetch_with(cache.current_key(screen), ready_fetch(vec![item("1"), item("2")], Arc::clone(&calls)))
            .await
            .unwrap();

        let mut patch = FilterMap::new();
        patch.insert("hotel_name".to_string(), FilterValue::string("Hilton"));
        cache.set_filter(screen, patch);
        cache
            .fetch_with(cache.current_key(screen), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();

        cache.patch_screen(screen, &ListMutation::Removed { id: "1".to_string() });

        let filtered = cache.get(&cache.current_key(screen)).unwrap();
        assert!(filtered.iter().all(|r| r.id != "1"));

        let unfiltered = cache.get(&unfiltered_key()).unwrap();
        assert_eq!(unfiltered.len(), 1);
        assert_eq!(unfiltered[0].id, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_sweeps_old_entries() {
        let cache = QueryCache::<Item>::new(CacheConfig {
            stale_after: Duration::from_secs(60),
            gc_after: Duration::from_secs(300),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let key = unfiltered_key();

        cache
            .fetch_with(key.clone(), ready_fetch(vec![item("1")], Arc::clone(&calls)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        cache.purge_expired();
        assert_eq!(cache.entry_count(), 0);
    }
}
