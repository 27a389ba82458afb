// src/search.rs
//! Дебаунс поисковой строки
//!
//! Быстрые нажатия схлопываются в одну запись в кэш: внутри окна
//! побеждает только последнее значение, промежуточные отбрасываются,
//! а не ставятся в очередь. Запись меняет ключ выборки и тем самым
//! естественно вызывает повторный запрос.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{QueryCache, ScreenId};
use crate::models::Record;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct SearchInput<T> {
    screen: ScreenId,
    cache: Arc<QueryCache<T>>,
    delay: Duration,
    /// Номер последнего нажатия; устаревшие таймеры его не совпадут
    seq: Arc<AtomicU64>,
}

impl<T> SearchInput<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    pub fn new(screen: ScreenId, cache: Arc<QueryCache<T>>, delay: Duration) -> Self {
        Self { screen, cache, delay, seq: Arc::new(AtomicU64::new(0)) }
    }

    pub fn with_default_delay(screen: ScreenId, cache: Arc<QueryCache<T>>) -> Self {
        Self::new(screen, cache, DEFAULT_DEBOUNCE)
    }

    /// Очередное значение из поля ввода. Запись в кэш произойдёт только
    /// если за окно дебаунса не пришло более нового значения.
    pub fn set(&self, value: &str) {
        let token = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let seq = Arc::clone(&self.seq);
        let cache = Arc::clone(&self.cache);
        let screen = self.screen;
        let delay = self.delay;
        let value = value.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if seq.load(Ordering::SeqCst) == token {
                log::debug!("search applied on {}: {:?}", screen, value);
                cache.set_search(screen, &value);
            }
        });
    }

    /// Немедленный сброс: ожидающие таймеры обесцениваются, слот
    /// очищается и наборы экрана инвалидируются
    pub fn reset(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        self.cache.reset_search(self.screen);
    }
}

// ==================== ТЕСТЫ ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    #[derive(Debug, Clone)]
    struct Item {
        id: String,
    }

    impl Record for Item {
        fn record_id(&self) -> &str {
            &self.id
        }
    }

    fn search_input(delay_ms: u64) -> (Arc<QueryCache<Item>>, SearchInput<Item>) {
        let cache = Arc::new(QueryCache::<Item>::default());
        let input = SearchInput::new(
            ScreenId::Users,
            Arc::clone(&cache),
            Duration::from_millis(delay_ms),
        );
        (cache, input)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ten_rapid_inputs_collapse_to_final_value() {
        let (cache, input) = search_input(500);

        for n in 1..=10 {
            input.set(&format!("query {}", n));
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        // окно ещё не истекло - записей нет
        assert_eq!(cache.search(ScreenId::Users), None);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(cache.search(ScreenId::Users).as_deref(), Some("query 10"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_happens_only_after_full_window() {
        let (cache, input) = search_input(500);

        input.set("smith");
        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(cache.search(ScreenId::Users), None);

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(cache.search(ScreenId::Users).as_deref(), Some("smith"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_write() {
        let (cache, input) = search_input(500);

        cache.set_search(ScreenId::Users, "old");
        input.set("new");
        input.reset();

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(cache.search(ScreenId::Users), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_value_clears_slot() {
        let (cache, input) = search_input(500);

        input.set("smith");
        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(cache.search(ScreenId::Users).as_deref(), Some("smith"));

        input.set("   ");
        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(cache.search(ScreenId::Users), None);
    }
}
