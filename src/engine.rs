// src/engine.rs
//! Движок списка: выборка по текущей паре (filter, search) и
//! клиентская пагинация поверх кэшированного набора
//!
//! Пагинация целиком на клиенте: сервер отдаёт полный набор, страница -
//! это срез, пересчитываемый при каждом обращении и нигде не хранимый.
//! Номер текущей страницы - локальное состояние экземпляра движка; при
//! сжатии набора он по умолчанию не подрезается.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::api::ListSource;
use crate::cache::{ListKey, QueryCache, ScreenId};
use crate::error::ApiResult;
use crate::filter::ListQuery;
use crate::models::Record;

// ==================== CONFIG ====================

#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Размер страницы
    pub page_size: usize,
    /// Дополнительные попытки выборки после неудачной
    pub retry_budget: u32,
    /// Подрезать ли текущую страницу при сжатии набора
    pub clamp_pages: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self { page_size: 5, retry_budget: 1, clamp_pages: false }
    }
}

// ==================== LOAD STATE ====================

/// Состояние загрузки для индикатора в UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

// ==================== PAGE VIEW ====================

/// Страница - производное представление набора; живёт один рендер
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn empty(page_number: usize) -> Self {
        Self { items: Vec::new(), page_number, total_pages: 0, total_items: 0 }
    }
}

// ==================== LIST ENGINE ====================

pub struct ListEngine<T> {
    screen: ScreenId,
    cache: Arc<QueryCache<T>>,
    source: Arc<dyn ListSource<T>>,
    config: ListConfig,
    /// Номер страницы, с единицы
    page: AtomicUsize,
    state: Mutex<LoadState>,
}

impl<T> ListEngine<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    pub fn new(
        screen: ScreenId,
        cache: Arc<QueryCache<T>>,
        source: Arc<dyn ListSource<T>>,
        config: ListConfig,
    ) -> Self {
        Self {
            screen,
            cache,
            source,
            config,
            page: AtomicUsize::new(1),
            state: Mutex::new(LoadState::Idle),
        }
    }

    pub fn screen(&self) -> ScreenId {
        self.screen
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.state.lock().unwrap().clone()
    }

    fn set_state(&self, state: LoadState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn current_query(&self) -> ListQuery {
        self.cache.current_query(self.screen)
    }

    pub fn current_key(&self) -> ListKey {
        self.cache.current_key(self.screen)
    }

    // ==================== FETCH ====================

    /// Выборка под текущим ключом. На различающийся ключ уходит ровно
    /// один запрос; параллельные вызовы присоединяются к летящему.
    /// Бюджет повторов тратится внутри общей задачи, поэтому
    /// присоединившиеся делят и повторы.
    pub async fn refresh(&self) -> ApiResult<Arc<Vec<T>>> {
        let query = self.current_query();
        let key = ListKey::new(self.screen, query.clone());

        self.set_state(LoadState::Loading);

        let source = Arc::clone(&self.source);
        let budget = self.config.retry_budget;
        let fetch: BoxFuture<'static, ApiResult<Vec<T>>> = Box::pin(async move {
            let mut attempt: u32 = 0;
            loop {
                match source.fetch_all(&query).await {
                    Ok(records) => return Ok(records),
                    Err(err) if err.is_retriable() && attempt < budget => {
                        attempt += 1;
                        log::warn!("fetch attempt {} failed, retrying: {}", attempt, err);
                    }
                    Err(err) => return Err(err),
                }
            }
        });

        match self.cache.fetch_with(key, fetch).await {
            Ok(records) => {
                self.set_state(LoadState::Ready);
                Ok(records)
            }
            Err(err) => {
                // предыдущий набор остаётся в кэше и продолжает отображаться
                self.set_state(LoadState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Кэшированный набор текущего ключа, если он есть
    pub fn result_set(&self) -> Option<Arc<Vec<T>>> {
        self.cache.get(&self.current_key())
    }

    // ==================== PAGINATION ====================

    pub fn current_page(&self) -> usize {
        self.page.load(Ordering::Relaxed)
    }

    pub fn total_pages(&self) -> usize {
        let total_items = self.result_set().map(|r| r.len()).unwrap_or(0);
        Self::pages_for(total_items, self.config.page_size)
    }

    fn pages_for(total_items: usize, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        (total_items + page_size - 1) / page_size
    }

    /// Выбор страницы вне [1, total_pages] - no-op (кнопки на границах
    /// выключены, но и прямой вызов ничего не ломает)
    pub fn set_page(&self, page_number: usize) {
        let total_pages = self.total_pages();
        if page_number >= 1 && page_number <= total_pages {
            self.page.store(page_number, Ordering::Relaxed);
        }
    }

    pub fn next_page(&self) {
        self.set_page(self.current_page() + 1);
    }

    pub fn prev_page(&self) {
        let current = self.current_page();
        if current > 1 {
            self.set_page(current - 1);
        }
    }

    pub fn reset_page(&self) {
        self.page.store(1, Ordering::Relaxed);
    }

    /// Срез текущей страницы; пересчитывается при каждом вызове
    pub fn page_view(&self) -> Page<T> {
        let Some(records) = self.result_set() else {
            return Page::empty(self.current_page());
        };

        let total_items = records.len();
        let total_pages = Self::pages_for(total_items, self.config.page_size);

        let mut page_number = self.current_page();
        if self.config.clamp_pages && total_pages > 0 && page_number > total_pages {
            page_number = total_pages;
            self.page.store(page_number, Ordering::Relaxed);
        }

        let start = (page_number - 1).saturating_mul(self.config.page_size);
        let end = start.saturating_add(self.config.page_size).min(total_items);
        let items = if start < total_items {
            records[start..end].to_vec()
        } else {
            Vec::new()
        };

        Page { items, page_number, total_pages, total_items }
    }
}

// ==================== ТЕСТЫ ====================
