// src/actions.rs
//! Действия над строкой списка и чистые редьюсеры кэша
//!
//! Мутация кэшированного набора выражена как чистая функция
//! `(старый набор, событие) -> новый набор`, чтобы её можно было
//! проверять без кэша и без сети.

use std::sync::{Arc, Mutex};

use crate::api::RecordOps;
use crate::cache::{QueryCache, ScreenId};
use crate::error::{ApiError, ApiResult};
use crate::models::Record;

// ==================== LIST MUTATIONS ====================

/// Событие локальной мутации кэшированного набора
#[derive(Debug, Clone)]
pub enum ListMutation<T> {
    /// Удаление по идентификатору; отсутствующая запись - no-op
    Removed { id: String },
    /// Замена записи серверным представлением по идентификатору
    Replaced { record: T },
    /// Добавление новой записи в конец набора
    Inserted { record: T },
}

/// Чистый редьюсер набора результатов
pub fn apply_mutation<T>(old: &[T], mutation: &ListMutation<T>) -> Vec<T>
where
    T: Record + Clone,
{
    match mutation {
        ListMutation::Removed { id } => {
            old.iter().filter(|r| r.record_id() != id).cloned().collect()
        }
        ListMutation::Replaced { record } => old
            .iter()
            .map(|r| {
                if r.record_id() == record.record_id() {
                    record.clone()
                } else {
                    r.clone()
                }
            })
            .collect(),
        ListMutation::Inserted { record } => {
            let mut next: Vec<T> = old.to_vec();
            next.push(record.clone());
            next
        }
    }
}

// ==================== CONFIRM STATE MACHINE ====================

/// Двухфазное подтверждение действия строки:
/// Idle -> ConfirmOpen -> Committing -> (Idle | ConfirmOpen)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmState {
    Idle,
    ConfirmOpen,
    Committing,
}

impl ConfirmState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConfirmState::Idle)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConfirmState::ConfirmOpen)
    }

    pub fn is_committing(&self) -> bool {
        matches!(self, ConfirmState::Committing)
    }
}

// ==================== ROW ACTIONS ====================

/// Действия строки: удаление с подтверждением и обновление.
/// На успех кэш правится локально, без повторного запроса; на ошибку
/// кэш остаётся нетронутым.
pub struct RowActions<T, O>
where
    O: RecordOps<T>,
{
    screen: ScreenId,
    cache: Arc<QueryCache<T>>,
    ops: Arc<O>,
    confirm: Mutex<ConfirmState>,
}

impl<T, O> RowActions<T, O>
where
    T: Record + Clone + Send + Sync + 'static,
    O: RecordOps<T>,
{
    pub fn new(screen: ScreenId, cache: Arc<QueryCache<T>>, ops: Arc<O>) -> Self {
        Self { screen, cache, ops, confirm: Mutex::new(ConfirmState::Idle) }
    }

    pub fn confirm_state(&self) -> ConfirmState {
        *self.confirm.lock().unwrap()
    }

    /// Открывает подтверждение; действует только из Idle
    pub fn open_confirm(&self) {
        let mut state = self.confirm.lock().unwrap();
        if state.is_idle() {
            *state = ConfirmState::ConfirmOpen;
        }
    }

    /// Закрытие без фиксации возвращает сразу в Idle
    pub fn close_confirm(&self) {
        let mut state = self.confirm.lock().unwrap();
        if state.is_open() {
            *state = ConfirmState::Idle;
        }
    }

    /// Фиксация удаления. Блокируется до явного подтверждения:
    /// вызов вне ConfirmOpen отклоняется.
    pub async fn commit_delete(&self, id: &str) -> ApiResult<()> {
        {
            let mut state = self.confirm.lock().unwrap();
            if !state.is_open() {
                return Err(ApiError::no_pending_confirmation());
            }
            *state = ConfirmState::Committing;
        }

        match self.ops.delete(id).await {
            Ok(()) => {
                self.cache
                    .patch_screen(self.screen, &ListMutation::Removed { id: id.to_string() });
                *self.confirm.lock().unwrap() = ConfirmState::Idle;
                log::info!("deleted record {} on {}", id, self.screen);
                Ok(())
            }
            Err(err) => {
                // кэш не трогаем, диалог остаётся открытым
                *self.confirm.lock().unwrap() = ConfirmState::ConfirmOpen;
                log::warn!("delete failed for {} on {}: {}", id, self.screen, err);
                Err(err)
            }
        }
    }

    /// Обновление разреженным пакетом; кэш заменяется тем, что вернул
    /// сервер, а не локально отправленным diff-ом
    pub async fn submit_update(&self, id: &str, payload: O::Update) -> ApiResult<T> {
        let updated = self.ops.update(id, payload).await?;
        self.cache
            .patch_screen(self.screen, &ListMutation::Replaced { record: updated.clone() });
        log::info!("updated record {} on {}", id, self.screen);
        Ok(updated)
    }

    /// Создание; новая запись дописывается в кэшированные наборы экрана
    pub async fn submit_create(&self, payload: O::Create) -> ApiResult<T> {
        let created = self.ops.create(payload).await?;
        self.cache
            .patch_screen(self.screen, &ListMutation::Inserted { record: created.clone() });
        Ok(created)
    }
}

// ==================== ТЕСТЫ ====================
