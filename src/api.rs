// src/api.rs
//! Контракты внешних коллабораторов
//!
//! Слой данных не знает о транспорте: REST-бэкенд, мок или память -
//! всё внедряется через эти трейты.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::filter::ListQuery;
use crate::models::User;

/// Источник полного (непагинированного) набора записей по запросу.
/// Ошибки обязаны приходить как Err, а не как пустой набор-сигнал.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    async fn fetch_all(&self, query: &ListQuery) -> ApiResult<Vec<T>>;
}

/// CRUD-операции над записью
#[async_trait]
pub trait RecordOps<T>: Send + Sync {
    /// DTO создания записи
    type Create: Send;
    /// Разреженный DTO обновления: только изменённые поля
    type Update: Send;

    async fn create(&self, data: Self::Create) -> ApiResult<T>;

    /// Принимает разреженный пакет и возвращает полную обновлённую
    /// запись - кэш заменяется серверным представлением, не локальным
    async fn update(&self, id: &str, data: Self::Update) -> ApiResult<T>;

    async fn delete(&self, id: &str) -> ApiResult<()>;

    async fn get_by_id(&self, id: &str) -> ApiResult<Option<T>>;
}

/// Поиск профиля по учётным данным (форма логина мок-API:
/// выборка пользователей с совпавшими email и паролем)
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn find_by_credentials(&self, email: &str, password: &str) -> ApiResult<Vec<User>>;
}

/// Локально сохранённая копия ответа логина. Шифрование - забота
/// реализации снаружи; здесь это не граница безопасности.
pub trait SessionVault: Send + Sync {
    fn store(&self, user: &User) -> ApiResult<()>;
    fn load(&self) -> Option<User>;
    fn clear(&self);
}
