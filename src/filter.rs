// src/filter.rs
//! Состояние фильтров и составной ключ запроса списка
//!
//! Один и тот же набор (filter, search) обязан давать один и тот же ключ
//! кэша, поэтому фильтр хранится в BTreeMap - порядок полей детерминирован
//! и структурное равенство совпадает с равенством сериализованного ключа.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::ScreenId;

// ==================== FILTER VALUE ====================

/// Значение фильтра - типобезопасный контейнер вместо "сырых" строк
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
}

impl FilterValue {
    // Конструкторы
    #[inline] pub fn string(s: impl Into<String>) -> Self { FilterValue::String(s.into()) }
    #[inline] pub fn integer(n: i64) -> Self { FilterValue::Integer(n) }
    #[inline] pub fn boolean(b: bool) -> Self { FilterValue::Boolean(b) }
    #[inline] pub fn date(d: NaiveDate) -> Self { FilterValue::Date(d) }

    /// Пустые значения в фильтр не попадают
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FilterValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FilterValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            FilterValue::String(s) => s.clone(),
            FilterValue::Integer(n) => n.to_string(),
            FilterValue::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            FilterValue::Date(d) => d.to_string(),
        }
    }
}

impl From<String> for FilterValue { fn from(s: String) -> Self { FilterValue::String(s) } }
impl From<&str> for FilterValue { fn from(s: &str) -> Self { FilterValue::String(s.to_string()) } }
impl From<i64> for FilterValue { fn from(n: i64) -> Self { FilterValue::Integer(n) } }
impl From<i32> for FilterValue { fn from(n: i32) -> Self { FilterValue::Integer(n as i64) } }
impl From<u32> for FilterValue { fn from(n: u32) -> Self { FilterValue::Integer(n as i64) } }
impl From<bool> for FilterValue { fn from(b: bool) -> Self { FilterValue::Boolean(b) } }
impl From<NaiveDate> for FilterValue { fn from(d: NaiveDate) -> Self { FilterValue::Date(d) } }

/// Частичный фильтр экрана: поле -> значение
pub type FilterMap = BTreeMap<String, FilterValue>;

// ==================== LIST QUERY ====================

/// Разрешённая пара (filter, search); производная, нигде не хранится
/// дольше обращения и пересчитывается при каждом изменении слотов
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ListQuery {
    pub filter: FilterMap,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn new(filter: FilterMap, search: Option<String>) -> Self {
        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self { filter, search }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filter.is_empty() && self.search.is_none()
    }

    /// Каноничная строковая форма ключа для логов и метрик
    pub fn key_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "<unserializable>".to_string())
    }
}

// ==================== FIELD WHITELIST ====================

/// Белый список полей фильтра на экран; чужие поля отбрасываются,
/// чтобы ключи разных экранов не пересекались
#[derive(Debug, Clone)]
pub struct FilterWhitelist {
    screen: ScreenId,
    fields: HashSet<&'static str>,
}

impl FilterWhitelist {
    fn new(screen: ScreenId, fields: &[&'static str]) -> Self {
        Self { screen, fields: fields.iter().copied().collect() }
    }

    pub fn for_screen(screen: ScreenId) -> Self {
        match screen {
            ScreenId::AdminReservations | ScreenId::MyReservations => Self::new(screen, &[
                "check_in", "check_out", "reservation_status", "room_type",
                "guests", "hotel_name", "name", "user_id",
            ]),
            ScreenId::Users => Self::new(screen, &[
                "name", "gender", "address_city", "address_country",
                "user_type", "email", "phone_number",
            ]),
        }
    }

    pub fn screen(&self) -> ScreenId {
        self.screen
    }

    pub fn is_allowed(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Отбрасывает неизвестные и пустые значения из частичного фильтра
    pub fn sanitize(&self, patch: FilterMap) -> FilterMap {
        patch
            .into_iter()
            .filter(|(field, value)| self.is_allowed(field) && !value.is_empty())
            .collect()
    }
}

// ==================== ТЕСТЫ ====================
