// src/models/enums.rs
//! Перечисления доменной модели
//!
//! `from_str` дополнительно принимает числовые коды ("0".."3"),
//! которыми оперирует мок-API, чтобы старые сохранённые ответы
//! оставались читаемыми.

use serde::{Deserialize, Serialize};
use strum::EnumIter;

// ==================== СТАТУС БРОНИ ====================

/// Статус бронирования
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Ожидает подтверждения администратором
    Pending,
    /// Подтверждена - терминальный статус для пользователя
    Approved,
    /// Отменена
    Cancelled,
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" | "0" => Some(ReservationStatus::Pending),
            "approved" | "1" => Some(ReservationStatus::Approved),
            "cancelled" | "2" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    /// Числовой код мок-API
    pub fn code(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "0",
            ReservationStatus::Approved => "1",
            ReservationStatus::Cancelled => "2",
        }
    }

    /// Человекочитаемое название
    pub fn display_name(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Approved => "Approved",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }

    /// Терминальный статус менять нельзя никому, кроме администратора
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Approved | ReservationStatus::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== ТИП НОМЕРА ====================

/// Тип гостиничного номера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Single,
    Double,
    Triple,
    Suite,
}

impl Default for RoomType {
    fn default() -> Self {
        RoomType::Single
    }
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Single => "single",
            RoomType::Double => "double",
            RoomType::Triple => "triple",
            RoomType::Suite => "suite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" | "0" => Some(RoomType::Single),
            "double" | "1" => Some(RoomType::Double),
            "triple" | "2" => Some(RoomType::Triple),
            "suite" | "3" => Some(RoomType::Suite),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RoomType::Single => "0",
            RoomType::Double => "1",
            RoomType::Triple => "2",
            RoomType::Suite => "3",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoomType::Single => "Single",
            RoomType::Double => "Double",
            RoomType::Triple => "Triple",
            RoomType::Suite => "Suite",
        }
    }

    /// Вместимость номера по типу
    pub fn max_guests(&self) -> u32 {
        match self {
            RoomType::Single => 1,
            RoomType::Double => 2,
            RoomType::Triple => 3,
            RoomType::Suite => 10,
        }
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== ПОЛ ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "male" | "0" => Some(Gender::Male),
            "female" | "1" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "0",
            Gender::Female => "1",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== ТЕСТЫ ====================

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_status_roundtrip() {
        for status in ReservationStatus::iter() {
            assert_eq!(ReservationStatus::from_str(status.as_str()), Some(status));
            assert_eq!(ReservationStatus::from_str(status.code()), Some(status));
        }
        assert_eq!(ReservationStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_room_type_roundtrip() {
        for room in RoomType::iter() {
            assert_eq!(RoomType::from_str(room.as_str()), Some(room));
            assert_eq!(RoomType::from_str(room.code()), Some(room));
        }
        assert_eq!(RoomType::from_str("penthouse"), None);
    }

    #[test]
    fn test_defaults_match_form_defaults() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Pending);
        assert_eq!(RoomType::default(), RoomType::Single);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(ReservationStatus::Approved.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ReservationStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let back: ReservationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ReservationStatus::Approved);
    }
}
