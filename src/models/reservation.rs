// src/models/reservation.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{ReservationStatus, RoomType};
use super::Record;

// ==================== RESERVATION ====================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    /// Отображаемое имя владельца брони (денормализовано мок-API)
    pub name: Option<String>,
    pub hotel_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub reservation_status: ReservationStatus,
    pub room_type: RoomType,
    pub guests: u32,
}

impl Reservation {
    /// Количество ночей; инвариант данных гарантирует минимум одну
    pub fn stay_nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

impl Record for Reservation {
    fn record_id(&self) -> &str {
        &self.id
    }
}

// ==================== REQUEST DTO ====================

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct CreateReservationRequest {
    pub user_id: String,

    #[validate(length(min = 3, max = 255, message = "Hotel name must be between 3 and 255 characters"))]
    pub hotel_name: String,

    pub check_in: NaiveDate,
    pub check_out: NaiveDate,

    #[serde(default)]
    pub reservation_status: ReservationStatus,

    #[serde(default)]
    pub room_type: RoomType,

    #[validate(range(min = 1, max = 10, message = "Guests must be between 1 and 10"))]
    pub guests: u32,

    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters"))]
    pub name: Option<String>,
}

/// Разреженный запрос обновления: присутствуют только изменённые поля
#[derive(Debug, Default, Deserialize, Serialize, Validate, Clone, PartialEq)]
pub struct UpdateReservationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[validate(length(min = 3, max = 255, message = "Hotel name must be between 3 and 255 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_status: Option<ReservationStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,

    #[validate(range(min = 1, max = 10, message = "Guests must be between 1 and 10"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,

    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UpdateReservationRequest {
    /// Строит diff-пакет: включаются только поля, значение которых
    /// отличается от последнего известного серверного состояния.
    pub fn diff(current: &Reservation, submitted: &CreateReservationRequest) -> Self {
        let mut payload = UpdateReservationRequest::default();

        if submitted.user_id != current.user_id {
            payload.user_id = Some(submitted.user_id.clone());
        }
        if submitted.hotel_name != current.hotel_name {
            payload.hotel_name = Some(submitted.hotel_name.clone());
        }
        if submitted.check_in != current.check_in {
            payload.check_in = Some(submitted.check_in);
        }
        if submitted.check_out != current.check_out {
            payload.check_out = Some(submitted.check_out);
        }
        if submitted.reservation_status != current.reservation_status {
            payload.reservation_status = Some(submitted.reservation_status);
        }
        if submitted.room_type != current.room_type {
            payload.room_type = Some(submitted.room_type);
        }
        if submitted.guests != current.guests {
            payload.guests = Some(submitted.guests);
        }
        if submitted.name != current.name {
            payload.name = submitted.name.clone();
        }

        payload
    }

    /// Пустой diff отправлять не нужно
    pub fn is_empty(&self) -> bool {
        *self == UpdateReservationRequest::default()
    }

    /// Применяет разреженный пакет к записи (серверная сторона контракта)
    pub fn apply_to(&self, record: &mut Reservation) {
        if let Some(ref user_id) = self.user_id {
            record.user_id = user_id.clone();
        }
        if let Some(ref hotel_name) = self.hotel_name {
            record.hotel_name = hotel_name.clone();
        }
        if let Some(check_in) = self.check_in {
            record.check_in = check_in;
        }
        if let Some(check_out) = self.check_out {
            record.check_out = check_out;
        }
        if let Some(status) = self.reservation_status {
            record.reservation_status = status;
        }
        if let Some(room_type) = self.room_type {
            record.room_type = room_type;
        }
        if let Some(guests) = self.guests {
            record.guests = guests;
        }
        if let Some(ref name) = self.name {
            record.name = Some(name.clone());
        }
    }
}

// ==================== ТЕСТЫ ====================
