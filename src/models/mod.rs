// src/models/mod.rs
//! Модели данных для системы бронирования
//!
//! Включает поддержку:
//! - Перечислений (статус брони, тип номера, пол, роль)
//! - Валидации данных
//! - Сериализации/десериализации

pub mod enums;
pub mod reservation;
pub mod user;

pub use enums::{Gender, ReservationStatus, RoomType};
pub use reservation::{CreateReservationRequest, Reservation, UpdateReservationRequest};
pub use user::{SignUpRequest, UpdateUserRequest, User};

/// Доступ к идентификатору записи для обобщённого движка списков
pub trait Record {
    fn record_id(&self) -> &str;
}
