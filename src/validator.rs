// src/validator.rs - Centralized validation module
use std::collections::HashMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::auth::UserRole;
use crate::error::{ApiError, ApiResult};
use crate::models::enums::ReservationStatus;
use crate::models::{CreateReservationRequest, SignUpRequest};

lazy_static! {
    pub static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\d{11}$").unwrap();
    static ref PASSWORD_LETTER_REGEX: Regex = Regex::new(r"[A-Za-z\u{0600}-\u{06FF}]").unwrap();
    static ref PASSWORD_DIGIT_REGEX: Regex = Regex::new(r"[0-9]").unwrap();
    static ref PASSWORD_SPECIAL_REGEX: Regex = Regex::new(r#"[@&'"*%$]"#).unwrap();
}

// ==================== VALIDATION RESULT ====================

#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    pub errors: HashMap<String, Vec<String>>,
    pub warnings: HashMap<String, Vec<String>>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        for (field, errors) in other.errors {
            self.errors.entry(field).or_default().extend(errors);
        }
        for (field, warnings) in other.warnings {
            self.warnings.entry(field).or_default().extend(warnings);
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let message = self
            .errors
            .iter()
            .map(|(field, errors)| format!("{}: {}", field, errors.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::ValidationError(message)
    }
}

// ==================== FIELD VALIDATORS ====================

pub struct FieldValidator;

impl FieldValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err(format!("{} cannot be empty", field))
        } else {
            Ok(())
        }
    }

    pub fn length(value: &str, field: &str, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
        let len = value.chars().count();

        if let Some(min_len) = min {
            if len < min_len {
                return Err(format!("{} must be at least {} characters", field, min_len));
            }
        }

        if let Some(max_len) = max {
            if len > max_len {
                return Err(format!("{} must not exceed {} characters", field, max_len));
            }
        }

        Ok(())
    }

    pub fn email(value: &str) -> Result<(), String> {
        if EMAIL_REGEX.is_match(value) {
            Ok(())
        } else {
            Err("Please enter a valid email address".to_string())
        }
    }

    pub fn phone(value: &str) -> Result<(), String> {
        if PHONE_REGEX.is_match(value) {
            Ok(())
        } else {
            Err("Invalid phone number format".to_string())
        }
    }
}

// ==================== USER VALIDATION ====================

pub struct UserValidator;

impl UserValidator {
    /// Правила пароля формы регистрации: длина 6-20, хотя бы одна буква,
    /// цифра и спецсимвол из набора @&'"*%$
    pub fn validate_password(password: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(msg) = FieldValidator::length(password, "password", Some(6), Some(20)) {
            result.add_error("password", msg);
        }
        if !PASSWORD_LETTER_REGEX.is_match(password) {
            result.add_error("password", "Password must contain at least one letter");
        }
        if !PASSWORD_DIGIT_REGEX.is_match(password) {
            result.add_error("password", "Password must contain at least one number");
        }
        if !PASSWORD_SPECIAL_REGEX.is_match(password) {
            result.add_error(
                "password",
                "Password must contain at least one special character like @&'\"*%$",
            );
        }

        result
    }

    pub fn validate_sign_up(request: &SignUpRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(msg) = FieldValidator::length(&request.name, "name", Some(3), None) {
            result.add_error("name", msg);
        }
        if let Err(msg) = FieldValidator::email(&request.email) {
            result.add_error("email", msg);
        }
        if let Err(msg) = FieldValidator::phone(&request.phone_number) {
            result.add_error("phone_number", msg);
        }
        if let Err(msg) = FieldValidator::length(&request.address_city, "address_city", Some(3), None) {
            result.add_error("address_city", msg);
        }
        if let Err(msg) = FieldValidator::length(&request.address_country, "address_country", Some(3), None) {
            result.add_error("address_country", msg);
        }
        result.merge(Self::validate_password(&request.password));

        result
    }
}

// ==================== RESERVATION VALIDATION ====================

pub struct ReservationValidator;

impl ReservationValidator {
    /// Выезд минимум на день позже заезда
    pub fn validate_stay(check_in: NaiveDate, check_out: NaiveDate) -> ValidationResult {
        let mut result = ValidationResult::new();
        if (check_out - check_in).num_days() < 1 {
            result.add_error(
                "check_out",
                "Check-out must be at least one day after check-in",
            );
        }
        result
    }

    pub fn validate_create(request: &CreateReservationRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(msg) = FieldValidator::length(&request.hotel_name, "hotel_name", Some(3), Some(255)) {
            result.add_error("hotel_name", msg);
        }
        if request.guests < 1 || request.guests > 10 {
            result.add_error("guests", "Guests must be between 1 and 10");
        }
        result.merge(Self::validate_stay(request.check_in, request.check_out));

        // превышение вместимости номера не блокирует бронь
        if request.guests > request.room_type.max_guests() {
            result.add_warning(
                "guests",
                format!(
                    "{} guests exceed the usual capacity of a {} room",
                    request.guests,
                    request.room_type.display_name()
                ),
            );
        }

        result
    }

    /// Смена статуса сверяется с ролью вызывающего
    pub fn validate_status_change(
        role: UserRole,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> ApiResult<()> {
        if role.can_change_status(from, to) {
            Ok(())
        } else {
            Err(ApiError::status_change_forbidden(from.as_str(), to.as_str()))
        }
    }
}

// ==================== ТЕСТЫ ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{Gender, RoomType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_password_rules() {
        assert!(UserValidator::validate_password("p4ss@word").is_valid());
        assert!(!UserValidator::validate_password("short").is_valid());
        assert!(!UserValidator::validate_password("nodigits@").is_valid());
        assert!(!UserValidator::validate_password("n0special").is_valid());
        assert!(!UserValidator::validate_password("12345@678").is_valid());
    }

    #[test]
    fn test_password_errors_accumulate() {
        let result = UserValidator::validate_password("abc");
        let messages = &result.errors["password"];
        assert!(messages.len() >= 3);
    }

    #[test]
    fn test_stay_requires_at_least_one_night() {
        assert!(ReservationValidator::validate_stay(date(2025, 3, 10), date(2025, 3, 11)).is_valid());
        assert!(!ReservationValidator::validate_stay(date(2025, 3, 10), date(2025, 3, 10)).is_valid());
        assert!(!ReservationValidator::validate_stay(date(2025, 3, 10), date(2025, 3, 9)).is_valid());
    }

    #[test]
    fn test_capacity_overflow_is_warning_not_error() {
        let request = CreateReservationRequest {
            user_id: "u-1".to_string(),
            hotel_name: "Hilton".to_string(),
            check_in: date(2025, 3, 10),
            check_out: date(2025, 3, 12),
            reservation_status: ReservationStatus::Pending,
            room_type: RoomType::Single,
            guests: 3,
            name: None,
        };

        let result = ReservationValidator::validate_create(&request);
        assert!(result.is_valid());
        assert!(result.warnings.contains_key("guests"));
    }

    #[test]
    fn test_status_change_policy() {
        assert!(ReservationValidator::validate_status_change(
            UserRole::User,
            ReservationStatus::Pending,
            ReservationStatus::Cancelled,
        )
        .is_ok());

        let err = ReservationValidator::validate_status_change(
            UserRole::User,
            ReservationStatus::Approved,
            ReservationStatus::Cancelled,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_sign_up_validation_collects_fields() {
        let request = SignUpRequest {
            name: "Jo".to_string(),
            email: "bad".to_string(),
            phone_number: "123".to_string(),
            gender: Gender::Male,
            address_city: "NY".to_string(),
            address_country: "US".to_string(),
            password: "weak".to_string(),
            avatar: None,
        };

        let result = UserValidator::validate_sign_up(&request);
        assert!(!result.is_valid());
        for field in ["name", "email", "phone_number", "address_city", "address_country", "password"] {
            assert!(result.errors.contains_key(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_to_api_error_mentions_field() {
        let mut result = ValidationResult::new();
        result.add_error("email", "Please enter a valid email address");
        let err = result.to_api_error();
        assert!(err.to_string().contains("email"));
    }
}
