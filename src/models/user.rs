// src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::Gender;
use super::Record;
use crate::auth::UserRole;

// ==================== USER ====================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub gender: Gender,
    pub address_city: String,
    pub address_country: String,
    pub user_type: UserRole,
    /// Пароль мок-API хранит открытым текстом; слой данных трактует
    /// его как непрозрачную строку и нигде не интерпретирует
    pub password: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserRole::Admin
    }
}

impl Record for User {
    fn record_id(&self) -> &str {
        &self.id
    }
}

// ==================== REQUEST DTO ====================

/// Запрос регистрации: роль в нём отсутствует и всегда назначается
/// сервером как User
#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct SignUpRequest {
    #[validate(length(min = 3, message = "Name must be more than 3 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(regex(path = *crate::validator::PHONE_REGEX, message = "Invalid phone number format"))]
    pub phone_number: String,

    pub gender: Gender,

    #[validate(length(min = 3, message = "City must be more than 3 characters"))]
    pub address_city: String,

    #[validate(length(min = 3, message = "Country must be more than 3 characters"))]
    pub address_country: String,

    #[validate(length(min = 6, max = 20, message = "Password must be between 6 and 20 characters"))]
    pub password: String,

    pub avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate, Clone, PartialEq)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, message = "Name must be more than 3 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(email(message = "Please enter a valid email address"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[validate(regex(path = *crate::validator::PHONE_REGEX, message = "Invalid phone number format"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_country: Option<String>,

    #[validate(length(min = 6, max = 20, message = "Password must be between 6 and 20 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UpdateUserRequest {
    /// Diff-пакет профиля: только реально изменённые поля.
    /// Роль намеренно не входит - она не редактируется пользователем.
    pub fn diff(current: &User, submitted: &SignUpRequest) -> Self {
        let mut payload = UpdateUserRequest::default();

        if submitted.name != current.name {
            payload.name = Some(submitted.name.clone());
        }
        if submitted.email != current.email {
            payload.email = Some(submitted.email.clone());
        }
        if submitted.phone_number != current.phone_number {
            payload.phone_number = Some(submitted.phone_number.clone());
        }
        if submitted.gender != current.gender {
            payload.gender = Some(submitted.gender);
        }
        if submitted.address_city != current.address_city {
            payload.address_city = Some(submitted.address_city.clone());
        }
        if submitted.address_country != current.address_country {
            payload.address_country = Some(submitted.address_country.clone());
        }
        if submitted.password != current.password {
            payload.password = Some(submitted.password.clone());
        }
        if submitted.avatar != current.avatar {
            payload.avatar = submitted.avatar.clone();
        }

        payload
    }

    pub fn is_empty(&self) -> bool {
        *self == UpdateUserRequest::default()
    }

    pub fn apply_to(&self, record: &mut User) {
        if let Some(ref name) = self.name {
            record.name = name.clone();
        }
        if let Some(ref email) = self.email {
            record.email = email.clone();
        }
        if let Some(ref phone_number) = self.phone_number {
            record.phone_number = phone_number.clone();
        }
        if let Some(gender) = self.gender {
            record.gender = gender;
        }
        if let Some(ref address_city) = self.address_city {
            record.address_city = address_city.clone();
        }
        if let Some(ref address_country) = self.address_country {
            record.address_country = address_country.clone();
        }
        if let Some(ref password) = self.password {
            record.password = password.clone();
        }
        if let Some(ref avatar) = self.avatar {
            record.avatar = Some(avatar.clone());
        }
    }
}

// ==================== ТЕСТЫ ====================
