// src/auth.rs
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::api::{ProfileSource, RecordOps, SessionVault};
use crate::error::{ApiError, ApiResult};
use crate::models::enums::ReservationStatus;
use crate::models::{SignUpRequest, UpdateUserRequest, User};

// ======== USER ROLE ========

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" | "0" => Some(UserRole::Admin),
            "user" | "1" => Some(UserRole::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::User => "User",
        }
    }

    // ======== USER MANAGEMENT ========
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_view_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    // ======== RESERVATION PERMISSIONS ========
    pub fn can_view_all_reservations(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_create_reservations(&self) -> bool {
        true // All roles can book
    }

    pub fn can_edit_any_reservation(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_delete_reservations(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_approve_reservations(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Status transition policy. Admins may set any status; a regular
    /// user may only cancel a pending reservation. Approved is terminal
    /// from the user's point of view.
    pub fn can_change_status(&self, from: ReservationStatus, to: ReservationStatus) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::User => {
                from == ReservationStatus::Pending && to == ReservationStatus::Cancelled
            }
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ======== AUTH SESSION ========

/// Session manager: sign-up, login, restore from the persisted local
/// copy, logout. The persisted copy is only an optimistic initial value
/// while the real profile is re-fetched; it is not a security boundary.
pub struct AuthSession {
    profile: Arc<dyn ProfileSource>,
    users: Arc<dyn RecordOps<User, Create = SignUpRequest, Update = UpdateUserRequest>>,
    vault: Arc<dyn SessionVault>,
    current: Mutex<Option<User>>,
    retry_budget: u32,
}

impl AuthSession {
    pub fn new(
        profile: Arc<dyn ProfileSource>,
        users: Arc<dyn RecordOps<User, Create = SignUpRequest, Update = UpdateUserRequest>>,
        vault: Arc<dyn SessionVault>,
        retry_budget: u32,
    ) -> Self {
        Self { profile, users, vault, current: Mutex::new(None), retry_budget }
    }

    pub fn current(&self) -> Option<User> {
        self.current.lock().unwrap().clone()
    }

    pub fn role(&self) -> Option<UserRole> {
        self.current().map(|user| user.user_type)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    /// Creates the account and opens a session. The backend assigns the
    /// User role on create; the request carries no role at all.
    pub async fn sign_up(&self, request: SignUpRequest) -> ApiResult<User> {
        validator::Validate::validate(&request)?;
        let password_check = crate::validator::UserValidator::validate_password(&request.password);
        if !password_check.is_valid() {
            return Err(password_check.to_api_error());
        }

        let created = self.users.create(request).await?;
        self.vault.store(&created)?;
        *self.current.lock().unwrap() = Some(created.clone());
        log::info!("signed up user {}", created.id);
        Ok(created)
    }

    /// Credentials lookup against the profile source; the first match
    /// wins, no match means invalid credentials.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let matches = self.profile.find_by_credentials(email, password).await?;
        let user = matches.into_iter().next().ok_or_else(ApiError::invalid_credentials)?;

        self.vault.store(&user)?;
        *self.current.lock().unwrap() = Some(user.clone());
        log::info!("logged in user {}", user.id);
        Ok(user)
    }

    /// Restores the session on startup. The vault copy becomes the
    /// optimistic current user immediately; the profile is then
    /// re-fetched and either confirms the session or clears it.
    /// A failed re-fetch resolves to "no session", not to an error.
    pub async fn restore(&self) -> ApiResult<Option<User>> {
        let Some(stored) = self.vault.load() else {
            return Ok(None);
        };
        *self.current.lock().unwrap() = Some(stored.clone());

        let mut attempt: u32 = 0;
        let refetched = loop {
            match self
                .profile
                .find_by_credentials(&stored.email, &stored.password)
                .await
            {
                Ok(matches) => break Ok(matches),
                Err(err) if err.is_retriable() && attempt < self.retry_budget => {
                    attempt += 1;
                    log::warn!("profile re-fetch attempt {} failed: {}", attempt, err);
                }
                Err(err) => break Err(err),
            }
        };

        match refetched {
            Ok(matches) => match matches.into_iter().next() {
                Some(user) => {
                    self.vault.store(&user)?;
                    *self.current.lock().unwrap() = Some(user.clone());
                    Ok(Some(user))
                }
                None => {
                    self.drop_session();
                    Ok(None)
                }
            },
            Err(err) => {
                log::warn!("session restore failed, clearing stored copy: {}", err);
                self.drop_session();
                Ok(None)
            }
        }
    }

    pub fn logout(&self) {
        self.drop_session();
        log::info!("logged out");
    }

    fn drop_session(&self) {
        self.vault.clear();
        *self.current.lock().unwrap() = None;
    }
}

// ======== TESTS ========
