// src/memory.rs
//! Бэкенд в памяти: та же семантика выборки, что у REST-мока
//!
//! Текстовые поля сравниваются подстрокой без учёта регистра, перечисления,
//! даты и числа - точным совпадением; свободный поиск идёт по поисковым
//! полям экрана. Используется тестами и как офлайн/демо-бэкенд.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::api::{ListSource, ProfileSource, RecordOps, SessionVault};
use crate::auth::UserRole;
use crate::error::{ApiError, ApiResult};
use crate::filter::{FilterValue, ListQuery};
use crate::models::{
    CreateReservationRequest, Reservation, SignUpRequest, UpdateReservationRequest,
    UpdateUserRequest, User,
};
use crate::validator::ReservationValidator;

// ==================== MATCH HELPERS ====================

fn text_matches(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn opt_text_matches(haystack: Option<&str>, needle: &str) -> bool {
    haystack.map(|h| text_matches(h, needle)).unwrap_or(false)
}

fn date_matches(actual: NaiveDate, value: &FilterValue) -> bool {
    value.as_date().map(|d| d == actual).unwrap_or(false)
}

// ==================== MEMORY STORE ====================

pub struct MemoryStore {
    reservations: Mutex<Vec<Reservation>>,
    users: Mutex<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            reservations: Mutex::new(Vec::new()),
            users: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_reservation(&self, reservation: Reservation) {
        self.reservations.lock().unwrap().push(reservation);
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn remove_user(&self, id: &str) {
        self.users.lock().unwrap().retain(|u| u.id != id);
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.lock().unwrap().len()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    // ==================== DEMO SEEDING ====================

    /// Хранилище с демонстрационными данными и учётной записью
    /// администратора; пароль генерируется и выводится в лог
    pub fn with_demo_data(reservation_count: usize) -> Arc<Self> {
        const HOTELS: &[&str] = &[
            "Hilton", "Marriott", "Four Seasons", "Steigenberger", "Kempinski",
        ];
        const CITIES: &[(&str, &str)] = &[
            ("Cairo", "Egypt"),
            ("Alexandria", "Egypt"),
            ("Berlin", "Germany"),
            ("Vienna", "Austria"),
        ];

        let store = Arc::new(Self::new());
        let mut rng = thread_rng();

        let admin_password: String = (0..12)
            .map(|_| rng.sample(Alphanumeric) as char)
            .collect();
        let admin = User {
            id: Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            email: "admin@hms.local".to_string(),
            phone_number: "01000000000".to_string(),
            gender: crate::models::Gender::Male,
            address_city: "Cairo".to_string(),
            address_country: "Egypt".to_string(),
            user_type: UserRole::Admin,
            password: admin_password.clone(),
            avatar: None,
            created_at: Utc::now(),
        };
        log::warn!("Demo admin account created:");
        log::warn!("  Email: {}", admin.email);
        log::warn!("  Password: {} (generated for this run)", admin_password);
        store.insert_user(admin);

        for n in 0..reservation_count {
            let (city, country) = CITIES[rng.gen_range(0..CITIES.len())];
            let guest = User {
                id: Uuid::new_v4().to_string(),
                name: format!("Guest {}", n + 1),
                email: format!("guest{}@example.com", n + 1),
                phone_number: format!("010{:08}", n + 1),
                gender: if rng.gen_bool(0.5) {
                    crate::models::Gender::Male
                } else {
                    crate::models::Gender::Female
                },
                address_city: city.to_string(),
                address_country: country.to_string(),
                user_type: UserRole::User,
                password: "p4ss@word".to_string(),
                avatar: None,
                created_at: Utc::now(),
            };

            let statuses = [
                crate::models::ReservationStatus::Pending,
                crate::models::ReservationStatus::Approved,
                crate::models::ReservationStatus::Cancelled,
            ];
            let rooms = [
                crate::models::RoomType::Single,
                crate::models::RoomType::Double,
                crate::models::RoomType::Triple,
                crate::models::RoomType::Suite,
            ];
            let check_in = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                + ChronoDuration::days(rng.gen_range(0..365));
            let nights = rng.gen_range(1..=7);
            let reservation = Reservation {
                id: Uuid::new_v4().to_string(),
                user_id: guest.id.clone(),
                name: Some(guest.name.clone()),
                hotel_name: HOTELS[rng.gen_range(0..HOTELS.len())].to_string(),
                check_in,
                check_out: check_in + ChronoDuration::days(nights),
                reservation_status: statuses[rng.gen_range(0..statuses.len())],
                room_type: rooms[rng.gen_range(0..rooms.len())],
                guests: rng.gen_range(1..=3),
            };

            store.insert_user(guest);
            store.insert_reservation(reservation);
        }

        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== RESERVATION API ====================

pub struct MemoryReservationApi {
    store: Arc<MemoryStore>,
}

impl MemoryReservationApi {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn matches(reservation: &Reservation, query: &ListQuery) -> bool {
        for (field, value) in &query.filter {
            let ok = match field.as_str() {
                "hotel_name" => value
                    .as_str()
                    .map(|v| text_matches(&reservation.hotel_name, v))
                    .unwrap_or(false),
                "name" => value
                    .as_str()
                    .map(|v| opt_text_matches(reservation.name.as_deref(), v))
                    .unwrap_or(false),
                "user_id" => value
                    .as_str()
                    .map(|v| reservation.user_id == v)
                    .unwrap_or(false),
                "check_in" => date_matches(reservation.check_in, value),
                "check_out" => date_matches(reservation.check_out, value),
                "reservation_status" => value
                    .as_str()
                    .and_then(crate::models::ReservationStatus::from_str)
                    .map(|s| s == reservation.reservation_status)
                    .unwrap_or(false),
                "room_type" => value
                    .as_str()
                    .and_then(crate::models::RoomType::from_str)
                    .map(|r| r == reservation.room_type)
                    .unwrap_or(false),
                "guests" => value
                    .as_integer()
                    .map(|g| g == i64::from(reservation.guests))
                    .unwrap_or(false),
                // неизвестный параметр мок игнорирует
                _ => true,
            };
            if !ok {
                return false;
            }
        }

        if let Some(ref needle) = query.search {
            return text_matches(&reservation.hotel_name, needle)
                || opt_text_matches(reservation.name.as_deref(), needle);
        }

        true
    }
}

#[async_trait]
impl ListSource<Reservation> for MemoryReservationApi {
    async fn fetch_all(&self, query: &ListQuery) -> ApiResult<Vec<Reservation>> {
        let reservations = self.store.reservations.lock().unwrap();
        Ok(reservations
            .iter()
            .filter(|r| Self::matches(r, query))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecordOps<Reservation> for MemoryReservationApi {
    type Create = CreateReservationRequest;
    type Update = UpdateReservationRequest;

    async fn create(&self, data: CreateReservationRequest) -> ApiResult<Reservation> {
        validator::Validate::validate(&data)?;
        let check = ReservationValidator::validate_create(&data);
        if !check.is_valid() {
            return Err(check.to_api_error());
        }

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            user_id: data.user_id,
            name: data.name,
            hotel_name: data.hotel_name,
            check_in: data.check_in,
            check_out: data.check_out,
            reservation_status: data.reservation_status,
            room_type: data.room_type,
            guests: data.guests,
        };
        self.store.reservations.lock().unwrap().push(reservation.clone());
        Ok(reservation)
    }

    async fn update(&self, id: &str, data: UpdateReservationRequest) -> ApiResult<Reservation> {
        validator::Validate::validate(&data)?;
        let mut reservations = self.store.reservations.lock().unwrap();
        let record = reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::reservation_not_found(id))?;

        data.apply_to(record);

        let stay = ReservationValidator::validate_stay(record.check_in, record.check_out);
        if !stay.is_valid() {
            return Err(stay.to_api_error());
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let mut reservations = self.store.reservations.lock().unwrap();
        let before = reservations.len();
        reservations.retain(|r| r.id != id);
        if reservations.len() == before {
            return Err(ApiError::reservation_not_found(id));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> ApiResult<Option<Reservation>> {
        let reservations = self.store.reservations.lock().unwrap();
        Ok(reservations.iter().find(|r| r.id == id).cloned())
    }
}

// ==================== USER API ====================

pub struct MemoryUserApi {
    store: Arc<MemoryStore>,
}

impl MemoryUserApi {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn matches(user: &User, query: &ListQuery) -> bool {
        for (field, value) in &query.filter {
            let ok = match field.as_str() {
                "name" => value
                    .as_str()
                    .map(|v| text_matches(&user.name, v))
                    .unwrap_or(false),
                "email" => value
                    .as_str()
                    .map(|v| text_matches(&user.email, v))
                    .unwrap_or(false),
                "phone_number" => value
                    .as_str()
                    .map(|v| text_matches(&user.phone_number, v))
                    .unwrap_or(false),
                "address_city" => value
                    .as_str()
                    .map(|v| text_matches(&user.address_city, v))
                    .unwrap_or(false),
                "address_country" => value
                    .as_str()
                    .map(|v| text_matches(&user.address_country, v))
                    .unwrap_or(false),
                "gender" => value
                    .as_str()
                    .and_then(crate::models::Gender::from_str)
                    .map(|g| g == user.gender)
                    .unwrap_or(false),
                "user_type" => value
                    .as_str()
                    .and_then(UserRole::from_str)
                    .map(|r| r == user.user_type)
                    .unwrap_or(false),
                _ => true,
            };
            if !ok {
                return false;
            }
        }

        if let Some(ref needle) = query.search {
            return text_matches(&user.name, needle) || text_matches(&user.email, needle);
        }

        true
    }
}

#[async_trait]
impl ListSource<User> for MemoryUserApi {
    async fn fetch_all(&self, query: &ListQuery) -> ApiResult<Vec<User>> {
        let users = self.store.users.lock().unwrap();
        Ok(users.iter().filter(|u| Self::matches(u, query)).cloned().collect())
    }
}

#[async_trait]
impl RecordOps<User> for MemoryUserApi {
    type Create = SignUpRequest;
    type Update = UpdateUserRequest;

    /// Роль всегда назначается здесь и всегда User; запрос её не несёт
    async fn create(&self, data: SignUpRequest) -> ApiResult<User> {
        validator::Validate::validate(&data)?;

        let mut users = self.store.users.lock().unwrap();
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&data.email)) {
            return Err(ApiError::email_already_registered(&data.email));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: data.name,
            email: data.email,
            phone_number: data.phone_number,
            gender: data.gender,
            address_city: data.address_city,
            address_country: data.address_country,
            user_type: UserRole::User,
            password: data.password,
            avatar: data.avatar,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: &str, data: UpdateUserRequest) -> ApiResult<User> {
        validator::Validate::validate(&data)?;
        let mut users = self.store.users.lock().unwrap();
        let record = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ApiError::user_not_found(id))?;

        data.apply_to(record);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let mut users = self.store.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(ApiError::user_not_found(id));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> ApiResult<Option<User>> {
        let users = self.store.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl ProfileSource for MemoryUserApi {
    async fn find_by_credentials(&self, email: &str, password: &str) -> ApiResult<Vec<User>> {
        let users = self.store.users.lock().unwrap();
        Ok(users
            .iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
            .cloned()
            .collect())
    }
}

// ==================== SESSION VAULT ====================

/// Хранилище сессии в памяти; в приложении его место занимает
/// шифрованная копия в локальном хранилище
#[derive(Default)]
pub struct MemorySessionVault {
    slot: Mutex<Option<User>>,
}

impl SessionVault for MemorySessionVault {
    fn store(&self, user: &User) -> ApiResult<()> {
        *self.slot.lock().unwrap() = Some(user.clone());
        Ok(())
    }

    fn load(&self) -> Option<User> {
        self.slot.lock().unwrap().clone()
    }

    fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

// ==================== ТЕСТЫ ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMap;
    use crate::models::ReservationStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reservation(id: &str, hotel: &str, owner: &str, status: ReservationStatus) -> Reservation {
        Reservation {
            id: id.to_string(),
            user_id: format!("u-{}", id),
            name: Some(owner.to_string()),
            hotel_name: hotel.to_string(),
            check_in: date(2025, 3, 10),
            check_out: date(2025, 3, 12),
            reservation_status: status,
            room_type: crate::models::RoomType::Double,
            guests: 2,
        }
    }

    fn seeded_api() -> (Arc<MemoryStore>, MemoryReservationApi) {
        let store = Arc::new(MemoryStore::new());
        store.insert_reservation(reservation("1", "Hilton", "Jane Smith", ReservationStatus::Pending));
        store.insert_reservation(reservation("2", "Hilton Garden", "Omar Ali", ReservationStatus::Approved));
        store.insert_reservation(reservation("3", "Marriott", "Jane Roe", ReservationStatus::Pending));
        let api = MemoryReservationApi::new(Arc::clone(&store));
        (store, api)
    }

    #[tokio::test]
    async fn test_text_filter_matches_substring_case_insensitive() {
        let (_store, api) = seeded_api();
        let mut filter = FilterMap::new();
        filter.insert("hotel_name".to_string(), FilterValue::string("hilton"));

        let found = api.fetch_all(&ListQuery::new(filter, None)).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_enum_filter_matches_exactly() {
        let (_store, api) = seeded_api();
        let mut filter = FilterMap::new();
        filter.insert(
            "reservation_status".to_string(),
            FilterValue::string("pending"),
        );

        let found = api.fetch_all(&ListQuery::new(filter, None)).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.reservation_status == ReservationStatus::Pending));
    }

    #[tokio::test]
    async fn test_search_covers_hotel_and_owner_name() {
        let (_store, api) = seeded_api();

        let by_owner = api
            .fetch_all(&ListQuery::new(FilterMap::new(), Some("jane".to_string())))
            .await
            .unwrap();
        assert_eq!(by_owner.len(), 2);

        let by_hotel = api
            .fetch_all(&ListQuery::new(FilterMap::new(), Some("marriott".to_string())))
            .await
            .unwrap();
        assert_eq!(by_hotel.len(), 1);
    }

    #[tokio::test]
    async fn test_create_validates_stay_dates() {
        let (_store, api) = seeded_api();
        let request = CreateReservationRequest {
            user_id: "u-9".to_string(),
            hotel_name: "Hilton".to_string(),
            check_in: date(2025, 3, 10),
            check_out: date(2025, 3, 10),
            reservation_status: ReservationStatus::Pending,
            room_type: crate::models::RoomType::Single,
            guests: 1,
            name: None,
        };

        let err = api.create(request).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_update_returns_full_record() {
        let (_store, api) = seeded_api();
        let payload = UpdateReservationRequest {
            guests: Some(3),
            ..Default::default()
        };

        let updated = api.update("1", payload).await.unwrap();
        assert_eq!(updated.guests, 3);
        assert_eq!(updated.hotel_name, "Hilton");
    }

    #[tokio::test]
    async fn test_update_rejects_inverted_dates() {
        let (_store, api) = seeded_api();
        let payload = UpdateReservationRequest {
            check_out: Some(date(2025, 3, 9)),
            ..Default::default()
        };

        let err = api.update("1", payload).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let (store, api) = seeded_api();
        api.delete("1").await.unwrap();
        assert_eq!(store.reservation_count(), 2);

        let err = api.delete("1").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_signup_uniqueness_and_forced_role() {
        let store = Arc::new(MemoryStore::new());
        let api = MemoryUserApi::new(Arc::clone(&store));
        let request = SignUpRequest {
            name: "Jane Roe".to_string(),
            email: "jane@example.com".to_string(),
            phone_number: "01234567890".to_string(),
            gender: crate::models::Gender::Female,
            address_city: "Cairo".to_string(),
            address_country: "Egypt".to_string(),
            password: "p4ss@word".to_string(),
            avatar: None,
        };

        let user = api.create(request.clone()).await.unwrap();
        assert_eq!(user.user_type, UserRole::User);

        let err = api.create(request).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_demo_data_seeds_admin_and_reservations() {
        let store = MemoryStore::with_demo_data(8);
        assert_eq!(store.reservation_count(), 8);
        // администратор плюс по гостю на бронь
        assert_eq!(store.user_count(), 9);

        let api = MemoryUserApi::new(Arc::clone(&store));
        let admins = api
            .find_by_credentials("admin@hms.local", "wrong-password")
            .await
            .unwrap();
        assert!(admins.is_empty());
    }
}
