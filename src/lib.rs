// Client-side data layer for the hotel reservation management app:
// domain models, shared query cache, list/paginate engine, filter and
// search state, row actions and the auth session. Transport is injected
// through the `api` traits; `memory` ships an in-process backend.

pub mod actions;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod memory;
pub mod models;
pub mod search;
pub mod validator;

pub use actions::{apply_mutation, ConfirmState, ListMutation, RowActions};
pub use api::{ListSource, ProfileSource, RecordOps, SessionVault};
pub use auth::{AuthSession, UserRole};
pub use cache::{CacheConfig, ListKey, QueryCache, ScreenId};
pub use config::{init_logging, load_config, Config};
pub use engine::{ListConfig, ListEngine, LoadState, Page};
pub use error::{ApiError, ApiResult};
pub use filter::{FilterMap, FilterValue, FilterWhitelist, ListQuery};
pub use models::{
    CreateReservationRequest, Gender, Record, Reservation, ReservationStatus, RoomType,
    SignUpRequest, UpdateReservationRequest, UpdateUserRequest, User,
};
pub use search::SearchInput;
