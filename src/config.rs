// src/config.rs - Configuration for the client data layer
//! Конфигурация: TOML-файл, .env и переменные окружения HMS_*
//!
//! Значения по умолчанию повторяют поведение приложения: страница 5,
//! дебаунс 500 мс, один повтор запроса, свежесть 60 с, хранение 300 с.

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::CacheConfig;
use crate::engine::ListConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub list: ListSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    #[serde(default)]
    pub clamp_pages: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,
    #[serde(default = "default_gc_secs")]
    pub gc_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_page_size() -> usize { 5 }
fn default_retry_budget() -> u32 { 1 }
fn default_debounce_ms() -> u64 { 500 }
fn default_stale_secs() -> u64 { 60 }
fn default_gc_secs() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            retry_budget: default_retry_budget(),
            clamp_pages: false,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { stale_secs: default_stale_secs(), gc_secs: default_gc_secs() }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl Config {
    pub fn list_config(&self) -> ListConfig {
        ListConfig {
            page_size: self.list.page_size,
            retry_budget: self.list.retry_budget,
            clamp_pages: self.list.clamp_pages,
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            stale_after: Duration::from_secs(self.cache.stale_secs),
            gc_after: Duration::from_secs(self.cache.gc_secs),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

/// Загрузка: файл (если есть) -> переменные окружения поверх
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    dotenvy::dotenv().ok();

    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(page_size) = env_parse("HMS_PAGE_SIZE") {
        config.list.page_size = page_size;
    }
    if let Some(retry_budget) = env_parse("HMS_RETRY_BUDGET") {
        config.list.retry_budget = retry_budget;
    }
    if let Some(clamp_pages) = env_parse("HMS_CLAMP_PAGES") {
        config.list.clamp_pages = clamp_pages;
    }
    if let Some(debounce_ms) = env_parse("HMS_DEBOUNCE_MS") {
        config.search.debounce_ms = debounce_ms;
    }
    if let Some(stale_secs) = env_parse("HMS_STALE_SECS") {
        config.cache.stale_secs = stale_secs;
    }
    if let Some(gc_secs) = env_parse("HMS_GC_SECS") {
        config.cache.gc_secs = gc_secs;
    }
    if let Ok(level) = env::var("HMS_LOG_LEVEL") {
        config.logging.level = level;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring unparsable {}={}", key, raw);
                None
            }
        },
        Err(_) => None,
    }
}

/// Инициализация подписчика трассировки; повторные вызовы безвредны
pub fn init_logging(config: &LoggingSettings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

// ==================== ТЕСТЫ ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_application_constants() {
        let config = Config::default();
        assert_eq!(config.list.page_size, 5);
        assert_eq!(config.list.retry_budget, 1);
        assert!(!config.list.clamp_pages);
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.cache.stale_secs, 60);
        assert_eq!(config.cache.gc_secs, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        let raw = r#"
            [list]
            page_size = 10

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.list.page_size, 10);
        assert_eq!(config.list.retry_budget, 1);
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_override_wins() {
        env::set_var("HMS_PAGE_SIZE", "7");
        env::set_var("HMS_CLAMP_PAGES", "true");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        env::remove_var("HMS_PAGE_SIZE");
        env::remove_var("HMS_CLAMP_PAGES");

        assert_eq!(config.list.page_size, 7);
        assert!(config.list.clamp_pages);
    }

    #[test]
    fn test_bridges_produce_durations() {
        let config = Config::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.cache_config().stale_after, Duration::from_secs(60));
        assert_eq!(config.list_config().page_size, 5);
    }
}
