use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub seating: SeatingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки Redis; без URL работаем офлайн в памяти
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

// Настройки рассадки уровня процесса; алгоритмические настройки лежат в хранилище
#[derive(Debug, Clone, Deserialize)]
pub struct SeatingConfig {
    pub operator_policy: OperatorPolicy,
}

/// Как серверный оператор отвечает на конфликт с заблокированными креслами
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorPolicy {
    #[default]
    Cancel,
    SecondDay,
    UseBlocked,
    Reorder,
}

impl Config {
    /// Значения по умолчанию, поверх них переменные окружения
    pub fn load() -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "seat_planner=debug,tower_http=debug")?
            .set_default("seating.operator_policy", "cancel")?
            .set_override_option("app.host", env::var("HOST").ok())?
            .set_override_option("app.port", env::var("PORT").ok())?
            .set_override_option("app.environment", env::var("ENVIRONMENT").ok())?
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok().filter(|u| !u.is_empty()))?
            .set_override_option("seating.operator_policy", env::var("OPERATOR_POLICY").ok())?
            .build()?
            .try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app.environment.eq_ignore_ascii_case("production")
    }
}
