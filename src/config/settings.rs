use serde::{Deserialize, Serialize};

use config::{Config, ConfigError, Environment};

/// Параметры ядра pub/sub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Ёмкость буфера каждого канала встроенного брокера.
    pub channel_capacity: usize,
    /// Окно ожидания кооперативной остановки слушателя, мс.
    pub cancel_grace_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("channel_capacity", 128)?
            .set_default("cancel_grace_ms", 100)?
            // Переменные окружения с префиксом VESTNIK_
            .add_source(Environment::with_prefix("VESTNIK"))
            .build()?;

        // Десериализуем конфигурацию в нашу структуру
        cfg.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel_capacity: 128,
            cancel_grace_ms: 100,
        }
    }
}
