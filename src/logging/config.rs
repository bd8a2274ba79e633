/// Конфигурация логирования.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Уровень по умолчанию (`trace`..`error`).
    pub level: String,
    /// Выводить ли логи в консоль.
    pub console_enabled: bool,
    /// Использовать ли ANSI-цвета.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_enabled: true,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Переопределения из окружения (`VESTNIK_LOG_LEVEL`).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("VESTNIK_LOG_LEVEL") {
            if !level.is_empty() {
                self.level = level;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    /// Тест проверяет значения по умолчанию.
    #[test]
    fn test_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_enabled);
    }

    /// Тест проверяет переопределение уровня из окружения.
    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("VESTNIK_LOG_LEVEL", "debug");

        let mut config = LoggingConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.level, "debug");

        std::env::remove_var("VESTNIK_LOG_LEVEL");
    }
}
