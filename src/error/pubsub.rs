use thiserror::Error;
use tokio::sync::broadcast;

/// Ошибка при получении сообщений из потока подписчика.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    #[error("subscriber stream is closed")]
    Closed,

    #[error("receiver lagged behind by {0} messages")]
    Lagged(u64),

    #[error("broker connection lost: {0}")]
    Connection(String),
}

/// Ошибка оформления подписки.
///
/// Отдаётся вызывающему целиком: частичный хэндл при сбое
/// соединения не создаётся.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("invalid glob pattern for subscription: {0}")]
    InvalidPattern(String),

    #[error("subscribe request without channels")]
    NoChannels,

    #[error("pub/sub manager is shut down")]
    Shutdown,
}

/// Ошибка публикации сообщения.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("payload serialization failed: {0}")]
    Serialize(String),

    #[error("pub/sub manager is shut down")]
    Shutdown,
}

/// Ошибка отписки на уровне брокера.
///
/// Во время отмены хэндла такие ошибки поглощаются: хэндл всё равно
/// переходит в состояние `cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsubscribeError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("subscriber is already closed")]
    Closed,
}

// === Преобразования ===

impl From<broadcast::error::RecvError> for RecvError {
    fn from(err: broadcast::error::RecvError) -> Self {
        match err {
            broadcast::error::RecvError::Closed => RecvError::Closed,
            broadcast::error::RecvError::Lagged(n) => RecvError::Lagged(n),
        }
    }
}

impl From<globset::Error> for SubscribeError {
    fn from(err: globset::Error) -> Self {
        SubscribeError::InvalidPattern(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use globset::Glob;

    use super::*;

    #[test]
    fn test_recv_error_display() {
        assert_eq!(RecvError::Closed.to_string(), "subscriber stream is closed");
        assert_eq!(
            RecvError::Lagged(10).to_string(),
            "receiver lagged behind by 10 messages"
        );
    }

    #[test]
    fn test_broadcast_conversion() {
        let err = broadcast::error::RecvError::Closed;
        let converted: RecvError = err.into();
        assert_eq!(converted, RecvError::Closed);

        let err = broadcast::error::RecvError::Lagged(42);
        let converted: RecvError = err.into();
        assert_eq!(converted, RecvError::Lagged(42));
    }

    #[test]
    fn test_globset_conversion() {
        let glob_err = Glob::new("[").unwrap_err();
        let sub_err: SubscribeError = glob_err.into();
        match sub_err {
            SubscribeError::InvalidPattern(_) => {} // Ок
            _ => panic!("Expected InvalidPattern"),
        }
    }

    #[test]
    fn test_shutdown_errors_display() {
        assert_eq!(
            SubscribeError::Shutdown.to_string(),
            "pub/sub manager is shut down"
        );
        assert_eq!(
            PublishError::Shutdown.to_string(),
            "pub/sub manager is shut down"
        );
    }
}
