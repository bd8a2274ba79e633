use thiserror::Error;

/// Ошибка сериализации значения в wire-строку.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("json encoding failed: {0}")]
    Json(String),

    #[error("native binary encoding failed: {0}")]
    Native(String),

    #[error("type `{0}` does not opt into native serialization")]
    NativeUnsupported(&'static str),

    #[error("serializer cannot handle type `{0}`")]
    Unsupported(&'static str),

    #[error("registered codec expected type `{0}`")]
    TypeMismatch(&'static str),
}

/// Ошибка восстановления значения из wire-строки.
///
/// Пустой вход ошибкой не считается: `deserialize` возвращает
/// `Ok(None)` без записи в лог.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("json decoding failed: {0}")]
    Json(String),

    #[error("base64 decoding failed: {0}")]
    Base64(String),

    #[error("native binary decoding failed: {0}")]
    Native(String),

    #[error("failed to parse `{value}` as {target}")]
    Parse {
        target: &'static str,
        value: String,
    },

    #[error("type `{0}` does not opt into native serialization")]
    NativeUnsupported(&'static str),

    #[error("decoded value does not match requested type `{0}`")]
    TypeMismatch(&'static str),
}
