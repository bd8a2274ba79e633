//! Слой сериализации.
//!
//! Превращает типизированные значения в wire-строки и обратно:
//!
//! - `payload`: граница представимых типов и маркер нативной
//!   сериализации.
//! - `json`: сериализатор по умолчанию (строки как есть, примитивы
//!   каноническим текстом, структуры — JSON) и фиксированный формат
//!   дат.
//! - `binary`: нативное бинарное представление (bincode + base64)
//!   для типов, объявивших поддержку.
//! - `registry`: составной сериализатор с переопределениями по
//!   типам и резервным сериализатором.
//!
//! Инвариант каждого сериализатора: для любого типа, который он
//! объявляет поддерживаемым, `deserialize(serialize(x))` даёт
//! значение, эквивалентное `x`.

pub mod binary;
pub mod json;
pub mod payload;
pub mod registry;

pub use binary::BinarySerializer;
pub use json::{date_format, JsonSerializer};
pub use payload::Payload;
pub use registry::SerializerRegistry;

use crate::error::{DecodeError, EncodeError};

/// Контракт сериализатора.
///
/// Ошибки никогда не пересекают границу паникой: обе операции
/// возвращают типизированный результат, а сбои дополнительно
/// попадают в лог.
pub trait Serializer: Send + Sync {
    /// Сериализует значение в wire-строку.
    fn serialize<T: Payload>(&self, value: &T) -> Result<String, EncodeError>;

    /// Восстанавливает значение из wire-строки.
    ///
    /// Пустой вход даёт `Ok(None)` без ошибки; некорректный —
    /// типизированную ошибку.
    fn deserialize<T: Payload>(&self, wire: &str) -> Result<Option<T>, DecodeError>;

    /// Может ли сериализатор обработать тип `T`.
    ///
    /// Консервативное "скорее да": по умолчанию `true`.
    fn can_serialize<T: Payload>(&self) -> bool {
        true
    }
}
