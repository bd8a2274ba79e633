use std::any::{Any, TypeId};

use tracing::error;

use super::{payload::downcast_value, Payload, Serializer};
use crate::error::{DecodeError, EncodeError};

/// Сериализатор по умолчанию.
///
/// Строки проходят как есть, примитивы кодируются каноническим
/// текстом (`ToString`) и восстанавливаются типонаправленным
/// `parse`. Всё остальное кодируется структурным JSON: поля в
/// порядке объявления, pretty-печать, без HTML-экранирования —
/// повторное кодирование воспроизводит сообщение байт в байт.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

/// Вывод примитива каноническим текстом, если `$value` — один из
/// перечисленных типов.
macro_rules! encode_as_text {
    ($value:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(v) = ($value as &dyn Any).downcast_ref::<$ty>() {
                return Ok(v.to_string());
            }
        )+
    };
}

/// Типонаправленный разбор примитива из текста. Неудача разбора —
/// типизированная ошибка плюс запись в лог, никогда не паника.
macro_rules! decode_from_text {
    ($wire:expr, $target:ty, $($ty:ty),+ $(,)?) => {
        $(
            if TypeId::of::<$target>() == TypeId::of::<$ty>() {
                return match $wire.parse::<$ty>() {
                    Ok(v) => Ok(Some(downcast_value(v)?)),
                    Err(e) => {
                        error!(
                            target_type = std::any::type_name::<$ty>(),
                            error = %e,
                            "failed to parse primitive payload"
                        );
                        Err(DecodeError::Parse {
                            target: std::any::type_name::<$ty>(),
                            value: $wire.to_string(),
                        })
                    }
                };
            }
        )+
    };
}

impl Serializer for JsonSerializer {
    fn serialize<T: Payload>(&self, value: &T) -> Result<String, EncodeError> {
        encode_as_text!(
            value, String, bool, char, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64,
        );

        serde_json::to_string_pretty(value).map_err(|e| {
            error!(
                payload_type = std::any::type_name::<T>(),
                error = %e,
                "json encoding failed"
            );
            EncodeError::Json(e.to_string())
        })
    }

    fn deserialize<T: Payload>(&self, wire: &str) -> Result<Option<T>, DecodeError> {
        if wire.is_empty() {
            return Ok(None);
        }

        // Строка — это уже wire-представление самой себя.
        if TypeId::of::<T>() == TypeId::of::<String>() {
            return Ok(Some(downcast_value(wire.to_string())?));
        }

        decode_from_text!(wire, T, bool, char, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64,);

        match serde_json::from_str(wire) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                error!(
                    payload_type = std::any::type_name::<T>(),
                    error = %e,
                    "json decoding failed"
                );
                Err(DecodeError::Json(e.to_string()))
            }
        }
    }
}

/// Формат временных полей в JSON-пейлоадах: `yyyy-MM-dd HH:mm:ss`.
///
/// Подключается к полю через serde:
/// `#[serde(with = "vestnik::serialize::date_format")]`.
pub mod date_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let naive =
            NaiveDateTime::parse_from_str(&text, FORMAT).map_err(serde::de::Error::custom)?;
        Ok(naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u64,
        item: String,
        #[serde(with = "date_format")]
        placed_at: DateTime<Utc>,
    }

    impl Payload for Order {}

    /// Тест проверяет, что строки проходят без изменений в обе
    /// стороны.
    #[test]
    fn test_string_passthrough() {
        let serializer = JsonSerializer::new();
        let wire = serializer.serialize(&"hello world".to_string()).unwrap();
        assert_eq!(wire, "hello world");

        let back: Option<String> = serializer.deserialize(&wire).unwrap();
        assert_eq!(back, Some("hello world".to_string()));
    }

    /// Тест проверяет канонический текст и обратный разбор для
    /// примитивов.
    #[test]
    fn test_primitive_roundtrip() {
        let serializer = JsonSerializer::new();

        assert_eq!(serializer.serialize(&42i64).unwrap(), "42");
        assert_eq!(serializer.deserialize::<i64>("42").unwrap(), Some(42));

        assert_eq!(serializer.serialize(&true).unwrap(), "true");
        assert_eq!(serializer.deserialize::<bool>("true").unwrap(), Some(true));

        assert_eq!(serializer.serialize(&1.5f64).unwrap(), "1.5");
        assert_eq!(serializer.deserialize::<f64>("1.5").unwrap(), Some(1.5));

        assert_eq!(serializer.serialize(&'ж').unwrap(), "ж");
        assert_eq!(serializer.deserialize::<char>("ж").unwrap(), Some('ж'));
    }

    /// Тест проверяет структурный round-trip с фиксированным
    /// форматом даты.
    #[test]
    fn test_struct_roundtrip_with_date() {
        let serializer = JsonSerializer::new();
        let order = Order {
            id: 7,
            item: "lamp".to_string(),
            placed_at: Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap(),
        };

        let wire = serializer.serialize(&order).unwrap();
        assert!(wire.contains("\"2024-03-09 12:30:05\""));

        let back: Option<Order> = serializer.deserialize(&wire).unwrap();
        assert_eq!(back, Some(order));
    }

    /// Тест проверяет, что повторное кодирование даёт байт-в-байт
    /// тот же результат.
    #[test]
    fn test_encoding_is_stable() {
        let serializer = JsonSerializer::new();
        let order = Order {
            id: 1,
            item: "<b>&tag</b>".to_string(),
            placed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };

        let first = serializer.serialize(&order).unwrap();
        let second = serializer.serialize(&order).unwrap();
        assert_eq!(first, second);
        // HTML-экранирование выключено.
        assert!(first.contains("<b>&tag</b>"));
    }

    /// Тест проверяет, что пустой вход даёт отсутствие результата
    /// без ошибки.
    #[test]
    fn test_empty_input_is_absent() {
        let serializer = JsonSerializer::new();
        assert_eq!(serializer.deserialize::<i64>("").unwrap(), None);
        assert_eq!(serializer.deserialize::<Order>("").unwrap(), None);
    }

    /// Тест проверяет, что некорректный примитив даёт типизированную
    /// ошибку разбора.
    #[test]
    fn test_malformed_primitive() {
        let serializer = JsonSerializer::new();
        let result = serializer.deserialize::<i64>("abc");
        assert!(matches!(result, Err(DecodeError::Parse { .. })));
    }

    /// Тест проверяет, что некорректный JSON даёт ошибку
    /// декодирования.
    #[test]
    fn test_malformed_json() {
        let serializer = JsonSerializer::new();
        let result = serializer.deserialize::<Order>("{broken");
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    /// Тест проверяет консервативное "скорее да" в `can_serialize`.
    #[test]
    fn test_can_serialize_default() {
        let serializer = JsonSerializer::new();
        assert!(serializer.can_serialize::<Order>());
        assert!(serializer.can_serialize::<String>());
    }
}
