use std::any::Any;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::DecodeError;

/// Тип, пригодный к передаче через pub/sub в виде wire-строки.
///
/// Реализуется явно для каждого прикладного типа: это одновременно
/// и граница serde-представимости, и место для маркера нативной
/// сериализации. Для примитивов и `serde_json::Value` реализации
/// даёт сам крейт.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use vestnik::serialize::Payload;
///
/// #[derive(Serialize, Deserialize)]
/// struct JoinEvent {
///     user: String,
/// }
///
/// impl Payload for JoinEvent {
///     // Согласие на нативную (бинарную) сериализацию.
///     const NATIVE: bool = true;
/// }
/// ```
pub trait Payload: Serialize + DeserializeOwned + Any + Send {
    /// Поддерживает ли тип нативную бинарную сериализацию.
    const NATIVE: bool = false;
}

macro_rules! impl_payload {
    ($($ty:ty),+ $(,)?) => {
        $(impl Payload for $ty {})+
    };
}

impl_payload!(
    bool, char, String, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64,
);

impl Payload for serde_json::Value {}

/// Проверяемое приведение восстановленного значения к запрошенному
/// типу. Несовпадение — ошибка данных, а не паника.
pub(crate) fn downcast_value<T: Any>(value: impl Any) -> Result<T, DecodeError> {
    (Box::new(value) as Box<dyn Any>)
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| DecodeError::TypeMismatch(std::any::type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что примитивы не объявляют нативную
    /// сериализацию по умолчанию.
    #[test]
    fn test_primitives_are_not_native() {
        assert!(!String::NATIVE);
        assert!(!i64::NATIVE);
        assert!(!bool::NATIVE);
    }

    /// Тест проверяет успешное приведение типа.
    #[test]
    fn test_downcast_value_ok() {
        let value: i64 = downcast_value(42i64).unwrap();
        assert_eq!(value, 42);
    }

    /// Тест проверяет, что несовпадение типов даёт типизированную
    /// ошибку, а не панику.
    #[test]
    fn test_downcast_value_mismatch() {
        let result: Result<String, _> = downcast_value(42i64);
        assert!(matches!(result, Err(DecodeError::TypeMismatch(_))));
    }
}
