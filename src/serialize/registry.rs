use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use tracing::error;

use super::{JsonSerializer, Payload, Serializer};
use crate::error::{DecodeError, EncodeError};

type EncodeFn = Box<dyn Fn(&dyn Any) -> Result<String, EncodeError> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&str) -> Result<Box<dyn Any + Send>, DecodeError> + Send + Sync>;

/// Пара функций кодирования/декодирования, стёртая до `Any`.
struct Codec {
    encode: EncodeFn,
    decode: DecodeFn,
}

impl Codec {
    fn new<T, E, D>(encode: E, decode: D) -> Self
    where
        T: Payload,
        E: Fn(&T) -> Result<String, EncodeError> + Send + Sync + 'static,
        D: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            encode: Box::new(move |any| match any.downcast_ref::<T>() {
                Some(value) => encode(value),
                None => Err(EncodeError::TypeMismatch(std::any::type_name::<T>())),
            }),
            decode: Box::new(move |wire| {
                decode(wire).map(|value| Box::new(value) as Box<dyn Any + Send>)
            }),
        }
    }
}

/// Составной сериализатор с переопределениями по типам.
///
/// Порядок диспетчеризации: точная регистрация → семейная
/// регистрация в порядке добавления (при пересечении выигрывает
/// первая) → резервный сериализатор. Семейный ярус — детерминированная
/// замена поиска "assignable-from" по супертипам: общий кодек
/// регистрируется на каждый тип семейства отдельно.
///
/// Реестр собирается билдером до начала конкурентного использования
/// и далее только читается.
pub struct SerializerRegistry<F = JsonSerializer> {
    exact: HashMap<TypeId, Codec>,
    family: Vec<(TypeId, Codec)>,
    fallback: F,
}

impl SerializerRegistry<JsonSerializer> {
    /// Реестр с JSON-сериализатором в качестве резервного.
    pub fn new() -> Self {
        Self::with_fallback(JsonSerializer::new())
    }
}

impl Default for SerializerRegistry<JsonSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Serializer> SerializerRegistry<F> {
    pub fn with_fallback(fallback: F) -> Self {
        Self {
            exact: HashMap::new(),
            family: Vec::new(),
            fallback,
        }
    }

    /// Точная регистрация кодека для типа `T`.
    ///
    /// Возвращает реестр для цепочки вызовов; повторная регистрация
    /// того же типа перезаписывает предыдущую.
    pub fn register<T, E, D>(mut self, encode: E, decode: D) -> Self
    where
        T: Payload,
        E: Fn(&T) -> Result<String, EncodeError> + Send + Sync + 'static,
        D: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        self.exact.insert(TypeId::of::<T>(), Codec::new(encode, decode));
        self
    }

    /// Семейная регистрация: применяется, когда точной нет.
    ///
    /// При пересечении семей выигрывает зарегистрированная первой —
    /// порядок добавления и есть порядок приоритета.
    pub fn register_family<T, E, D>(mut self, encode: E, decode: D) -> Self
    where
        T: Payload,
        E: Fn(&T) -> Result<String, EncodeError> + Send + Sync + 'static,
        D: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        self.family.push((TypeId::of::<T>(), Codec::new(encode, decode)));
        self
    }

    fn lookup(&self, id: TypeId) -> Option<&Codec> {
        self.exact.get(&id).or_else(|| {
            self.family
                .iter()
                .find(|(registered, _)| *registered == id)
                .map(|(_, codec)| codec)
        })
    }
}

impl<F: Serializer> Serializer for SerializerRegistry<F> {
    fn serialize<T: Payload>(&self, value: &T) -> Result<String, EncodeError> {
        if let Some(codec) = self.lookup(TypeId::of::<T>()) {
            return (codec.encode)(value as &dyn Any).map_err(|e| {
                error!(
                    payload_type = std::any::type_name::<T>(),
                    error = %e,
                    "registered codec failed to encode"
                );
                e
            });
        }
        if !self.fallback.can_serialize::<T>() {
            return Err(EncodeError::Unsupported(std::any::type_name::<T>()));
        }
        self.fallback.serialize(value)
    }

    fn deserialize<T: Payload>(&self, wire: &str) -> Result<Option<T>, DecodeError> {
        if wire.is_empty() {
            return Ok(None);
        }
        if let Some(codec) = self.lookup(TypeId::of::<T>()) {
            let value = (codec.decode)(wire).map_err(|e| {
                error!(
                    payload_type = std::any::type_name::<T>(),
                    error = %e,
                    "registered codec failed to decode"
                );
                e
            })?;
            return value
                .downcast::<T>()
                .map(|boxed| Some(*boxed))
                .map_err(|_| DecodeError::TypeMismatch(std::any::type_name::<T>()));
        }
        self.fallback.deserialize(wire)
    }

    fn can_serialize<T: Payload>(&self) -> bool {
        self.lookup(TypeId::of::<T>()).is_some() || self.fallback.can_serialize::<T>()
    }
}
