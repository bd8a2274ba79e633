use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::error;

use super::{Payload, Serializer};
use crate::error::{DecodeError, EncodeError};

/// Сериализатор через нативное бинарное представление.
///
/// Доступен только типам, явно объявившим `Payload::NATIVE = true`.
/// Граф значения кодируется bincode и упаковывается в base64, чтобы
/// результат оставался текстовым wire-форматом.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl BinarySerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for BinarySerializer {
    fn serialize<T: Payload>(&self, value: &T) -> Result<String, EncodeError> {
        if !T::NATIVE {
            return Err(EncodeError::NativeUnsupported(std::any::type_name::<T>()));
        }

        let bytes = bincode::serialize(value).map_err(|e| {
            error!(
                payload_type = std::any::type_name::<T>(),
                error = %e,
                "native binary encoding failed"
            );
            EncodeError::Native(e.to_string())
        })?;

        Ok(STANDARD.encode(bytes))
    }

    fn deserialize<T: Payload>(&self, wire: &str) -> Result<Option<T>, DecodeError> {
        if wire.is_empty() {
            return Ok(None);
        }
        if !T::NATIVE {
            return Err(DecodeError::NativeUnsupported(std::any::type_name::<T>()));
        }

        let bytes = STANDARD.decode(wire).map_err(|e| {
            error!(
                payload_type = std::any::type_name::<T>(),
                error = %e,
                "base64 decoding failed"
            );
            DecodeError::Base64(e.to_string())
        })?;

        match bincode::deserialize(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                error!(
                    payload_type = std::any::type_name::<T>(),
                    error = %e,
                    "native binary decoding failed"
                );
                Err(DecodeError::Native(e.to_string()))
            }
        }
    }

    fn can_serialize<T: Payload>(&self) -> bool {
        T::NATIVE
    }
}
