use std::sync::Arc;

use bytes::Bytes;

/// Сообщение pub/sub: имя канала и полезная нагрузка.
#[derive(Debug, Clone)]
pub struct Message {
    pub channel: Arc<str>,
    pub payload: Bytes,
}

impl Message {
    pub fn new(channel: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Пейлоад как UTF-8 текст, если он валиден.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
