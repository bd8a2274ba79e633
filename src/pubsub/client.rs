use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::Message;
use crate::error::{PublishError, RecvError, SubscribeError, UnsubscribeError};

/// Возможности драйвера брокера, которые потребляет менеджер.
///
/// Ядро не реализует протокол Redis само: SUBSCRIBE/UNSUBSCRIBE,
/// PSUBSCRIBE/PUNSUBSCRIBE и PUBLISH приходят от внешнего клиента,
/// реализующего этот трейт. Встроенная реализация — `MemoryBroker`.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Открывает одного подписчика сразу на все перечисленные каналы.
    ///
    /// Сбой соединения — ошибка всего вызова: частичная подписка не
    /// создаётся.
    async fn subscribe(&self, channels: &[String]) -> Result<BrokerSubscription, SubscribeError>;

    /// Открывает подписку по glob-шаблону.
    async fn psubscribe(&self, pattern: &str) -> Result<BrokerSubscription, SubscribeError>;

    /// Публикует пейлоад; возвращает число получателей.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize, PublishError>;
}

/// Подписка уровня брокера.
///
/// Управляющий хэндл разделяется (им пользуются хэндлы подписок из
/// любого потока), поток сообщений принадлежит задаче-слушателю.
pub struct BrokerSubscription {
    pub control: Arc<dyn SubscriberControl>,
    pub stream: Box<dyn MessageStream>,
}

/// Управление подпиской брокера.
#[async_trait]
pub trait SubscriberControl: Send + Sync {
    /// Отписывает отдельные каналы, не трогая остальные.
    async fn unsubscribe(&self, channels: &[String]) -> Result<(), UnsubscribeError>;

    /// Снимает подписку целиком.
    async fn unsubscribe_all(&self) -> Result<(), UnsubscribeError>;

    /// Считает ли брокер подписчика всё ещё подписанным.
    fn is_subscribed(&self) -> bool;
}

/// Последовательный поток входящих сообщений одного подписчика.
///
/// Брокер доставляет сообщения одному подписчику строго по одному,
/// поэтому порядок внутри подписки совпадает с порядком публикации.
#[async_trait]
pub trait MessageStream: Send {
    async fn recv(&mut self) -> Result<Message, RecvError>;
}
