use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    client::{BrokerClient, BrokerSubscription},
    subscription::{MultiSubscription, PatternSubscription, Subscription, SubscriptionCore},
    Message,
};
use crate::{
    config::Settings,
    error::{PublishError, RecvError, SubscribeError},
    serialize::{Payload, Serializer},
};

/// Окно кооперативной остановки слушателя по умолчанию.
const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(100);

/// Менеджер pub/sub-подписок.
///
/// Владеет клиентом брокера и единолично создаёт хэндлы подписок:
/// на каждую подписку запускается отдельная задача-слушатель, хэндл
/// отслеживается в конкурентно-безопасном реестре до отмены или
/// shutdown. Доставка сообщений конкурентна между подписками и
/// строго упорядочена внутри одной.
///
/// Сериализацией менеджер не занимается: `publish` отправляет уже
/// готовый пейлоад, декодирование входящих — забота подписчика
/// (см. `subscribe_with`).
pub struct PubSubManager {
    client: Arc<dyn BrokerClient>,
    subscriptions: Arc<DashMap<u64, Arc<SubscriptionCore>>>,
    next_id: AtomicU64,
    cancel_grace: Duration,
    shut_down: AtomicBool,
}

impl PubSubManager {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self {
            client,
            subscriptions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            cancel_grace: DEFAULT_CANCEL_GRACE,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Менеджер с параметрами из конфигурации.
    pub fn with_settings(client: Arc<dyn BrokerClient>, settings: &Settings) -> Self {
        let mut manager = Self::new(client);
        manager.cancel_grace = Duration::from_millis(settings.cancel_grace_ms);
        manager
    }

    /// Подписка на один канал.
    ///
    /// Возвращает хэндл сразу после запуска задачи-слушателя, не
    /// дожидаясь первого сообщения. Сбой соединения с брокером
    /// отдаётся вызывающему: частичный хэндл не создаётся.
    pub async fn subscribe<F>(
        &self,
        channel: &str,
        on_message: F,
    ) -> Result<Subscription, SubscribeError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.ensure_running()?;
        let sub = self.client.subscribe(&[channel.to_string()]).await?;
        let core = self.spawn_listener(sub, on_message);
        debug!(channel, subscription = core.id, "subscribed");
        Ok(Subscription {
            channel: Arc::from(channel),
            core,
        })
    }

    /// Подписка на несколько каналов одним подписчиком брокера.
    ///
    /// Все каналы делят одну задачу-слушателя и один путь отмены.
    pub async fn subscribe_many<F>(
        &self,
        channels: &[&str],
        on_message: F,
    ) -> Result<MultiSubscription, SubscribeError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.ensure_running()?;
        if channels.is_empty() {
            return Err(SubscribeError::NoChannels);
        }
        let owned: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        let sub = self.client.subscribe(&owned).await?;
        let core = self.spawn_listener(sub, on_message);
        debug!(?channels, subscription = core.id, "subscribed to channel group");
        Ok(MultiSubscription {
            channels: channels.iter().map(|c| Arc::from(*c)).collect(),
            core,
        })
    }

    /// Подписка по glob-шаблону (синтаксис шаблонов брокера).
    pub async fn psubscribe<F>(
        &self,
        pattern: &str,
        on_message: F,
    ) -> Result<PatternSubscription, SubscribeError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.ensure_running()?;
        let sub = self.client.psubscribe(pattern).await?;
        let core = self.spawn_listener(sub, on_message);
        debug!(pattern, subscription = core.id, "subscribed to pattern");
        Ok(PatternSubscription {
            pattern: pattern.to_string(),
            core,
        })
    }

    /// Подписка с декодированием пейлоада выбранным сериализатором.
    ///
    /// Некорректные сообщения логируются и пропускаются, пустые
    /// игнорируются — колбэк видит только успешно восстановленные
    /// значения.
    pub async fn subscribe_with<S, T, F>(
        &self,
        channel: &str,
        serializer: Arc<S>,
        mut on_value: F,
    ) -> Result<Subscription, SubscribeError>
    where
        S: Serializer + 'static,
        T: Payload,
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(channel, move |msg| {
            let text = match msg.text() {
                Some(text) => text,
                None => {
                    error!(channel = %msg.channel, "non-utf8 payload dropped");
                    return;
                }
            };
            match serializer.deserialize::<T>(text) {
                Ok(Some(value)) => on_value(value),
                Ok(None) => {}
                Err(e) => {
                    error!(channel = %msg.channel, error = %e, "failed to decode message");
                }
            }
        })
        .await
    }

    /// Публикация готового (уже сериализованного) пейлоада.
    pub async fn publish(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> Result<usize, PublishError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(PublishError::Shutdown);
        }
        self.client.publish(channel, payload.into()).await
    }

    /// Публикация строки.
    pub async fn publish_string(
        &self,
        channel: &str,
        message: impl Into<String>,
    ) -> Result<usize, PublishError> {
        let message: String = message.into();
        self.publish(channel, message).await
    }

    /// Публикация значения, сериализованного в JSON.
    pub async fn publish_json<T: Serialize>(
        &self,
        channel: &str,
        value: &T,
    ) -> Result<usize, PublishError> {
        let text =
            serde_json::to_string(value).map_err(|e| PublishError::Serialize(e.to_string()))?;
        self.publish(channel, text).await
    }

    /// Публикация через слой сериализации.
    pub async fn publish_with<S, T>(
        &self,
        channel: &str,
        serializer: &S,
        value: &T,
    ) -> Result<usize, PublishError>
    where
        S: Serializer,
        T: Payload,
    {
        let wire = serializer
            .serialize(value)
            .map_err(|e| PublishError::Serialize(e.to_string()))?;
        self.publish(channel, wire).await
    }

    /// Число живых подписок.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Останавливает все подписки и освобождает брокерные ресурсы.
    ///
    /// Повторный вызов — no-op; новые подписки после shutdown
    /// отклоняются.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let cores: Vec<_> = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let count = cores.len();
        for core in cores {
            core.cancel().await;
        }
        self.subscriptions.clear();

        info!(subscriptions = count, "pub/sub manager shut down");
    }

    fn ensure_running(&self) -> Result<(), SubscribeError> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(SubscribeError::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Запускает задачу-слушателя и регистрирует ядро подписки.
    fn spawn_listener<F>(&self, sub: BrokerSubscription, mut on_message: F) -> Arc<SubscriptionCore>
    where
        F: FnMut(Message) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let core = Arc::new(SubscriptionCore::new(
            id,
            sub.control,
            token.clone(),
            Arc::downgrade(&self.subscriptions),
            self.cancel_grace,
        ));

        let mut stream = sub.stream;
        let task_core = core.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = stream.recv() => match received {
                        Ok(msg) => on_message(msg),
                        Err(RecvError::Lagged(n)) => {
                            warn!(subscription = id, lagged = n, "listener lagged behind broker");
                        }
                        Err(_) => {
                            // Поток брокера закрыт — подписка снимается неявно.
                            task_core.mark_closed();
                            break;
                        }
                    },
                }
            }
        });

        core.attach_task(task);
        self.subscriptions.insert(id, core.clone());
        core
    }
}
