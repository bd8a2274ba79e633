use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::future::select_all;
use globset::Glob;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{
    client::{BrokerClient, BrokerSubscription, MessageStream, SubscriberControl},
    Message,
};
use crate::{
    config::Settings,
    error::{PublishError, RecvError, SubscribeError, UnsubscribeError},
};

type ChannelKey = Arc<str>;
type PatternKey = Glob;

/// Внутрипроцессный брокер pub/sub сообщений.
///
/// Поддерживает:
/// - Точные подписки по имени канала
/// - Подписки по шаблонам (glob)
/// - Автоматическое удаление пустых каналов
/// - Статистику публикаций и ошибок отправки
///
/// Реализует [`BrokerClient`], поэтому годится и как встроенный
/// брокер одного процесса, и как брокер для тестов менеджера.
pub struct MemoryBroker {
    /// Точные каналы → `Sender`
    channels: Arc<DashMap<ChannelKey, broadcast::Sender<Message>>>,
    /// Шаблоны каналов → `Sender`
    patterns: Arc<DashMap<PatternKey, broadcast::Sender<Message>>>,
    /// Ёмкость буфера каждого `broadcast::channel`
    default_capacity: usize,
    /// Общее количество вызовов `publish`
    pub publish_count: AtomicUsize,
    /// Количество неудачных `send` (нет подписчиков)
    pub send_error_count: AtomicUsize,
}

impl MemoryBroker {
    /// Создаёт новый брокер с заданной буферной ёмкостью.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            patterns: Arc::new(DashMap::new()),
            default_capacity,
            publish_count: AtomicUsize::new(0),
            send_error_count: AtomicUsize::new(0),
        }
    }

    /// Брокер с ёмкостью буфера из конфигурации.
    pub fn with_settings(settings: &Settings) -> Self {
        Self::new(settings.channel_capacity)
    }

    /// Принудительно закрывает канал на стороне брокера.
    ///
    /// Подписчики получают `Closed`; следующая публикация канал не
    /// пересоздаёт.
    pub fn close_channel(&self, channel: &str) {
        self.channels.remove(channel);
    }

    /// Возвращает количество подписчиков на канал.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|entry| entry.value().receiver_count())
            .unwrap_or(0)
    }

    /// Возвращает список всех активных каналов.
    pub fn active_channels(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|entry| entry.key().to_string())
            .collect()
    }

    /// `Sender` канала; создаёт канал при первой подписке.
    fn channel_sender(&self, channel: &str) -> broadcast::Sender<Message> {
        let key: Arc<str> = Arc::from(channel);
        self.channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.default_capacity).0)
            .clone()
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    async fn subscribe(&self, channels: &[String]) -> Result<BrokerSubscription, SubscribeError> {
        if channels.is_empty() {
            return Err(SubscribeError::NoChannels);
        }

        let mut entries = Vec::with_capacity(channels.len());
        let mut active = HashSet::new();
        for channel in channels {
            let tx = self.channel_sender(channel);
            entries.push((Arc::<str>::from(channel.as_str()), tx.subscribe()));
            active.insert(channel.clone());
        }

        Ok(split_subscription(entries, active))
    }

    async fn psubscribe(&self, pattern: &str) -> Result<BrokerSubscription, SubscribeError> {
        let glob = Glob::new(pattern)?;
        let tx = self
            .patterns
            .entry(glob)
            .or_insert_with(|| broadcast::channel(self.default_capacity).0)
            .clone();

        let entries = vec![(Arc::<str>::from(pattern), tx.subscribe())];
        let mut active = HashSet::new();
        active.insert(pattern.to_string());

        Ok(split_subscription(entries, active))
    }

    /// Публикация сообщения в канал.
    ///
    /// Работает в два этапа: сначала точный канал, затем все
    /// подписчики по шаблонам. Пустые каналы и шаблоны удаляются.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize, PublishError> {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
        let mut reached = 0;

        // 1) точное совпадение
        if let Some(entry) = self.channels.get_mut(channel) {
            let tx = entry.value().clone();
            let msg = Message::new(entry.key().clone(), payload.clone());
            match tx.send(msg) {
                Ok(n) => reached += n,
                Err(_) => {
                    self.send_error_count.fetch_add(1, Ordering::Relaxed);
                }
            }
            if tx.receiver_count() == 0 {
                let key = entry.key().clone();
                drop(entry);
                self.channels.remove(&*key);
            }
        }

        // 2) по шаблону
        let mut dead_patterns = Vec::new();
        for entry in self.patterns.iter() {
            let matcher = entry.key().compile_matcher();
            if matcher.is_match(channel) {
                let tx = entry.value().clone();
                let msg = Message::new(channel, payload.clone());
                if let Ok(n) = tx.send(msg) {
                    reached += n;
                }
            }
            if entry.value().receiver_count() == 0 {
                dead_patterns.push(entry.key().clone());
            }
        }
        for glob in dead_patterns {
            self.patterns.remove(&glob);
        }

        Ok(reached)
    }
}

/// Разделяемое состояние подписчика: какие каналы (или шаблоны) ещё
/// активны.
struct SharedState {
    active: Mutex<HashSet<String>>,
}

struct MemoryControl {
    state: Arc<SharedState>,
}

#[async_trait]
impl SubscriberControl for MemoryControl {
    async fn unsubscribe(&self, channels: &[String]) -> Result<(), UnsubscribeError> {
        let mut active = self.state.active.lock();
        for channel in channels {
            active.remove(channel);
        }
        Ok(())
    }

    async fn unsubscribe_all(&self) -> Result<(), UnsubscribeError> {
        self.state.active.lock().clear();
        Ok(())
    }

    fn is_subscribed(&self) -> bool {
        !self.state.active.lock().is_empty()
    }
}

/// Поток сообщений подписчика: один или несколько `broadcast`
/// приёмников, профильтрованных по активным каналам.
struct MemoryStream {
    entries: Vec<(Arc<str>, broadcast::Receiver<Message>)>,
    state: Arc<SharedState>,
}

#[async_trait]
impl MessageStream for MemoryStream {
    async fn recv(&mut self) -> Result<Message, RecvError> {
        loop {
            {
                let active = self.state.active.lock();
                self.entries.retain(|(key, _)| active.contains(key.as_ref()));
            }
            if self.entries.is_empty() {
                return Err(RecvError::Closed);
            }

            if self.entries.len() == 1 {
                let (key, rx) = &mut self.entries[0];
                match rx.recv().await {
                    Ok(msg) => {
                        if self.state.active.lock().contains(key.as_ref()) {
                            return Ok(msg);
                        }
                        // канал отписали, пока ждали — сообщение не доставляем
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.state.active.lock().clear();
                        self.entries.clear();
                        return Err(RecvError::Closed);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        return Err(RecvError::Lagged(n));
                    }
                }
            }

            // Несколько каналов — ждём первого готового приёмника.
            let pending: Vec<_> = self
                .entries
                .iter_mut()
                .map(|(_, rx)| Box::pin(rx.recv()))
                .collect();
            let (result, index, _) = select_all(pending).await;
            match result {
                Ok(msg) => {
                    let key = self.entries[index].0.clone();
                    if self.state.active.lock().contains(key.as_ref()) {
                        return Ok(msg);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let key = self.entries[index].0.clone();
                    self.state.active.lock().remove(key.as_ref());
                    self.entries.remove(index);
                    if self.entries.is_empty() {
                        return Err(RecvError::Closed);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(RecvError::Lagged(n));
                }
            }
        }
    }
}

fn split_subscription(
    entries: Vec<(Arc<str>, broadcast::Receiver<Message>)>,
    active: HashSet<String>,
) -> BrokerSubscription {
    let state = Arc::new(SharedState {
        active: Mutex::new(active),
    });
    BrokerSubscription {
        control: Arc::new(MemoryControl {
            state: state.clone(),
        }),
        stream: Box::new(MemoryStream { entries, state }),
    }
}
