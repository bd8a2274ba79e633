use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::client::SubscriberControl;

/// Общее ядро хэндла подписки.
///
/// Разделяется публичным хэндлом, задачей-слушателем и реестром
/// менеджера. Жизненный цикл: `created → active → cancelled`,
/// обратного перехода нет.
pub(crate) struct SubscriptionCore {
    pub(crate) id: u64,
    pub(crate) control: Arc<dyn SubscriberControl>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    cancelled: AtomicBool,
    registry: Weak<DashMap<u64, Arc<SubscriptionCore>>>,
    cancel_grace: Duration,
}

impl SubscriptionCore {
    pub(crate) fn new(
        id: u64,
        control: Arc<dyn SubscriberControl>,
        token: CancellationToken,
        registry: Weak<DashMap<u64, Arc<SubscriptionCore>>>,
        cancel_grace: Duration,
    ) -> Self {
        Self {
            id,
            control,
            token,
            task: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            registry,
            cancel_grace,
        }
    }

    pub(crate) fn attach_task(&self, handle: JoinHandle<()>) {
        *self.task.lock() = Some(handle);
    }

    /// Флаг отмены; виден из любого потока сразу после `cancel()`.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Активен, пока не отменён, брокер считает подписчика
    /// подписанным и задача-слушатель не завершилась.
    pub(crate) fn is_active(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if !self.control.is_subscribed() {
            return false;
        }
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Отмена подписки.
    ///
    /// Идемпотентна: флаг переходит `false → true` ровно один раз,
    /// повторные вызовы — no-op. Ошибка отписки на брокере или
    /// незавершившаяся задача не мешают переходу в `cancelled`.
    pub(crate) async fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.control.unsubscribe_all().await {
            warn!(
                subscription = self.id,
                error = %e,
                "broker unsubscribe failed during cancel"
            );
        }

        self.token.cancel();
        let task = { self.task.lock().take() };
        if let Some(mut task) = task {
            // Некооперативную задачу не ждём дольше отведённого окна.
            if timeout(self.cancel_grace, &mut task).await.is_err() {
                task.abort();
            }
        }

        self.detach();
    }

    /// Неявная отмена: поток брокера закрылся, отписываться не с
    /// чего. Вызывается самой задачей-слушателем.
    pub(crate) fn mark_closed(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!(
            subscription = self.id,
            "broker stream closed; subscription cancelled"
        );
        self.detach();
    }

    fn detach(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
        }
    }
}

/// Подписка на один канал.
///
/// Лёгкий отменяемый токен: хэндл можно свободно передавать между
/// потоками, отмена из любого места идемпотентна.
pub struct Subscription {
    pub(crate) channel: Arc<str>,
    pub(crate) core: Arc<SubscriptionCore>,
}

impl Subscription {
    /// Имя канала подписки.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Снимает подписку: отписка на брокере, остановка слушателя.
    /// Повторный вызов — no-op.
    pub async fn cancel(&self) {
        self.core.cancel().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.is_cancelled()
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }
}

/// Подписка на группу каналов одним подписчиком брокера.
///
/// Все каналы делят одну задачу-слушателя и один путь отмены;
/// отдельный канал можно снять, не трогая хэндл целиком.
pub struct MultiSubscription {
    pub(crate) channels: Vec<Arc<str>>,
    pub(crate) core: Arc<SubscriptionCore>,
}

impl MultiSubscription {
    /// Каналы, на которые оформлена подписка.
    pub fn channels(&self) -> &[Arc<str>] {
        &self.channels
    }

    /// Снимает всю подписку. Повторный вызов — no-op.
    pub async fn cancel(&self) {
        self.core.cancel().await;
    }

    /// Отписывает один канал, не трогая остальные и флаг
    /// `cancelled` самого хэндла.
    pub async fn cancel_channel(&self, channel: &str) {
        let channels = [channel.to_string()];
        if let Err(e) = self.core.control.unsubscribe(&channels).await {
            warn!(channel, error = %e, "broker unsubscribe failed");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.is_cancelled()
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }
}

/// Подписка по glob-шаблону.
pub struct PatternSubscription {
    pub(crate) pattern: String,
    pub(crate) core: Arc<SubscriptionCore>,
}

impl PatternSubscription {
    /// Шаблон подписки.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Снимает подписку. Повторный вызов — no-op.
    pub async fn cancel(&self) {
        self.core.cancel().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.is_cancelled()
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }
}
