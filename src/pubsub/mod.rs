//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Менеджер подписок поверх Redis-совместимого брокера:
//!
//! - `client`: возможности внешнего драйвера брокера
//!   (SUBSCRIBE/PSUBSCRIBE/PUBLISH), которые потребляет ядро.
//! - `manager`: владелец клиента брокера, задач-слушателей и реестра
//!   хэндлов.
//! - `memory`: встроенный внутрипроцессный брокер.
//! - `message`: структура публикуемого сообщения.
//! - `subscription`: отменяемые хэндлы подписок (канал, группа
//!   каналов, шаблон).
//!
//! Публичный API переэкспортирует типы всех вложенных модулей, чтобы
//! упростить доступ к ним из внешнего кода.

pub mod client;
pub mod manager;
pub mod memory;
pub mod message;
pub mod subscription;

pub use client::{BrokerClient, BrokerSubscription, MessageStream, SubscriberControl};
pub use manager::PubSubManager;
pub use memory::MemoryBroker;
pub use message::Message;
pub use subscription::{MultiSubscription, PatternSubscription, Subscription};
