use std::{sync::Arc, time::Duration};

use serde_json::json;
use tokio::{
    sync::mpsc,
    time::{sleep, timeout},
};

use vestnik::{JsonSerializer, MemoryBroker, PubSubManager};

fn setup() -> (Arc<MemoryBroker>, PubSubManager) {
    let broker = Arc::new(MemoryBroker::new(100));
    let manager = PubSubManager::new(broker.clone());
    (broker, manager)
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

/// Тест проверяет сценарий из жизни: подписчики на точный канал и на
/// шаблон, конкурентная доставка и строгий порядок внутри каждой
/// подписки.
#[tokio::test]
async fn test_real_world_usage() {
    let (_broker, manager) = setup();

    let (user_tx, mut user_rx) = mpsc::unbounded_channel();
    let (admin_tx, mut admin_rx) = mpsc::unbounded_channel();

    let user_sub = manager
        .subscribe("user.notifications", move |msg| {
            let _ = user_tx.send(msg.text().unwrap_or_default().to_string());
        })
        .await
        .unwrap();

    let admin_sub = manager
        .psubscribe("admin.*", move |msg| {
            let _ = admin_tx.send(format!(
                "{}: {}",
                msg.channel,
                msg.text().unwrap_or_default()
            ));
        })
        .await
        .unwrap();

    manager
        .publish_string("user.notifications", "New message arrived")
        .await
        .unwrap();
    manager
        .publish_string("user.notifications", "Friend request received")
        .await
        .unwrap();
    manager
        .publish_string("admin.security", "Failed login attempt")
        .await
        .unwrap();
    manager
        .publish_string("admin.audit", "User data accessed")
        .await
        .unwrap();
    manager
        .publish_string("user.notifications", "Email verified")
        .await
        .unwrap();

    // Порядок внутри одной подписки совпадает с порядком публикации.
    assert_eq!(next(&mut user_rx).await, "New message arrived");
    assert_eq!(next(&mut user_rx).await, "Friend request received");
    assert_eq!(next(&mut user_rx).await, "Email verified");

    assert_eq!(
        next(&mut admin_rx).await,
        "admin.security: Failed login attempt"
    );
    assert_eq!(next(&mut admin_rx).await, "admin.audit: User data accessed");

    user_sub.cancel().await;
    admin_sub.cancel().await;
    assert_eq!(manager.subscription_count(), 0);
}

/// Тест проверяет опорный сценарий спецификации: подписка на
/// `events`, публикация `{"type":"join","id":42}`, колбэк получает
/// ровно это значение, ровно один раз, раньше следующего сообщения.
#[tokio::test]
async fn test_events_scenario() {
    let (_broker, manager) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let serializer = Arc::new(JsonSerializer::new());
    let _sub = manager
        .subscribe_with::<_, serde_json::Value, _>("events", serializer, move |value| {
            let _ = tx.send(value);
        })
        .await
        .unwrap();

    manager
        .publish_json("events", &json!({ "type": "join", "id": 42 }))
        .await
        .unwrap();
    manager
        .publish_json("events", &json!({ "type": "leave", "id": 42 }))
        .await
        .unwrap();

    let first = next(&mut rx).await;
    assert_eq!(first, json!({ "type": "join", "id": 42 }));

    let second = next(&mut rx).await;
    assert_eq!(second, json!({ "type": "leave", "id": 42 }));

    // Ровно по одному разу.
    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

/// Тест проверяет идемпотентность отмены хэндла из разных задач:
/// после первого `cancel()` флаг виден всем, повторные вызовы —
/// no-op.
#[tokio::test]
async fn test_cancel_idempotent_across_tasks() {
    let (_broker, manager) = setup();

    let sub = Arc::new(manager.subscribe("shared", |_| {}).await.unwrap());

    let mut workers = Vec::new();
    for _ in 0..4 {
        let sub = sub.clone();
        workers.push(tokio::spawn(async move {
            sub.cancel().await;
            assert!(sub.is_cancelled());
        }));
    }
    for worker in workers {
        worker.await.unwrap();
    }

    assert!(sub.is_cancelled());
    assert!(!sub.is_active());
    assert_eq!(manager.subscription_count(), 0);
}

/// Тест проверяет групповую подписку: частичная отписка оставляет
/// хэндл активным, пока брокер считает подписчика подписанным.
#[tokio::test]
async fn test_multi_subscription_partial_cancel() {
    let (_broker, manager) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let sub = manager
        .subscribe_many(&["orders", "payments"], move |msg| {
            let _ = tx.send((msg.channel.to_string(), msg.text().unwrap().to_string()));
        })
        .await
        .unwrap();

    manager.publish_string("orders", "o1").await.unwrap();
    manager.publish_string("payments", "p1").await.unwrap();
    assert_eq!(next(&mut rx).await, ("orders".to_string(), "o1".to_string()));
    assert_eq!(
        next(&mut rx).await,
        ("payments".to_string(), "p1".to_string())
    );

    sub.cancel_channel("orders").await;
    assert!(!sub.is_cancelled());
    assert!(sub.is_active());

    manager.publish_string("orders", "o2").await.unwrap();
    manager.publish_string("payments", "p2").await.unwrap();
    assert_eq!(
        next(&mut rx).await,
        ("payments".to_string(), "p2".to_string())
    );

    sub.cancel().await;
    assert!(sub.is_cancelled());
}

/// Тест проверяет shutdown менеджера под живыми подписками и его
/// идемпотентность.
#[tokio::test]
async fn test_manager_shutdown() {
    let (_broker, manager) = setup();

    let subs = vec![
        manager.subscribe("one", |_| {}).await.unwrap(),
        manager.subscribe("two", |_| {}).await.unwrap(),
    ];
    let pattern = manager.psubscribe("three.*", |_| {}).await.unwrap();
    assert_eq!(manager.subscription_count(), 3);

    manager.shutdown().await;
    manager.shutdown().await;

    for sub in &subs {
        assert!(sub.is_cancelled());
    }
    assert!(pattern.is_cancelled());
    assert_eq!(manager.subscription_count(), 0);
}

/// Тест проверяет, что обрыв канала на брокере превращается в
/// неявную отмену затронутого хэндла, не задевая остальные.
#[tokio::test]
async fn test_broker_drop_is_implicit_cancellation() {
    let (broker, manager) = setup();

    let doomed = manager.subscribe("doomed", |_| {}).await.unwrap();
    let survivor = manager.subscribe("survivor", |_| {}).await.unwrap();

    broker.close_channel("doomed");

    let mut cancelled = false;
    for _ in 0..50 {
        if doomed.is_cancelled() {
            cancelled = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(cancelled);
    assert!(!survivor.is_cancelled());
    assert!(survivor.is_active());
    assert_eq!(manager.subscription_count(), 1);
}
