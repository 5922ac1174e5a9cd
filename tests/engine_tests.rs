//! Engine behaviour through the public API, on the real clock.

use std::sync::Arc;
use std::time::Duration;

use kv_cache::tasks::{spawn_sweeper, SweeperConfig};
use kv_cache::{CacheEngine, CacheError, Storage, UserCache};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_set_with_ttl_expires_on_real_clock() {
    let engine = CacheEngine::with_capacity(16).unwrap();
    let cancel = CancellationToken::new();

    engine
        .set("test:expiring", "expiring-value", Some(Duration::from_millis(100)), &cancel)
        .await
        .unwrap();
    assert!(engine.exists("test:expiring", &cancel).await.unwrap());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!engine.exists("test:expiring", &cancel).await.unwrap());
    assert!(matches!(
        engine.get("test:expiring", &cancel).await,
        Err(CacheError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_sweeper_reclaims_without_reads() {
    let engine = CacheEngine::with_capacity(64).unwrap();
    let cancel = CancellationToken::new();

    for i in 0..20 {
        engine
            .set(format!("k{i}"), "v", Some(Duration::from_millis(30)), &cancel)
            .await
            .unwrap();
    }
    engine.set("keep", "v", None, &cancel).await.unwrap();

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        engine.clone(),
        SweeperConfig {
            interval: Duration::from_millis(25),
            batch_size: 8,
            max_batches: 4,
            lock_timeout: Duration::from_millis(50),
        },
        shutdown.clone(),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();
    sweeper.await.unwrap();

    assert_eq!(engine.len().await, 1);
    assert_eq!(engine.stats().await.expirations, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_operations_keep_capacity() {
    let capacity = 32;
    let engine = CacheEngine::with_capacity(capacity).unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|worker| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                for i in 0..200 {
                    let key = format!("key-{}", (worker * 7 + i) % 50);
                    match i % 4 {
                        0 | 1 => engine.set(key, vec![worker as u8; 16], None, &cancel).await?,
                        2 => match engine.get(&key, &cancel).await {
                            Ok(value) => assert!(value.iter().all(|b| *b == value[0])),
                            Err(CacheError::NotFound(_)) => {}
                            Err(e) => return Err(e),
                        },
                        _ => {
                            engine.delete(&key, &cancel).await?;
                        }
                    }
                }
                Ok::<(), CacheError>(())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(engine.len().await <= capacity);
}

#[tokio::test]
async fn test_user_cache_over_engine() {
    let engine = CacheEngine::with_capacity(8).unwrap();
    let store: Arc<dyn Storage> = Arc::new(engine.clone());
    let users = UserCache::new(store);
    let cancel = CancellationToken::new();

    users
        .cache_user("123", r#"{"name": "John Doe"}"#, &cancel)
        .await
        .unwrap();

    assert_eq!(
        users.get_user("123", &cancel).await.unwrap(),
        r#"{"name": "John Doe"}"#
    );
    assert!(engine.exists("user:123", &cancel).await.unwrap());

    users.invalidate_user("123", &cancel).await.unwrap();
    assert!(!engine.exists("user:123", &cancel).await.unwrap());
}
