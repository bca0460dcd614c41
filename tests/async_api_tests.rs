//! Tests for the spawned `*_async` operation variants and their one-shot
//! result delivery.

mod common;

use common::fixture_provider;
use recall::{BatchItem, RecallError, SemanticCache, SemanticCacheBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn ctx() -> CancellationToken {
    CancellationToken::new()
}

async fn fixture_cache() -> SemanticCache<String, String> {
    SemanticCacheBuilder::new()
        .lru_backend(100)
        .provider(Arc::new(fixture_provider()))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_set_async_then_get_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    cache
        .set_async(&ctx, "k".into(), "hello", "v".into())
        .await
        .expect("sender dropped")
        .expect("set failed");

    let result = cache
        .get_async(&ctx, "k".into())
        .await
        .expect("sender dropped")
        .expect("get failed");
    assert_eq!(result, Some("v".into()));
}

#[tokio::test]
async fn test_get_async_missing_key() {
    let cache = fixture_cache().await;
    let result = cache
        .get_async(&ctx(), "nope".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_set_async_zero_key() {
    let cache = fixture_cache().await;
    let err = cache
        .set_async(&ctx(), String::new(), "hello", "v".into())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RecallError::ZeroKey));
}

#[tokio::test]
async fn test_delete_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    cache.set(&ctx, "k".into(), "hello", "v".into()).await.unwrap();
    cache.delete_async(&ctx, "k".into()).await.unwrap().unwrap();
    assert_eq!(cache.get(&ctx, &"k".to_string()).await.unwrap(), None);
}

#[tokio::test]
async fn test_contains_flush_len_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    cache.set(&ctx, "k".into(), "hello", "v".into()).await.unwrap();

    assert!(cache.contains_async(&ctx, "k".into()).await.unwrap().unwrap());
    assert_eq!(cache.len_async(&ctx).await.unwrap().unwrap(), 1);

    cache.flush_async(&ctx).await.unwrap().unwrap();
    assert_eq!(cache.len_async(&ctx).await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_unread_receivers_still_complete() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    // Fire a write and drop the receiver immediately: the result channel
    // buffers one value, so the worker finishes and the write lands.
    drop(cache.set_async(&ctx, "fire".into(), "hello", "forget".into()));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if cache.contains(&ctx, &"fire".to_string()).await.unwrap() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "dropped-receiver write never landed"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_lookup_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    cache.set(&ctx, "k1".into(), "hello", "v1".into()).await.unwrap();

    let m = cache
        .lookup_async(&ctx, "similar", 0.5)
        .await
        .unwrap()
        .unwrap()
        .expect("expected a match");
    assert_eq!(m.value, "v1");

    let miss = cache
        .lookup_async(&ctx, "unknown-word", 0.99)
        .await
        .unwrap()
        .unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn test_top_matches_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    cache.set(&ctx, "k1".into(), "hello", "v1".into()).await.unwrap();
    cache.set(&ctx, "k2".into(), "world", "v2".into()).await.unwrap();

    let matches = cache
        .top_matches_async(&ctx, "hello", 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].value, "v1");

    let err = cache
        .top_matches_async(&ctx, "hello", 0)
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RecallError::InvalidTopN));
}

#[tokio::test]
async fn test_set_batch_async_writes_all() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    let items: Vec<BatchItem<String, String>> = (0..10)
        .map(|i| BatchItem {
            key: format!("k{i}"),
            input_text: "hello".into(),
            value: format!("v{i}"),
        })
        .collect();

    cache.set_batch_async(&ctx, items).await.unwrap().unwrap();

    assert_eq!(cache.len(&ctx).await.unwrap(), 10);
    for i in 0..10 {
        assert_eq!(
            cache.get(&ctx, &format!("k{i}")).await.unwrap(),
            Some(format!("v{i}"))
        );
    }
}

#[tokio::test]
async fn test_set_batch_async_rejects_zero_key_upfront() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    let items = vec![
        BatchItem {
            key: "good".to_string(),
            input_text: "hello".into(),
            value: "v".to_string(),
        },
        BatchItem {
            key: String::new(),
            input_text: "world".into(),
            value: "v".to_string(),
        },
    ];

    let err = cache.set_batch_async(&ctx, items).await.unwrap().unwrap_err();
    assert!(matches!(err, RecallError::ZeroKey));
    // Validation happens before any task is spawned; nothing was written.
    assert_eq!(cache.len(&ctx).await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_batch_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    cache.set(&ctx, "k1".into(), "hello", "v1".into()).await.unwrap();
    cache.set(&ctx, "k2".into(), "world", "v2".into()).await.unwrap();

    let values = cache
        .get_batch_async(&ctx, vec!["k1".into(), "missing".into(), "k2".into()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values["k1"], "v1");
    assert_eq!(values["k2"], "v2");
}

#[tokio::test]
async fn test_delete_batch_async() {
    let cache = fixture_cache().await;
    let ctx = ctx();

    for k in ["k1", "k2", "k3", "k4"] {
        cache.set(&ctx, k.into(), "hello", k.into()).await.unwrap();
    }

    cache
        .delete_batch_async(&ctx, vec!["k1".into(), "k3".into()])
        .await
        .unwrap()
        .unwrap();

    assert_eq!(cache.len(&ctx).await.unwrap(), 2);
    assert!(cache.contains(&ctx, &"k2".to_string()).await.unwrap());
    assert!(cache.contains(&ctx, &"k4".to_string()).await.unwrap());
}

#[tokio::test]
async fn test_cancelled_async_op_reports_cancellation() {
    let cache = fixture_cache().await;
    let ctx = CancellationToken::new();
    ctx.cancel();

    let err = cache
        .set_async(&ctx, "k".into(), "hello", "v".into())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RecallError::Cancelled));
}
