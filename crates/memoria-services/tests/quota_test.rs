//! Quota enforcement under concurrent creates.
//!
//! Run with: `cargo test -p memoria-services --test quota_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use futures::future::join_all;
use helpers::setup_test_app;
use memoria_core::AppError;

#[tokio::test]
async fn test_concurrent_collection_creates_stop_at_limit() {
    let app = setup_test_app().await;
    let user = app.register_user("nova").await;
    let limit = app.config.quotas.max_collections_per_account;

    let attempts = (0..20).map(|i| {
        let library = app.app.library().clone();
        let account_id = user.id();
        tokio::spawn(async move {
            library
                .create_collection(account_id, &format!("star {}", i))
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::QuotaExceeded { .. })))
        .count();

    assert_eq!(created as i64, limit);
    assert_eq!(created + rejected, 20);

    let live = app
        .app
        .library()
        .list_collections(user.id())
        .await
        .unwrap();
    assert_eq!(live.len() as i64, limit);
}

#[tokio::test]
async fn test_concurrent_sub_collection_creates_stop_at_limit() {
    let app = setup_test_app().await;
    let user = app.register_user("comet").await;
    let limit = app.config.quotas.max_sub_collections_per_collection;

    let session = app.app.session(user.session_id).await.unwrap();
    let collection = session.create_collection("galaxy").await.unwrap();

    let attempts = (0..15).map(|i| {
        let library = app.app.library().clone();
        let account_id = user.id();
        let collection_id = collection.id;
        tokio::spawn(async move {
            library
                .create_sub_collection(account_id, collection_id, &format!("planet {}", i))
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(created as i64, limit);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(AppError::QuotaExceeded { used, limit: l, .. }) if *used == limit && *l == limit)));

    let listed = session.list_sub_collections(collection.id).await.unwrap();
    assert_eq!(listed.len() as i64, limit);

    // Sort order is dense and unique even under concurrency
    let mut orders: Vec<i32> = listed.iter().map(|s| s.sort_order).collect();
    orders.sort_unstable();
    assert_eq!(orders, (1..=limit as i32).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_deleted_rows_free_quota() {
    let app = setup_test_app().await;
    let user = app.register_user("pulsar").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("full").await.unwrap();
    let mut last = None;
    for i in 0..app.config.quotas.max_sub_collections_per_collection {
        last = Some(
            session
                .create_sub_collection(collection.id, &format!("p{}", i))
                .await
                .unwrap(),
        );
    }

    let err = session
        .create_sub_collection(collection.id, "one too many")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded { .. }));

    session
        .soft_delete_sub_collection(last.unwrap().id)
        .await
        .unwrap();
    session
        .create_sub_collection(collection.id, "replacement")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_blank_collection_name_is_rejected() {
    let app = setup_test_app().await;
    let user = app.register_user("quasar").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let err = session.create_collection("   ").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(session.list_collections().await.unwrap().is_empty());
}
