//! Library integration tests: ownership, thumbnails, tags, uploads.
//!
//! Run with: `cargo test -p memoria-services --test library_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::{payload, setup_test_app, setup_test_app_with, stored_file_count, FixedGeocoder, StalledGeocoder};
use memoria_core::{
    models::{Coordinates, ItemMetaUpdate, LocationInput, NewItemMeta},
    AppError,
};
use std::sync::Arc;

fn tags(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_thumbnail_cleared_when_item_soft_deleted() {
    let app = setup_test_app().await;
    let user = app.register_user("luna").await;
    let session = app.app.session(user.session_id).await.unwrap();

    // C1 is the account's second collection
    session.create_collection("C0").await.unwrap();
    let c1 = session.create_collection("C1").await.unwrap();
    assert_eq!(session.list_collections().await.unwrap().len(), 2);

    let p1 = session.create_sub_collection(c1.id, "P1").await.unwrap();
    let mut items = Vec::new();
    for name in ["a.png", "b.png", "c.png"] {
        items.push(
            session
                .add_item(p1.id, payload(name), NewItemMeta::default())
                .await
                .unwrap(),
        );
    }

    let thumbnail = session.set_thumbnail(p1.id, items[1].id).await.unwrap();
    assert_eq!(thumbnail.item_id, items[1].id);
    assert_eq!(app.thumbnail_of(p1.id).await, Some(items[1].id));

    // The thumbnail item is kept out of the gallery listing
    let gallery = session.list_items(p1.id).await.unwrap();
    assert_eq!(gallery.len(), 2);
    assert!(gallery.iter().all(|i| i.item.id != items[1].id));

    session.soft_delete_item(items[1].id).await.unwrap();

    assert_eq!(app.thumbnail_of(p1.id).await, None);
    assert_eq!(app.live_item_count(p1.id).await, 2);

    let summaries = session.list_sub_collections(c1.id).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].thumbnail_item_id, None);
    assert_eq!(summaries[0].thumbnail_url, None);
}

#[tokio::test]
async fn test_soft_deleting_twice_is_not_found_for_owner() {
    let app = setup_test_app().await;
    let user = app.register_user("sol").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();
    let item = session
        .add_item(sub.id, payload("x.png"), NewItemMeta::default())
        .await
        .unwrap();

    session.soft_delete_item(item.id).await.unwrap();
    // A deleted target no longer resolves for anyone
    let err = session.soft_delete_item(item.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_foreign_account_is_forbidden_everywhere() {
    let app = setup_test_app().await;
    let owner = app.register_user("owner").await;
    let intruder = app.register_user("intruder").await;
    let owner_session = app.app.session(owner.session_id).await.unwrap();
    let intruder_session = app.app.session(intruder.session_id).await.unwrap();

    let collection = owner_session.create_collection("mine").await.unwrap();
    let sub = owner_session
        .create_sub_collection(collection.id, "mine too")
        .await
        .unwrap();
    let item = owner_session
        .add_item(sub.id, payload("x.png"), NewItemMeta::default())
        .await
        .unwrap();

    let results = [
        intruder_session
            .create_sub_collection(collection.id, "sneaky")
            .await
            .map(|_| ()),
        intruder_session
            .rename_collection(collection.id, "renamed")
            .await
            .map(|_| ()),
        intruder_session.delete_collection(collection.id).await,
        intruder_session
            .add_item(sub.id, payload("y.png"), NewItemMeta::default())
            .await
            .map(|_| ()),
        intruder_session.soft_delete_item(item.id).await,
        intruder_session
            .reconcile_tags(item.id, &tags(&["x"]))
            .await
            .map(|_| ()),
        intruder_session.list_items(sub.id).await.map(|_| ()),
        intruder_session
            .set_thumbnail(sub.id, item.id)
            .await
            .map(|_| ()),
        intruder_session
            .replace_thumbnail(sub.id, payload("t.png"))
            .await
            .map(|_| ()),
    ];
    for result in results {
        assert!(matches!(result, Err(AppError::Forbidden(_))), "{:?}", result);
    }

    assert_eq!(app.live_item_count(sub.id).await, 1);
    assert_eq!(
        owner_session.list_collections().await.unwrap()[0].name,
        "mine"
    );
}

#[tokio::test]
async fn test_tag_reconciliation_is_idempotent_and_clearable() {
    let app = setup_test_app().await;
    let user = app.register_user("terra").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();
    let item = session
        .add_item(sub.id, payload("x.png"), NewItemMeta::default())
        .await
        .unwrap();

    let applied = session
        .reconcile_tags(item.id, &tags(&["a", "b", "a", " "]))
        .await
        .unwrap();
    assert_eq!(applied, tags(&["a", "b"]));

    session
        .reconcile_tags(item.id, &tags(&["b", "a"]))
        .await
        .unwrap();
    assert_eq!(session.item_tags(item.id).await.unwrap(), tags(&["a", "b"]));

    let link_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item_tags WHERE item_id = $1")
        .bind(item.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(link_count, 2);

    session.reconcile_tags(item.id, &[]).await.unwrap();
    assert!(session.item_tags(item.id).await.unwrap().is_empty());

    // Tag rows survive unlinking
    let tag_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name IN ('a', 'b')")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(tag_rows, 2);
}

#[tokio::test]
async fn test_update_item_meta_overwrites_and_keeps_tags_unless_given() {
    let app = setup_test_app_with(Arc::new(FixedGeocoder(Coordinates {
        latitude: 37.5665,
        longitude: 126.978,
    })))
    .await;
    let user = app.register_user("mars").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();
    let item = session
        .add_item(
            sub.id,
            payload("x.png"),
            NewItemMeta {
                description: Some("  first light ".to_string()),
                location: Some(LocationInput {
                    name: "Seoul".to_string(),
                    coordinates: None,
                }),
                tags: tags(&["sky", "night"]),
            },
        )
        .await
        .unwrap();

    assert_eq!(item.description.as_deref(), Some("first light"));
    assert_eq!(item.location_name.as_deref(), Some("Seoul"));
    assert_eq!(item.latitude, Some(37.5665));
    assert_eq!(item.longitude, Some(126.978));

    let locations = session.list_map_locations().await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].item_id, item.id);

    session
        .update_item_meta(
            item.id,
            ItemMetaUpdate {
                description: Some("second light".to_string()),
                location: None,
                tags: None,
            },
        )
        .await
        .unwrap();

    let listed = session.list_items(sub.id).await.unwrap();
    assert_eq!(listed[0].item.description.as_deref(), Some("second light"));
    assert_eq!(listed[0].item.location_name, None);
    assert_eq!(listed[0].item.latitude, None);
    assert_eq!(listed[0].tags, tags(&["night", "sky"]));
    assert!(session.list_map_locations().await.unwrap().is_empty());

    session
        .update_item_coordinates(
            item.id,
            Some(Coordinates {
                latitude: 35.1796,
                longitude: 129.0756,
            }),
        )
        .await
        .unwrap();
    assert_eq!(session.list_map_locations().await.unwrap().len(), 1);

    let err = session
        .update_item_coordinates(
            item.id,
            Some(Coordinates {
                latitude: 95.0,
                longitude: 0.0,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_geocoding_timeout_leaves_coordinates_unset() {
    let app = setup_test_app_with(Arc::new(StalledGeocoder)).await;
    let user = app.register_user("venus").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();
    let item = session
        .add_item(
            sub.id,
            payload("x.png"),
            NewItemMeta {
                location: Some(LocationInput {
                    name: "Nowhere".to_string(),
                    coordinates: None,
                }),
                ..NewItemMeta::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(item.location_name.as_deref(), Some("Nowhere"));
    assert_eq!(item.latitude, None);
    assert_eq!(item.longitude, None);
}

#[tokio::test]
async fn test_replace_thumbnail_updates_in_place() {
    let app = setup_test_app().await;
    let user = app.register_user("jupiter").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();

    let first = session
        .upload_thumbnail(sub.id, "cover.png", "image/png", b"first".to_vec())
        .await
        .unwrap();
    assert!(!first.replaced);
    assert_eq!(stored_file_count(&app), 1);

    let second = session
        .upload_thumbnail(sub.id, "cover2.png", "image/png", b"second".to_vec())
        .await
        .unwrap();
    assert!(second.replaced);
    assert_eq!(second.item_id, first.item_id);
    assert_ne!(second.url, first.url);

    // Old object removed, no extra rows accumulated
    assert_eq!(stored_file_count(&app), 1);
    assert_eq!(app.live_item_count(sub.id).await, 1);
    assert_eq!(app.thumbnail_of(sub.id).await, Some(first.item_id));
}

#[tokio::test]
async fn test_replace_thumbnail_racing_item_delete_never_points_at_deleted_item() {
    let app = setup_test_app().await;
    let user = app.register_user("callisto").await;
    let session = app.app.session(user.session_id).await.unwrap();
    let collection = session.create_collection("c").await.unwrap();

    for round in 0..6 {
        let sub = session
            .create_sub_collection(collection.id, &format!("p{}", round))
            .await
            .unwrap();
        let current = session
            .replace_thumbnail(sub.id, payload("old.png"))
            .await
            .unwrap();

        let (replaced, deleted) = futures::join!(
            session.replace_thumbnail(sub.id, payload("new.png")),
            session.soft_delete_item(current.item_id)
        );

        for err in [replaced.as_ref().err(), deleted.as_ref().err()].into_iter().flatten() {
            assert!(
                matches!(err, AppError::Conflict(_) | AppError::Forbidden(_)),
                "unexpected error: {:?}",
                err
            );
        }

        let dangling: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sub_collections s JOIN items i ON i.id = s.thumbnail_item_id \
             WHERE s.id = $1 AND i.is_deleted",
        )
        .bind(sub.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
        assert_eq!(dangling, 0);

        let thumbnail = app.thumbnail_of(sub.id).await;
        match (&replaced, &deleted) {
            // Delete ran after an in-place replace: the slot is empty
            (Ok(r), Ok(())) if r.replaced => {
                assert_eq!(r.item_id, current.item_id);
                assert_eq!(thumbnail, None);
            }
            // Delete ran first: a fresh item took the slot
            (Ok(r), Ok(())) => {
                assert_ne!(r.item_id, current.item_id);
                assert_eq!(thumbnail, Some(r.item_id));
            }
            (Ok(r), Err(_)) => assert_eq!(thumbnail, Some(r.item_id)),
            (Err(_), Ok(())) => assert_eq!(thumbnail, None),
            (Err(_), Err(_)) => assert_eq!(thumbnail, Some(current.item_id)),
        }
    }
}

#[tokio::test]
async fn test_upload_item_cleans_up_when_insert_fails() {
    let app = setup_test_app().await;
    let user = app.register_user("saturn").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();

    let item = session
        .upload_item(
            sub.id,
            "ok.png",
            "image/png",
            b"pixels".to_vec(),
            NewItemMeta::default(),
        )
        .await
        .unwrap();
    assert_eq!(item.size_bytes, 6);
    assert_eq!(stored_file_count(&app), 1);

    let err = session
        .upload_item(
            sub.id,
            "bad.png",
            "image/png",
            b"pixels".to_vec(),
            NewItemMeta {
                tags: vec!["x".repeat(200)],
                ..NewItemMeta::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(stored_file_count(&app), 1);

    let err = session
        .upload_item(
            sub.id,
            "doc.pdf",
            "application/pdf",
            b"%PDF".to_vec(),
            NewItemMeta::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(stored_file_count(&app), 1);
}

#[tokio::test]
async fn test_deleted_collection_hides_its_sub_collections() {
    let app = setup_test_app().await;
    let user = app.register_user("pluto").await;
    let session = app.app.session(user.session_id).await.unwrap();

    let collection = session.create_collection("c").await.unwrap();
    let sub = session.create_sub_collection(collection.id, "p").await.unwrap();
    assert_eq!(session.post_count().await.unwrap(), 1);

    session.delete_collection(collection.id).await.unwrap();

    assert!(session.list_collections().await.unwrap().is_empty());
    assert_eq!(session.post_count().await.unwrap(), 0);
    let err = session
        .add_item(sub.id, payload("x.png"), NewItemMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
