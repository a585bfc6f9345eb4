mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use shoal_core::{FunctionReply, ItemType, RemoteError, WireRequest};
use shoal_session::{ops, ops::Operation, SessionError};
use support::{authenticated_session, FakeServer};

fn items_args() -> ops::GetItems {
    ops::GetItems {
        item_type: ItemType::Gallery,
        fields: None,
        offset: None,
        limit: Some(10),
    }
}

fn counted_reply(requests: &[WireRequest]) -> Option<Vec<FunctionReply>> {
    Some(
        requests
            .iter()
            .map(|request| FunctionReply {
                fname: request.fname.clone(),
                data: json!({"count": 1, "items": [{"id": 5}]}),
                error: None,
            })
            .collect(),
    )
}

#[tokio::test]
async fn identical_read_is_served_from_cache() {
    let server = FakeServer::spawn(counted_reply).await;
    let session = authenticated_session(&server).await;

    let first = session.items(items_args()).await.expect("first call");
    let second = session.items(items_args()).await.expect("second call");

    assert_eq!(first, second);
    assert_eq!(server.batch_count(), 1, "second call must not hit the wire");
}

#[tokio::test]
async fn invalidation_forces_the_next_call_back_onto_the_wire() {
    let server = FakeServer::spawn(counted_reply).await;
    let session = authenticated_session(&server).await;

    session.items(items_args()).await.expect("first call");
    session.items(items_args()).await.expect("cached call");
    assert_eq!(server.batch_count(), 1);

    let fingerprint = items_args().request().fingerprint();
    assert!(session.cache().invalidate(&fingerprint));

    session.items(items_args()).await.expect("refetched call");
    assert_eq!(server.batch_count(), 2);
}

#[tokio::test]
async fn invalidate_all_clears_every_read() {
    let server = FakeServer::spawn(counted_reply).await;
    let session = authenticated_session(&server).await;

    session.items(items_args()).await.expect("items");
    session
        .library(ops::LibraryView {
            item_type: ItemType::Gallery,
            fields: None,
            page: None,
            limit: Some(1),
            metatags: None,
            filter_id: None,
            sort_by: None,
            sort_desc: None,
            search_query: None,
        })
        .await
        .expect("library");
    assert_eq!(server.batch_count(), 2);

    session.cache().invalidate_all();

    session.items(items_args()).await.expect("items again");
    assert_eq!(server.batch_count(), 3);
}

#[tokio::test]
async fn error_replies_are_never_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let server = FakeServer::spawn(move |requests: &[WireRequest]| {
        let attempt = seen.fetch_add(1, Ordering::SeqCst);
        Some(
            requests
                .iter()
                .map(|request| {
                    if attempt == 0 {
                        FunctionReply {
                            fname: request.fname.clone(),
                            data: json!(null),
                            error: Some(RemoteError {
                                code: 500,
                                msg: "transient".to_string(),
                            }),
                        }
                    } else {
                        FunctionReply {
                            fname: request.fname.clone(),
                            data: json!({"count": 0, "items": []}),
                            error: None,
                        }
                    }
                })
                .collect(),
        )
    })
    .await;
    let session = authenticated_session(&server).await;

    let err = session.items(items_args()).await.expect_err("first fails");
    assert_eq!(err.remote_code(), Some(500));

    // The failure must not satisfy the next identical call.
    let items = session.items(items_args()).await.expect("second succeeds");
    assert_eq!(items.count, 0);
    assert_eq!(server.batch_count(), 2);
}

#[tokio::test]
async fn cache_hit_bypasses_the_batcher_entirely() {
    let server = FakeServer::spawn(counted_reply).await;
    let session = authenticated_session(&server).await;

    // Prime the cache with a direct call.
    session.items(items_args()).await.expect("prime");
    assert_eq!(server.batch_count(), 1);

    let scope = session.group();
    let cached = scope.enqueue(&items_args()).expect("enqueue cached read");
    let fresh = scope
        .enqueue(&ops::GetItems {
            item_type: ItemType::Artist,
            fields: None,
            offset: None,
            limit: None,
        })
        .expect("enqueue uncached read");
    assert_eq!(scope.len(), 1, "cache hit must not register a request");

    // The cached handle resolves before any flush happens.
    let items = cached.resolve().await.expect("cached result");
    assert_eq!(items.count, 1);

    scope.flush().await.expect("flush");
    let batches = server.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].len(), 1);
    assert_eq!(batches[1][0].fname, "get_items");
    fresh.resolve().await.expect("fresh result");
}
