//! Upload ledger repository tests.
//!
//! Run with: `cargo test -p cadenza-db --test pending_upload_test -- --ignored`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use cadenza_core::models::PendingUploadStatus;
use cadenza_core::AppError;
use cadenza_db::{PendingUploadRepository, UploadLedger};
use chrono::{Duration, Utc};
use helpers::{audio, set_expires_at, set_updated_at, setup_test_db};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_register_then_get() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());

    let registered = ledger
        .register(
            audio("round-7/song.mp3")
                .with_file_url("https://cdn.example/round-7/song.mp3")
                .with_uploaded_by(Some("user-1".into()))
                .with_related("submissions", 42)
                .with_metadata(serde_json::json!({ "field": "audio" })),
        )
        .await
        .unwrap();

    assert_eq!(registered.status, PendingUploadStatus::Pending);
    assert!(registered.committed_at.is_none());
    assert!(registered.expires_at > Utc::now() + Duration::hours(23));

    let loaded = ledger.get(registered.id).await.unwrap().unwrap();
    assert_eq!(loaded.file_path, "round-7/song.mp3");
    assert_eq!(loaded.uploaded_by.as_deref(), Some("user-1"));
    assert_eq!(loaded.related_table.as_deref(), Some("submissions"));
    assert_eq!(loaded.related_id, Some(42));
    assert_eq!(loaded.metadata, Some(serde_json::json!({ "field": "audio" })));

    assert!(ledger.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_commit_is_idempotent_and_final() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());
    let upload = ledger.register(audio("a.mp3")).await.unwrap();

    ledger.commit(upload.id).await.unwrap();
    ledger.commit(upload.id).await.unwrap();

    let row = ledger.get(upload.id).await.unwrap().unwrap();
    assert_eq!(row.status, PendingUploadStatus::Committed);
    assert!(row.committed_at.is_some());

    let err = ledger.fail(upload.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let row = ledger.get(upload.id).await.unwrap().unwrap();
    assert_eq!(row.status, PendingUploadStatus::Committed);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_upload_cannot_be_committed() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());
    let upload = ledger.register(audio("a.mp3")).await.unwrap();

    ledger.fail(upload.id).await.unwrap();
    ledger.fail(upload.id).await.unwrap();

    let err = ledger.commit(upload.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let row = ledger.get(upload.id).await.unwrap().unwrap();
    assert_eq!(row.status, PendingUploadStatus::Failed);
    assert!(row.committed_at.is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unknown_id_is_not_found() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());

    let err = ledger.commit(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = ledger.fail(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_commit_many_only_moves_pending_rows() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());
    let first = ledger.register(audio("a.mp3")).await.unwrap();
    let second = ledger.register(audio("b.mp3")).await.unwrap();
    let failed = ledger.register(audio("c.mp3")).await.unwrap();
    ledger.fail(failed.id).await.unwrap();

    let committed = ledger
        .commit_many(&[first.id, second.id, failed.id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(committed, 2);

    for id in [first.id, second.id] {
        let row = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(row.status, PendingUploadStatus::Committed);
    }
    let row = ledger.get(failed.id).await.unwrap().unwrap();
    assert_eq!(row.status, PendingUploadStatus::Failed);

    assert_eq!(ledger.commit_many(&[first.id]).await.unwrap(), 0);
    assert_eq!(ledger.commit_many(&[]).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_get_expired_returns_oldest_pending_first() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());
    let now = Utc::now();

    let older = ledger.register(audio("older.mp3")).await.unwrap();
    let newer = ledger.register(audio("newer.mp3")).await.unwrap();
    let live = ledger.register(audio("live.mp3")).await.unwrap();
    let committed = ledger.register(audio("committed.mp3")).await.unwrap();
    set_expires_at(&db.pool, older.id, now - Duration::hours(5)).await;
    set_expires_at(&db.pool, newer.id, now - Duration::hours(1)).await;
    set_expires_at(&db.pool, committed.id, now - Duration::hours(9)).await;
    ledger.commit(committed.id).await.unwrap();

    let expired = ledger.get_expired(10).await.unwrap();
    let ids: Vec<Uuid> = expired.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
    assert!(!ids.contains(&live.id));

    let limited = ledger.get_expired(1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, older.id);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_delete_removes_the_row() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());
    let upload = ledger.register(audio("a.mp3")).await.unwrap();

    assert!(ledger.delete(upload.id).await.unwrap());
    assert!(ledger.get(upload.id).await.unwrap().is_none());
    assert!(!ledger.delete(upload.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_cleanup_keeps_pending_and_recent_rows() {
    let db = setup_test_db().await;
    let ledger = PendingUploadRepository::new(db.pool.clone());
    let long_ago = Utc::now() - Duration::days(45);

    let old_committed = ledger.register(audio("old-committed.mp3")).await.unwrap();
    ledger.commit(old_committed.id).await.unwrap();
    let old_failed = ledger.register(audio("old-failed.mp3")).await.unwrap();
    ledger.fail(old_failed.id).await.unwrap();
    let old_pending = ledger.register(audio("old-pending.mp3")).await.unwrap();
    let recent = ledger.register(audio("recent.mp3")).await.unwrap();
    ledger.commit(recent.id).await.unwrap();

    for id in [old_committed.id, old_failed.id, old_pending.id] {
        set_updated_at(&db.pool, id, long_ago).await;
    }

    let deleted = ledger.cleanup_old_records(30).await.unwrap();
    assert_eq!(deleted, 2);

    assert!(ledger.get(old_committed.id).await.unwrap().is_none());
    assert!(ledger.get(old_failed.id).await.unwrap().is_none());
    assert!(ledger.get(old_pending.id).await.unwrap().is_some());
    assert!(ledger.get(recent.id).await.unwrap().is_some());
}
