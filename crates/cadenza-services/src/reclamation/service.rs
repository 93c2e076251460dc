use cadenza_core::constants::DEFAULT_UPLOAD_RECORD_RETENTION_DAYS;
use cadenza_core::AppError;
use cadenza_db::{UploadLedger, DEFAULT_EXPIRED_BATCH_SIZE};
use cadenza_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Outcome of one reclamation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclamationReport {
    /// Expired uploads whose object and ledger row were both removed
    pub reclaimed: usize,
    /// Expired uploads left in place because a delete failed; retried next pass
    pub skipped: usize,
    /// Committed/failed rows trimmed past the retention window
    pub trimmed: u64,
}

/// Deletes uploads that stayed pending past their expiry, then trims old ledger rows
#[derive(Clone)]
pub struct ReclamationService {
    ledger: Arc<dyn UploadLedger>,
    storage: Arc<dyn Storage>,
    interval: Duration,
    retention_days: i64,
    batch_size: i64,
}

impl ReclamationService {
    pub fn new(ledger: Arc<dyn UploadLedger>, storage: Arc<dyn Storage>) -> Self {
        Self {
            ledger,
            storage,
            interval: Duration::from_secs(3600),
            retention_days: DEFAULT_UPLOAD_RECORD_RETENTION_DAYS,
            batch_size: DEFAULT_EXPIRED_BATCH_SIZE,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Start the background reclamation loop
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);

            loop {
                ticker.tick().await;

                tracing::info!("Starting scheduled upload reclamation");

                match self.run_once().await {
                    Ok(report) => tracing::info!(
                        reclaimed = report.reclaimed,
                        skipped = report.skipped,
                        trimmed = report.trimmed,
                        "Upload reclamation completed"
                    ),
                    Err(e) => tracing::error!(error = %e, "Upload reclamation failed"),
                }
            }
        })
    }

    /// One pass: reclaim a batch of expired uploads, then trim old records
    #[tracing::instrument(skip(self), fields(reclamation.batch_size = self.batch_size))]
    pub async fn run_once(&self) -> Result<ReclamationReport, AppError> {
        let mut report = ReclamationReport::default();

        for upload in self.ledger.get_expired(self.batch_size).await? {
            let key = upload.storage_key();
            tracing::info!(
                upload_id = %upload.id,
                storage_key = %key,
                expires_at = %upload.expires_at,
                "Reclaiming expired upload"
            );

            // Row stays while the object might still exist so the next pass retries it
            if let Err(e) = self.storage.delete(&key).await {
                tracing::error!(
                    error = %e,
                    upload_id = %upload.id,
                    storage_key = %key,
                    "Failed to delete expired upload from storage, keeping ledger row"
                );
                report.skipped += 1;
                continue;
            }

            match self.ledger.delete(upload.id).await {
                Ok(_) => report.reclaimed += 1,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        upload_id = %upload.id,
                        "Failed to delete ledger row of reclaimed upload"
                    );
                    report.skipped += 1;
                }
            }
        }

        report.trimmed = match self.ledger.cleanup_old_records(self.retention_days).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to trim old upload records");
                0
            }
        };

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{LedgerCall, MockStorage, MockUploadLedger};
    use cadenza_core::models::RegisterPendingUpload;
    use cadenza_core::Bucket;

    fn service(ledger: &MockUploadLedger, storage: &MockStorage) -> ReclamationService {
        ReclamationService::new(Arc::new(ledger.clone()), Arc::new(storage.clone()))
    }

    #[tokio::test]
    async fn deletes_object_then_row_for_expired_uploads() {
        let ledger = MockUploadLedger::new();
        let storage = MockStorage::new();
        storage.set_file("audio-submissions/old.mp3", &b"ID3"[..]);
        let expired = ledger.insert_expired(Bucket::AudioSubmissions, "old.mp3", 2);
        let fresh = ledger
            .register(RegisterPendingUpload::new(Bucket::SubmissionImages, "new.png"))
            .await
            .unwrap();

        let report = service(&ledger, &storage).run_once().await.unwrap();

        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.skipped, 0);
        assert!(!storage.has_file("audio-submissions/old.mp3"));
        assert_eq!(ledger.registered_ids(), vec![fresh.id]);
        assert_eq!(ledger.count(|c| *c == LedgerCall::Delete(expired)), 1);
        assert_eq!(
            storage.deleted_keys(),
            vec!["audio-submissions/old.mp3".to_string()]
        );
    }

    #[tokio::test]
    async fn storage_failure_keeps_row_for_retry() {
        let ledger = MockUploadLedger::new();
        let storage = MockStorage::new();
        storage.fail_deletes(true);
        let expired = ledger.insert_expired(Bucket::AudioSubmissions, "old.mp3", 2);

        let report = service(&ledger, &storage).run_once().await.unwrap();

        assert_eq!(report.reclaimed, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(ledger.registered_ids(), vec![expired]);
        assert_eq!(ledger.count(|c| matches!(c, LedgerCall::Delete(_))), 0);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let ledger = MockUploadLedger::new();
        let storage = MockStorage::new();
        ledger.insert_expired(Bucket::AudioSubmissions, "a.mp3", 3);
        ledger.insert_expired(Bucket::AudioSubmissions, "b.mp3", 2);
        ledger.fail_deletes(true);

        let report = service(&ledger, &storage).run_once().await.unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(storage.deleted_keys().len(), 2);
    }

    #[tokio::test]
    async fn trims_old_records_with_configured_retention() {
        let ledger = MockUploadLedger::new();
        let storage = MockStorage::new();

        service(&ledger, &storage)
            .with_retention_days(7)
            .with_batch_size(10)
            .run_once()
            .await
            .unwrap();

        assert_eq!(
            ledger.calls(),
            vec![LedgerCall::GetExpired(10), LedgerCall::Cleanup(7)]
        );
    }

    #[tokio::test]
    async fn background_loop_runs_immediately() {
        let ledger = MockUploadLedger::new();
        let storage = MockStorage::new();
        ledger.insert_expired(Bucket::SubmissionImages, "c.png", 1);

        let handle = Arc::new(service(&ledger, &storage).with_interval(Duration::from_secs(3600)))
            .start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(ledger.registered_ids().is_empty());
    }
}
