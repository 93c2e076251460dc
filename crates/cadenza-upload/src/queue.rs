//! Multi-file uploads with bounded concurrency
//!
//! `run` picks up every item that is waiting or failed and starts `concurrency` lanes over
//! that batch. Lane `k` visits items `k, k + N, k + 2N, ...`, so each item is uploaded by
//! exactly one lane and no cursor is shared. An item is claimed under the queue lock before
//! its upload starts; a completed item is never uploaded again. Items pushed after `run`
//! starts wait for the next run.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cadenza_core::models::UploadResult;
use cadenza_core::Bucket;
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::reducer::SelectedFile;
use crate::transport::{TransportError, Uploader};

pub const DEFAULT_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemStatus {
    Pending,
    Uploading,
    Complete,
    Error,
    Cancelled,
}

impl QueueItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueItemStatus::Complete | QueueItemStatus::Error | QueueItemStatus::Cancelled
        )
    }

    /// Whether the next `run` uploads an item in this status
    pub fn is_runnable(&self) -> bool {
        matches!(self, QueueItemStatus::Pending | QueueItemStatus::Error)
    }
}

#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Stable for the item's lifetime; never reused after removal
    pub id: usize,
    pub bucket: Bucket,
    pub file: Arc<SelectedFile>,
    pub status: QueueItemStatus,
    pub progress: f64,
    pub result: Option<UploadResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Status { id: usize, status: QueueItemStatus },
    Progress { id: usize, progress: f64 },
}

struct Entry {
    item: QueueItem,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Entries {
    next_id: usize,
    list: Vec<Entry>,
}

impl Entries {
    fn get_mut(&mut self, id: usize) -> Option<&mut Entry> {
        self.list.iter_mut().find(|e| e.item.id == id)
    }
}

pub struct UploadQueue {
    uploader: Arc<dyn Uploader>,
    concurrency: usize,
    entries: Mutex<Entries>,
}

impl UploadQueue {
    pub fn new(uploader: Arc<dyn Uploader>) -> Self {
        Self {
            uploader,
            concurrency: DEFAULT_CONCURRENCY,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, id: usize, f: impl FnOnce(&mut QueueItem)) {
        if let Some(entry) = self.lock().get_mut(id) {
            f(&mut entry.item);
        }
    }

    /// Append a file; returns its id
    pub fn push(&self, bucket: Bucket, file: SelectedFile) -> usize {
        let mut entries = self.lock();
        let id = entries.next_id;
        entries.next_id += 1;
        entries.list.push(Entry {
            item: QueueItem {
                id,
                bucket,
                file: Arc::new(file),
                status: QueueItemStatus::Pending,
                progress: 0.0,
                result: None,
                error: None,
            },
            cancel: CancellationToken::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state of every item, in push order
    pub fn items(&self) -> Vec<QueueItem> {
        self.lock().list.iter().map(|e| e.item.clone()).collect()
    }

    pub fn item(&self, id: usize) -> Option<QueueItem> {
        self.lock().get_mut(id).map(|e| e.item.clone())
    }

    /// Results of every completed item, in push order
    pub fn results(&self) -> Vec<UploadResult> {
        self.lock()
            .list
            .iter()
            .filter_map(|e| e.item.result.clone())
            .collect()
    }

    /// Cancel a waiting or in-flight item; an in-flight request is dropped.
    /// Returns false for unknown ids and items that already settled.
    pub fn cancel(&self, id: usize) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(id) {
            Some(entry) if !entry.item.status.is_terminal() => {
                entry.cancel.cancel();
                entry.item.status = QueueItemStatus::Cancelled;
                entry.item.progress = 0.0;
                true
            }
            _ => false,
        }
    }

    /// Cancel every waiting and in-flight item; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let mut entries = self.lock();
        let mut cancelled = 0;
        for entry in entries
            .list
            .iter_mut()
            .filter(|e| !e.item.status.is_terminal())
        {
            entry.cancel.cancel();
            entry.item.status = QueueItemStatus::Cancelled;
            entry.item.progress = 0.0;
            cancelled += 1;
        }
        cancelled
    }

    /// Drop an item, cancelling it first if it is in flight
    pub fn remove(&self, id: usize) -> bool {
        let mut entries = self.lock();
        match entries.list.iter().position(|e| e.item.id == id) {
            Some(pos) => {
                let entry = entries.list.remove(pos);
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop completed and failed items; returns how many were removed
    pub fn clear_completed(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.list.len();
        entries.list.retain(|e| {
            !matches!(
                e.item.status,
                QueueItemStatus::Complete | QueueItemStatus::Error
            )
        });
        before - entries.list.len()
    }

    /// Upload every waiting or failed item, reporting transitions through `on_event`
    ///
    /// Returns the items this run picked up, in push order.
    pub async fn run<F>(&self, on_event: F) -> Vec<QueueItem>
    where
        F: Fn(QueueEvent) + Send + Sync,
    {
        let batch: Vec<usize> = self
            .lock()
            .list
            .iter()
            .filter(|e| e.item.status.is_runnable())
            .map(|e| e.item.id)
            .collect();

        let lanes = self.concurrency.min(batch.len());
        tracing::debug!(items = batch.len(), lanes, "Starting upload queue");

        let lane_futures = (0..lanes).map(|lane| {
            let batch = &batch;
            let on_event = &on_event;
            async move {
                let mut cursor = lane;
                while cursor < batch.len() {
                    self.run_item(batch[cursor], on_event).await;
                    cursor += lanes;
                }
            }
        });
        join_all(lane_futures).await;

        let mut entries = self.lock();
        batch
            .iter()
            .filter_map(|id| entries.get_mut(*id).map(|e| e.item.clone()))
            .collect()
    }

    /// Upload one failed or cancelled item again right away
    ///
    /// Returns the settled item, or `None` when the id is unknown or the item is not in a
    /// retryable state.
    pub async fn retry<F>(&self, id: usize, on_event: F) -> Option<QueueItem>
    where
        F: Fn(QueueEvent) + Send + Sync,
    {
        {
            let mut entries = self.lock();
            let entry = entries.get_mut(id)?;
            if !matches!(
                entry.item.status,
                QueueItemStatus::Error | QueueItemStatus::Cancelled
            ) {
                return None;
            }
            entry.item.status = QueueItemStatus::Pending;
            entry.item.error = None;
            entry.item.progress = 0.0;
            entry.cancel = CancellationToken::new();
        }

        self.run_item(id, &on_event).await;
        self.item(id)
    }

    /// Claim the item if it is still runnable, then upload it and record the outcome
    async fn run_item<F>(&self, id: usize, on_event: &F)
    where
        F: Fn(QueueEvent) + Send + Sync,
    {
        let claimed = {
            let mut entries = self.lock();
            match entries.get_mut(id) {
                Some(entry) if entry.item.status.is_runnable() && !entry.cancel.is_cancelled() => {
                    entry.item.status = QueueItemStatus::Uploading;
                    entry.item.progress = 0.0;
                    entry.item.error = None;
                    Some((
                        entry.item.bucket,
                        Arc::clone(&entry.item.file),
                        entry.cancel.clone(),
                    ))
                }
                _ => None,
            }
        };
        let Some((bucket, file, cancel)) = claimed else {
            return;
        };

        on_event(QueueEvent::Status {
            id,
            status: QueueItemStatus::Uploading,
        });

        let on_progress = |progress: f64| {
            let progress = progress.clamp(0.0, 100.0);
            self.update(id, |item| item.progress = progress);
            on_event(QueueEvent::Progress { id, progress });
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.uploader.upload(bucket, &file, &on_progress) => result,
        };

        let status = match outcome {
            Ok(result) => {
                self.update(id, |item| {
                    item.status = QueueItemStatus::Complete;
                    item.progress = 100.0;
                    item.result = Some(result);
                });
                QueueItemStatus::Complete
            }
            Err(TransportError::Cancelled) => {
                tracing::info!(id, file_name = %file.name, "Upload cancelled");
                self.update(id, |item| {
                    item.status = QueueItemStatus::Cancelled;
                    item.progress = 0.0;
                });
                QueueItemStatus::Cancelled
            }
            Err(e) => {
                tracing::warn!(id, file_name = %file.name, error = %e, "Queued upload failed");
                self.update(id, |item| {
                    item.status = QueueItemStatus::Error;
                    item.progress = 0.0;
                    item.error = Some(e.to_string());
                });
                QueueItemStatus::Error
            }
        };
        on_event(QueueEvent::Status { id, status });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ProgressFn;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// `bad*` files always fail, `flaky*` files fail on their first attempt,
    /// `hang*` files take ten seconds.
    #[derive(Default)]
    struct SlowUploader {
        active: AtomicUsize,
        max_active: AtomicUsize,
        started: Mutex<Vec<String>>,
    }

    impl SlowUploader {
        fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Uploader for SlowUploader {
        async fn upload(
            &self,
            bucket: Bucket,
            file: &SelectedFile,
            progress: ProgressFn<'_>,
        ) -> Result<UploadResult, TransportError> {
            let attempt = {
                let mut started = self.started.lock().unwrap();
                started.push(file.name.clone());
                started.iter().filter(|n| **n == file.name).count()
            };
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            let delay = if file.name.starts_with("hang") { 10_000 } else { 20 };
            progress(50.0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if file.name.starts_with("bad") || (file.name.starts_with("flaky") && attempt == 1) {
                return Err(TransportError::DirectUpload("HTTP 500".to_string()));
            }
            Ok(UploadResult {
                url: format!("https://cdn.example.com/{}", bucket.storage_key(&file.name)),
                path: file.name.clone(),
                file_size: Some(file.size()),
                mime_type: Some(file.content_type.clone()),
                metadata: None,
            })
        }
    }

    fn file(name: &str) -> SelectedFile {
        SelectedFile::new(name, "image/png", Bytes::from_static(b"png"))
    }

    fn statuses(queue: &UploadQueue) -> Vec<QueueItemStatus> {
        queue.items().iter().map(|i| i.status).collect()
    }

    #[tokio::test]
    async fn runs_at_most_n_uploads_at_once() {
        let uploader = Arc::new(SlowUploader::default());
        let queue = UploadQueue::new(uploader.clone());
        for i in 0..7 {
            queue.push(Bucket::SubmissionImages, file(&format!("f{}.png", i)));
        }

        let items = queue.run(|_| {}).await;

        assert_eq!(items.len(), 7);
        assert!(items.iter().all(|i| i.status == QueueItemStatus::Complete));
        assert_eq!(uploader.max_active.load(Ordering::SeqCst), DEFAULT_CONCURRENCY);
        // Lanes start on their first item before anything else
        let started = uploader.started();
        let mut first: Vec<&str> = started[..3].iter().map(String::as_str).collect();
        first.sort();
        assert_eq!(first, vec!["f0.png", "f1.png", "f2.png"]);
    }

    #[tokio::test]
    async fn completed_items_are_not_uploaded_again() {
        let uploader = Arc::new(SlowUploader::default());
        let queue = UploadQueue::new(uploader.clone());
        queue.push(Bucket::SubmissionImages, file("a.png"));
        queue.run(|_| {}).await;

        let b = queue.push(Bucket::SubmissionImages, file("b.png"));
        let second = queue.run(|_| {}).await;

        assert_eq!(uploader.started(), vec!["a.png".to_string(), "b.png".to_string()]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, b);
        assert_eq!(statuses(&queue), vec![QueueItemStatus::Complete; 2]);
        assert_eq!(queue.results().len(), 2);
    }

    #[tokio::test]
    async fn failed_items_are_picked_up_by_the_next_run() {
        let uploader = Arc::new(SlowUploader::default());
        let queue = UploadQueue::new(uploader.clone());
        queue.push(Bucket::SubmissionImages, file("ok.png"));
        queue.push(Bucket::SubmissionImages, file("flaky.png"));

        let first = queue.run(|_| {}).await;
        assert_eq!(first[1].status, QueueItemStatus::Error);

        let second = queue.run(|_| {}).await;

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].status, QueueItemStatus::Complete);
        assert!(second[0].error.is_none());
        assert_eq!(
            uploader.started(),
            vec!["ok.png".to_string(), "flaky.png".to_string(), "flaky.png".to_string()]
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_other_items() {
        let queue = UploadQueue::new(Arc::new(SlowUploader::default())).with_concurrency(2);
        queue.push(Bucket::SubmissionImages, file("ok.png"));
        queue.push(Bucket::SubmissionImages, file("bad.png"));
        queue.push(Bucket::SubmissionImages, file("ok2.png"));

        let items = queue.run(|_| {}).await;

        assert_eq!(items[0].status, QueueItemStatus::Complete);
        assert_eq!(items[1].status, QueueItemStatus::Error);
        assert_eq!(items[1].error.as_deref(), Some("Upload failed: HTTP 500"));
        assert_eq!(items[2].status, QueueItemStatus::Complete);
        assert_eq!(items[2].result.as_ref().map(|r| r.path.as_str()), Some("ok2.png"));
    }

    #[tokio::test]
    async fn retry_uploads_one_failed_item() {
        let uploader = Arc::new(SlowUploader::default());
        let queue = UploadQueue::new(uploader.clone());
        queue.push(Bucket::SubmissionImages, file("ok.png"));
        let flaky = queue.push(Bucket::SubmissionImages, file("flaky.png"));
        queue.run(|_| {}).await;

        let retried = queue.retry(flaky, |_| {}).await.unwrap();

        assert_eq!(retried.status, QueueItemStatus::Complete);
        assert_eq!(uploader.started().len(), 3);
        // Completed items are not retryable
        assert!(queue.retry(flaky, |_| {}).await.is_none());
        assert!(queue.retry(99, |_| {}).await.is_none());
        assert_eq!(uploader.started().len(), 3);
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_upload() {
        let queue = UploadQueue::new(Arc::new(SlowUploader::default()));
        queue.push(Bucket::SubmissionImages, file("a.png"));
        let hanging = queue.push(Bucket::SubmissionImages, file("hang.png"));

        let (items, cancelled) = tokio::join!(queue.run(|_| {}), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.cancel(hanging)
        });

        assert!(cancelled);
        assert_eq!(items[0].status, QueueItemStatus::Complete);
        assert_eq!(items[1].status, QueueItemStatus::Cancelled);
        assert!(!queue.cancel(hanging));
    }

    #[tokio::test]
    async fn cancelled_before_start_is_skipped() {
        let uploader = Arc::new(SlowUploader::default());
        let queue = UploadQueue::new(uploader.clone()).with_concurrency(1);
        queue.push(Bucket::SubmissionImages, file("a.png"));
        let skipped = queue.push(Bucket::SubmissionImages, file("b.png"));
        assert!(queue.cancel(skipped));

        let items = queue.run(|_| {}).await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            statuses(&queue),
            vec![QueueItemStatus::Complete, QueueItemStatus::Cancelled]
        );
        assert_eq!(uploader.started(), vec!["a.png".to_string()]);
        assert!(!queue.cancel(99));
    }

    #[tokio::test]
    async fn cancel_all_stops_waiting_and_in_flight_items() {
        let uploader = Arc::new(SlowUploader::default());
        let queue = UploadQueue::new(uploader.clone()).with_concurrency(1);
        queue.push(Bucket::SubmissionImages, file("hang.png"));
        queue.push(Bucket::SubmissionImages, file("b.png"));

        let (items, cancelled) = tokio::join!(queue.run(|_| {}), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.cancel_all()
        });

        assert_eq!(cancelled, 2);
        assert!(items.iter().all(|i| i.status == QueueItemStatus::Cancelled));
        assert_eq!(uploader.started(), vec!["hang.png".to_string()]);
    }

    #[tokio::test]
    async fn remove_and_clear_completed_shrink_the_queue() {
        let queue = UploadQueue::new(Arc::new(SlowUploader::default()));
        queue.push(Bucket::SubmissionImages, file("ok.png"));
        queue.push(Bucket::SubmissionImages, file("bad.png"));
        queue.run(|_| {}).await;
        let waiting = queue.push(Bucket::SubmissionImages, file("later.png"));
        let dropped = queue.push(Bucket::SubmissionImages, file("dropped.png"));

        assert!(queue.remove(dropped));
        assert!(!queue.remove(dropped));
        assert_eq!(queue.clear_completed(), 2);

        let remaining = queue.items();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, waiting);
        assert_eq!(remaining[0].status, QueueItemStatus::Pending);
        // Ids are not reused after removal
        assert_eq!(queue.push(Bucket::SubmissionImages, file("new.png")), dropped + 1);
    }

    #[tokio::test]
    async fn events_report_progress_and_final_status() {
        let queue = UploadQueue::new(Arc::new(SlowUploader::default()));
        let id = queue.push(Bucket::SubmissionImages, file("a.png"));

        let events = Mutex::new(Vec::new());
        queue.run(|e| events.lock().unwrap().push(e)).await;

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                QueueEvent::Status {
                    id,
                    status: QueueItemStatus::Uploading
                },
                QueueEvent::Progress { id, progress: 50.0 },
                QueueEvent::Status {
                    id,
                    status: QueueItemStatus::Complete
                },
            ]
        );
    }
}
