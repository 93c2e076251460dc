use async_trait::async_trait;
use cadenza_core::models::{NewSubmission, Submission};
use cadenza_core::AppError;
use cadenza_db::SubmissionStore;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock `SubmissionStore` handing out ids from an in-memory sequence
#[derive(Clone)]
pub struct MockSubmissionStore {
    next_id: Arc<AtomicI64>,
    rows: Arc<Mutex<Vec<Submission>>>,
    reserve_calls: Arc<AtomicUsize>,
    insert_calls: Arc<AtomicUsize>,
    fail_inserts: Arc<AtomicBool>,
    fail_reservations: Arc<AtomicBool>,
}

impl MockSubmissionStore {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicI64::new(1)),
            rows: Arc::new(Mutex::new(Vec::new())),
            reserve_calls: Arc::new(AtomicUsize::new(0)),
            insert_calls: Arc::new(AtomicUsize::new(0)),
            fail_inserts: Arc::new(AtomicBool::new(false)),
            fail_reservations: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reservations(&self, fail: bool) {
        self.fail_reservations.store(fail, Ordering::SeqCst);
    }

    pub fn reserve_calls(&self) -> usize {
        self.reserve_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.rows.lock().unwrap().clone()
    }
}

impl Default for MockSubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for MockSubmissionStore {
    async fn reserve_id(&self) -> Result<i64, AppError> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reservations.load(Ordering::SeqCst) {
            return Err(AppError::Internal("sequence unavailable".to_string()));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert(&self, submission: NewSubmission) -> Result<Submission, AppError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal("insert failed".to_string()));
        }

        let row = Submission {
            id: submission.id,
            round_id: submission.round_id,
            user_id: submission.user_id,
            audio_file_url: submission.audio_file_url,
            audio_file_path: submission.audio_file_path,
            audio_file_size: submission.audio_file_size,
            audio_duration: submission.audio_duration,
            cover_image_url: submission.cover_image_url,
            cover_image_path: submission.cover_image_path,
            lyrics: submission.lyrics,
            cool_things_learned: submission.cool_things_learned,
            tools_used: submission.tools_used,
            happy_accidents: submission.happy_accidents,
            didnt_work: submission.didnt_work,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }
}
