//! Shared application state.

use docpipe_ai::DocumentAnalyzer;
use docpipe_core::DocpipeConfig;
use docpipe_ocr::TextExtractor;
use docpipe_store::Store;
use tokio::sync::mpsc;

/// A request for the background worker to run one processing job.
pub struct JobRequest {
    pub job_id: String,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: DocpipeConfig,
    pub store: Store,
    pub extractor: TextExtractor,
    pub analyzer: DocumentAnalyzer,
    pub job_tx: mpsc::UnboundedSender<JobRequest>,
    job_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<JobRequest>>>,
}

impl AppState {
    pub fn new(
        config: DocpipeConfig,
        store: Store,
        extractor: TextExtractor,
        analyzer: DocumentAnalyzer,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            store,
            extractor,
            analyzer,
            job_tx: tx,
            job_rx: parking_lot::Mutex::new(Some(rx)),
        }
    }

    /// Take the job receiver (can only be called once, by the worker).
    pub fn take_job_rx(&self) -> Option<mpsc::UnboundedReceiver<JobRequest>> {
        self.job_rx.lock().take()
    }

    /// Queue a job for the background worker.
    pub fn enqueue_job(&self, job_id: &str) {
        let _ = self.job_tx.send(JobRequest {
            job_id: job_id.to_string(),
        });
    }
}
