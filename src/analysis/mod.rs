//! AI analysis of project PDFs: file checks, the service health pre-flight,
//! the upload itself with a simulated progress indicator, and the state
//! update once a usable result comes back.

pub mod file;
pub mod progress;
pub mod report;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{AnalysisUpload, ApiError, QuoteBackend};
use crate::settings::{ClientSettings, MIB};
use crate::state::{StateError, StateStore};
use crate::{log_debug, log_info, log_warn};

pub use file::{format_file_size, PdfFile};
pub use progress::ProgressTicker;
pub use report::{normalize, AnalysisReport};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Proszę wybrać plik PDF")]
    InvalidFile,
    #[error("Plik jest za duży. Maksymalny rozmiar to {} MB", .max / MIB)]
    TooLarge { size: u64, max: u64 },
    #[error("Wybrany plik jest pusty")]
    EmptyFile,
    #[error("Analiza jest już w toku")]
    Busy,
    #[error("Serwis analizy AI nie jest dostępny. Spróbuj ponownie później.")]
    ServiceUnavailable,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Analiza została anulowana")]
    Cancelled,
    #[error(transparent)]
    State(#[from] StateError),
}

impl AnalysisError {
    /// Errors worth offering a retry for; file problems need a different file.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::ServiceUnavailable | AnalysisError::Rejected(_) | AnalysisError::Api(_)
        )
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AnalysisError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnalysisError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs at most one analysis at a time and publishes its progress.
pub struct PdfAnalyzer {
    busy: AtomicBool,
    progress: Arc<watch::Sender<f64>>,
    max_upload_bytes: u64,
    tick: Duration,
    analysis_type: String,
    language: String,
}

impl PdfAnalyzer {
    pub fn new(settings: &ClientSettings) -> Self {
        let (progress, _) = watch::channel(0.0);
        Self {
            busy: AtomicBool::new(false),
            progress: Arc::new(progress),
            max_upload_bytes: settings.max_upload_bytes,
            tick: settings.progress_tick(),
            analysis_type: settings.analysis_type.clone(),
            language: settings.language.clone(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Percentage shown while an upload is in flight.
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Checks, uploads and applies one project PDF.
    ///
    /// The state is only touched when the result is usable and `token` was
    /// not cancelled in the meantime.
    pub async fn analyze<B: QuoteBackend>(
        &self,
        backend: &B,
        state: &StateStore,
        file: PdfFile,
        token: &CancellationToken,
    ) -> Result<AnalysisReport, AnalysisError> {
        file.check(self.max_upload_bytes)?;
        let _busy = BusyGuard::acquire(&self.busy)?;

        let run_id = Uuid::new_v4();
        log_info!(
            "[{run_id}] Analyzing {} ({})",
            file.name,
            format_file_size(file.size())
        );

        let health = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AnalysisError::Cancelled),
            health = backend.health() => health,
        };
        match health {
            Ok(health) if health.analyzer_available() => {}
            Ok(_) => return Err(AnalysisError::ServiceUnavailable),
            Err(err) => {
                log_warn!("[{run_id}] Health check failed: {err}");
                return Err(AnalysisError::ServiceUnavailable);
            }
        }

        let upload = AnalysisUpload {
            file_name: file.name,
            bytes: file.bytes,
            analysis_type: self.analysis_type.clone(),
            language: self.language.clone(),
        };

        let ticker = ProgressTicker::start(self.progress.clone(), self.tick);
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => {
                ticker.abandon();
                log_info!("[{run_id}] Analysis cancelled");
                return Err(AnalysisError::Cancelled);
            }
            response = backend.analyze_pdf(upload) => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                ticker.abandon();
                log_warn!("[{run_id}] Upload failed: {err}");
                return Err(err.into());
            }
        };

        let report = match normalize(&response) {
            Ok(report) => report,
            Err(message) => {
                ticker.abandon();
                log_warn!("[{run_id}] Analyzer rejected the document: {message}");
                return Err(AnalysisError::Rejected(message));
            }
        };
        ticker.complete();

        if token.is_cancelled() {
            log_debug!("[{run_id}] Result arrived after cancellation, discarding");
            return Err(AnalysisError::Cancelled);
        }

        let current_power = state.get_all().estimated_power;
        state.update(report.state_fields(current_power)).await?;
        log_info!(
            "[{run_id}] Analysis applied: area {:?}, EU {:?}, power {:?}",
            report.area,
            report.eu_index,
            report.calculated_power
        );
        Ok(report)
    }
}

pub async fn analysis_status<B: QuoteBackend>(
    backend: &B,
    analysis_id: &str,
) -> Result<Value, AnalysisError> {
    Ok(backend.analysis_status(analysis_id).await?)
}

pub async fn cancel_analysis<B: QuoteBackend>(
    backend: &B,
    analysis_id: &str,
) -> Result<Value, AnalysisError> {
    log_info!("Cancelling remote analysis {analysis_id}");
    Ok(backend.cancel_analysis(analysis_id).await?)
}
