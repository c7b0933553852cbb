use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::configuration::config::Config;
use crate::configuration::types::ListenerConfig;
use crate::data_capture::capture_log::CaptureLog;
use crate::data_capture::classifier::PacketClassifier;
use crate::data_capture::progress::{self, ProgressSender};
use crate::data_capture::signature_catalog::SignatureCatalog;
use crate::error_handling::types::SessionError;
use crate::network::port_listener::{run_listener, ListenerContext, ListenerReport, ListenerSettings};
use crate::reporting::summary_reporter::{SummaryReport, SummaryReporter};
use crate::session_management::SessionState;
use crate::storage::storage_trait::ExportStorage;

/// One capture run.
///
/// # Fields Overview
///
/// - `listeners`: the (port, protocol) pairs opened on start, one task each
/// - `log`: the append-only record log shared by every listener
/// - `stop`: cooperative cancellation flag polled by every listener loop
/// - `tasks`: listener join handles, drained on stop
/// - `printer`: ordered progress output, flushed on stop
/// - `reporter`: produces the summary once the session reaches `Stopped`
pub struct CaptureSession {
    id: Uuid,
    state: SessionState,
    listeners: Vec<ListenerConfig>,
    settings: ListenerSettings,
    classifier: PacketClassifier,
    log: Arc<CaptureLog>,
    stop: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<ListenerReport>>,
    show_progress: bool,
    printer: Option<(ProgressSender, JoinHandle<usize>)>,
    reporter: SummaryReporter,
    started_at: Option<DateTime<Utc>>,
}

impl CaptureSession {
    pub fn new(
        config: &Config,
        catalog: Arc<SignatureCatalog>,
        storage: Arc<dyn ExportStorage>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!("[{}] CaptureSession created", id);
        Self {
            id,
            state: SessionState::Idle,
            listeners: config.listeners.clone(),
            settings: ListenerSettings::from(config),
            classifier: PacketClassifier::new(catalog),
            log: Arc::new(CaptureLog::new()),
            stop: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
            show_progress: true,
            printer: None,
            reporter: SummaryReporter::new(storage),
            started_at: None,
        }
    }

    /// Turns the per-record console output on or off. Records are logged either way.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn log(&self) -> &Arc<CaptureLog> {
        &self.log
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// `idle -> running`: spawns one listener task per configured pair and returns
    /// immediately. Bind results are not awaited; a listener that cannot bind reports it on
    /// its own and the others keep running.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] if the session is not idle.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Running)?;
        self.started_at = Some(Utc::now());

        let progress = if self.show_progress {
            let (tx, handle) = progress::spawn_printer();
            self.printer = Some((tx.clone(), handle));
            Some(tx)
        } else {
            None
        };

        let ctx = ListenerContext {
            session_id: self.id,
            classifier: self.classifier.clone(),
            log: Arc::clone(&self.log),
            progress,
            stop: Arc::clone(&self.stop),
        };

        for listener in &self.listeners {
            self.tasks.push(tokio::spawn(run_listener(
                listener.clone(),
                self.settings.clone(),
                ctx.clone(),
            )));
        }

        info!(
            "[{}] Capture started on {} listener(s)",
            self.id,
            self.listeners.len()
        );
        Ok(())
    }

    /// `running -> stopping -> stopped`, then runs the summary reporter exactly once.
    ///
    /// Raises the shared stop flag and waits for every listener to notice it, which takes
    /// at most one poll interval (or one read timeout for a connection being drained).
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] if the session is not running.
    pub async fn stop(&mut self) -> Result<SummaryReport, SessionError> {
        self.transition(SessionState::Stopping)?;
        self.stop.store(true, Ordering::Release);

        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(report) => reports.push(report),
                // a crashed listener must not keep the others' results from the summary
                Err(e) => error!(
                    "[{}] {}",
                    self.id,
                    SessionError::ListenerJoinFailed(e.to_string())
                ),
            }
        }

        if let Some((tx, handle)) = self.printer.take() {
            drop(tx);
            if let Err(e) = handle.await {
                error!("[{}] progress printer failed: {}", self.id, e);
            }
        }

        self.transition(SessionState::Stopped)?;

        let records = self.log.snapshot();
        let reporter = self.reporter.clone();
        let stopped_at = Utc::now();
        // the export touches the filesystem
        tokio::task::spawn_blocking(move || reporter.report(&records, &reports, stopped_at))
            .await
            .map_err(|e| SessionError::ReportFailed(e.to_string()))
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!("[{}] Session {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // listeners of a session dropped while running wind down on their own
        self.stop.store(true, Ordering::Release);
    }
}
