//! Retraining job actions and status polling.
//!
//! The service owns the job lifecycle. [`RetrainActions`] only checks the
//! current status before forwarding start/abort/clear requests, and
//! [`RetrainMonitor`] polls the job and its log on a fixed interval until
//! the job finishes or the monitor is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wildid_client::IdentificationService;
use wildid_core::retrain::{RetrainEventLog, RetrainJob, RetrainStatus};
use wildid_core::types::SessionId;

use crate::error::ReviewError;

/// Broadcast channel capacity for poll snapshots.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Status-gated retraining requests for one service.
#[derive(Clone)]
pub struct RetrainActions {
    service: Arc<dyn IdentificationService>,
}

impl RetrainActions {
    pub fn new(service: Arc<dyn IdentificationService>) -> Self {
        Self { service }
    }

    pub async fn job(&self, session_id: &str) -> Result<Option<RetrainJob>, ReviewError> {
        Ok(self.service.retrain_job(session_id).await?)
    }

    pub async fn logs(&self, session_id: &str) -> Result<Vec<RetrainEventLog>, ReviewError> {
        Ok(self.service.retrain_logs(session_id).await?)
    }

    /// Start a new job. Allowed when no job exists or the last one has
    /// finished.
    pub async fn start(&self, session_id: &str) -> Result<(), ReviewError> {
        let job = self.job(session_id).await?;
        if let Some(job) = &job {
            ensure(job.status.can_start(), "start", Some(job.status))?;
        }
        self.service.start_retraining(session_id).await?;
        Ok(())
    }

    /// Abort the running job.
    pub async fn abort(&self, session_id: &str) -> Result<(), ReviewError> {
        let status = self.job(session_id).await?.map(|job| job.status);
        ensure(status.is_some_and(|s| s.can_abort()), "abort", status)?;
        self.service.abort_retraining(session_id).await?;
        Ok(())
    }

    /// Delete a finished job.
    pub async fn clear(&self, session_id: &str) -> Result<(), ReviewError> {
        let status = self.job(session_id).await?.map(|job| job.status);
        ensure(status.is_some_and(|s| s.can_clear()), "clear", status)?;
        self.service.clear_retraining(session_id).await?;
        Ok(())
    }

    /// Start polling the session's job every `interval`.
    pub fn monitor(
        &self,
        session_id: impl Into<SessionId>,
        interval: Duration,
    ) -> (RetrainMonitor, broadcast::Receiver<RetrainSnapshot>) {
        RetrainMonitor::spawn(self.service.clone(), session_id.into(), interval)
    }
}

fn ensure(
    allowed: bool,
    action: &'static str,
    status: Option<RetrainStatus>,
) -> Result<(), ReviewError> {
    if allowed {
        return Ok(());
    }
    let state = status.map_or_else(|| "missing".to_string(), |s| s.to_string());
    tracing::debug!(action, state = %state, "Retraining action not allowed");
    Err(ReviewError::InvalidTransition { action, state })
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// One poll result.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrainSnapshot {
    pub job: Option<RetrainJob>,
    pub logs: Vec<RetrainEventLog>,
}

impl RetrainSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.status.is_terminal())
    }
}

/// Background poller for one session's retraining job.
///
/// Stops on its own once the job completes or is aborted. Dropping the
/// monitor cancels it.
pub struct RetrainMonitor {
    snapshot_tx: broadcast::Sender<RetrainSnapshot>,
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl RetrainMonitor {
    /// Spawn the polling task. The returned receiver sees every snapshot,
    /// including the first.
    pub fn spawn(
        service: Arc<dyn IdentificationService>,
        session_id: SessionId,
        interval: Duration,
    ) -> (Self, broadcast::Receiver<RetrainSnapshot>) {
        let (snapshot_tx, snapshot_rx) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task_handle = tokio::spawn(poll_loop(
            service,
            session_id,
            interval,
            snapshot_tx.clone(),
            cancel.clone(),
        ));

        let monitor = Self {
            snapshot_tx,
            cancel,
            task_handle: Some(task_handle),
        };
        (monitor, snapshot_rx)
    }

    /// Receive snapshots published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RetrainSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Stop polling.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Wait for the polling task to end.
    pub async fn join(mut self) {
        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Retrain monitor task failed");
            }
        }
    }
}

impl Drop for RetrainMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_once(
    service: &dyn IdentificationService,
    session_id: &str,
) -> Result<RetrainSnapshot, ReviewError> {
    let job = service.retrain_job(session_id).await?;
    let logs = service.retrain_logs(session_id).await?;
    Ok(RetrainSnapshot { job, logs })
}

async fn poll_loop(
    service: Arc<dyn IdentificationService>,
    session_id: SessionId,
    interval: Duration,
    snapshot_tx: broadcast::Sender<RetrainSnapshot>,
    cancel: CancellationToken,
) {
    tracing::info!(session_id = %session_id, interval_ms = interval.as_millis() as u64, "Retrain monitor started");

    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = poll_once(service.as_ref(), &session_id) => polled,
        };

        match polled {
            Ok(snapshot) => {
                let terminal = snapshot.is_terminal();
                let status = snapshot.job.as_ref().map(|job| job.status);
                // No receivers is fine; the next subscriber gets the next poll.
                let _ = snapshot_tx.send(snapshot);
                if terminal {
                    tracing::info!(
                        session_id = %session_id,
                        status = ?status,
                        "Retraining finished, monitor stopping",
                    );
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Retrain poll failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!(session_id = %session_id, "Retrain monitor cancelled");
}
