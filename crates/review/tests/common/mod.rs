//! In-memory identification service for review workflow tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use wildid_client::{ApiError, IdentificationService, ResponseStatus};
use wildid_core::retrain::{RetrainEventLog, RetrainJob, RetrainStatus};
use wildid_core::Annotation;

/// How the next failing call should fail.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unavailable,
    Malformed,
    Rejected,
}

impl Failure {
    fn into_error(self) -> ApiError {
        match self {
            Self::Unavailable => ApiError::Status {
                status: 503,
                body: "unavailable".to_string(),
            },
            Self::Malformed => ApiError::Malformed {
                path: "/api/v1/predictions".to_string(),
                reason: "missing field `annotations`".to_string(),
            },
            Self::Rejected => ApiError::Rejected("session locked".to_string()),
        }
    }
}

#[derive(Default)]
pub struct FakeService {
    /// Records served by both the annotations and predictions reads.
    pub records: Mutex<HashMap<String, Vec<Annotation>>>,
    pub submitted: Mutex<Vec<(String, Vec<Annotation>)>>,
    pub fail_next: Mutex<Option<Failure>>,
    /// Reads for a session wait for a permit on its gate.
    pub gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    /// Reads that have started, gated or not.
    pub reads_started: AtomicUsize,
    /// Submits wait for a permit here when set.
    pub submit_gate: Mutex<Option<Arc<Semaphore>>>,
    pub submits_started: AtomicUsize,
    /// Job statuses returned by successive polls; the last one repeats.
    pub job_statuses: Mutex<VecDeque<RetrainStatus>>,
    pub logs: Mutex<Vec<RetrainEventLog>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_records(&self, session_id: &str, records: Vec<Annotation>) {
        self.records
            .lock()
            .unwrap()
            .insert(session_id.to_string(), records);
    }

    pub fn fail_next(&self, failure: Failure) {
        *self.fail_next.lock().unwrap() = Some(failure);
    }

    /// Block reads for `session_id`; each permit added to the returned
    /// gate releases one read.
    pub fn gate(&self, session_id: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(session_id.to_string(), gate.clone());
        gate
    }

    /// Block submits; each permit added to the returned gate releases one.
    pub fn gate_submits(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.submit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_job_statuses(&self, statuses: &[RetrainStatus]) {
        *self.job_statuses.lock().unwrap() = statuses.iter().copied().collect();
    }

    /// Yield until at least `count` reads have started.
    pub async fn wait_for_reads(&self, count: usize) {
        while self.reads_started.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    /// Yield until at least `count` submits have started.
    pub async fn wait_for_submits(&self, count: usize) {
        while self.submits_started.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: &str, session_id: &str) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{call} {session_id}"));
        match self.fail_next.lock().unwrap().take() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn read(&self, call: &str, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        let gate = self.gates.lock().unwrap().get(session_id).cloned();
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.record_call(call, session_id)?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl IdentificationService for FakeService {
    async fn annotations(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        self.read("annotations", session_id).await
    }

    async fn predictions(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        self.read("predictions", session_id).await
    }

    async fn submit(
        &self,
        session_id: &str,
        updates: &[Annotation],
    ) -> Result<ResponseStatus, ApiError> {
        let gate = self.submit_gate.lock().unwrap().clone();
        self.submits_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.record_call("submit", session_id)?;
        self.submitted
            .lock()
            .unwrap()
            .push((session_id.to_string(), updates.to_vec()));
        Ok(ResponseStatus::Ok)
    }

    async fn retrain_job(&self, session_id: &str) -> Result<Option<RetrainJob>, ApiError> {
        self.record_call("retrain_job", session_id)?;
        let mut statuses = self.job_statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(status.map(|status| RetrainJob {
            session_id: session_id.to_string(),
            created_at: 1_700_000_000.0,
            status,
        }))
    }

    async fn retrain_logs(&self, session_id: &str) -> Result<Vec<RetrainEventLog>, ApiError> {
        self.record_call("retrain_logs", session_id)?;
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn start_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        self.record_call("start_retraining", session_id)?;
        self.set_job_statuses(&[RetrainStatus::InProgress]);
        Ok(())
    }

    async fn abort_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        self.record_call("abort_retraining", session_id)?;
        self.set_job_statuses(&[RetrainStatus::Aborted]);
        Ok(())
    }

    async fn clear_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        self.record_call("clear_retraining", session_id)?;
        self.set_job_statuses(&[]);
        Ok(())
    }
}

pub fn annotation(id: i64, name: &str, species: &str, confidence: f64) -> Annotation {
    Annotation {
        id,
        file_name: format!("images/{id}.jpg"),
        annotated_file_name: Some(format!("annotated/{id}.jpg")),
        cropped_file_name: Some(format!("crops/{id}.jpg")),
        bbox: None,
        species_confidence: confidence,
        predicted_species: species.to_string(),
        predicted_name: name.to_string(),
        accepted: Some(false),
        ignored: Some(false),
    }
}
