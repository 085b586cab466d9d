//! Queue implementation: FIFO admission, worker pool, reaper, shutdown.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use murmur_core::{JobId, ServiceError, ServiceResult};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::types::{
    JobError, JobFailure, JobInfo, JobInput, JobRunner, JobState, JobStats, ProgressFn,
};

/// Queue tuning.
#[derive(Clone, Debug)]
pub struct JobQueueConfig {
    /// Jobs processing at once.
    pub max_concurrent_jobs: usize,
    /// Jobs allowed to wait; submissions beyond this are refused.
    pub max_pending_jobs: usize,
    /// Terminal jobs are deleted this long after completion.
    pub job_ttl: Duration,
    /// Reaper sweep interval.
    pub reap_interval: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            max_pending_jobs: 64,
            job_ttl: Duration::from_secs(24 * 60 * 60),
            reap_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// One job's record. Fast, lock-only mutation; no await while held.
struct JobRecord {
    state: JobState,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    progress: f64,
    progress_message: String,
    result: Option<Value>,
    error: Option<JobError>,
    filename: Option<String>,
    duration_seconds: f64,
    /// Present until a worker takes the job.
    input: Option<JobInput>,
    cancel: CancellationToken,
}

impl JobRecord {
    fn info(&self, id: &str) -> JobInfo {
        JobInfo {
            job_id: id.to_owned(),
            status: self.state,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            progress: self.progress,
            progress_message: self.progress_message.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            filename: self.filename.clone(),
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Bounded async job queue.
pub struct JobQueue {
    jobs: DashMap<String, Arc<Mutex<JobRecord>>>,
    pending: Mutex<VecDeque<String>>,
    wakeup: Notify,
    runner: Arc<dyn JobRunner>,
    config: JobQueueConfig,
    shutdown: CancellationToken,
}

impl JobQueue {
    /// Queue with the given runner. Call [`JobQueue::spawn_workers`] to
    /// start processing.
    #[must_use]
    pub fn new(config: JobQueueConfig, runner: Arc<dyn JobRunner>) -> Arc<Self> {
        Arc::new(Self {
            jobs: DashMap::new(),
            pending: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            runner,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Submit a job. FIFO over submission time, no priorities.
    #[instrument(skip_all, fields(samples = input.samples.len()))]
    pub fn submit(&self, input: JobInput) -> ServiceResult<JobId> {
        if self.shutdown.is_cancelled() {
            return Err(ServiceError::ResourceExhausted(
                "job queue is shutting down".into(),
            ));
        }
        {
            let pending = self.pending.lock();
            if pending.len() >= self.config.max_pending_jobs {
                return Err(ServiceError::ResourceExhausted(format!(
                    "job queue is full ({} pending)",
                    pending.len()
                )));
            }
        }

        let id = JobId::new();
        let duration_seconds = input.samples.len() as f64 / 16_000.0;
        let record = JobRecord {
            state: JobState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: 0.0,
            progress_message: "queued".to_owned(),
            result: None,
            error: None,
            filename: input.filename.clone(),
            duration_seconds,
            input: Some(input),
            cancel: CancellationToken::new(),
        };
        let _ = self.jobs.insert(id.to_string(), Arc::new(Mutex::new(record)));
        self.pending.lock().push_back(id.to_string());
        self.wakeup.notify_one();
        debug!(job_id = %id, duration_seconds, "job submitted");
        Ok(id)
    }

    /// Look up one job.
    pub fn status(&self, id: &str) -> ServiceResult<JobInfo> {
        let record = self
            .jobs
            .get(id)
            .ok_or_else(|| ServiceError::job_not_found(id))?;
        let info = record.lock().info(id);
        Ok(info)
    }

    /// Cancel a job.
    ///
    /// Pending jobs cancel immediately; processing jobs get their cancel
    /// token fired and turn `Cancelled` at the next segment boundary.
    /// Cancelling an already-cancelled job is a no-op.
    #[instrument(skip(self), fields(job_id = id))]
    pub fn cancel(&self, id: &str) -> ServiceResult<JobInfo> {
        let record = self
            .jobs
            .get(id)
            .ok_or_else(|| ServiceError::job_not_found(id))?;
        let mut rec = record.lock();
        match rec.state {
            JobState::Pending => {
                rec.state = JobState::Cancelled;
                rec.completed_at = Some(Utc::now());
                rec.input = None;
                rec.progress_message = "cancelled before processing".to_owned();
                info!(job_id = id, "pending job cancelled");
            }
            JobState::Processing => {
                rec.cancel.cancel();
                rec.progress_message = "cancel requested".to_owned();
                info!(job_id = id, "cancel requested for running job");
            }
            JobState::Cancelled => {}
            state => {
                return Err(ServiceError::InvalidState(format!(
                    "cannot cancel job in state {}",
                    state.as_str()
                )))
            }
        }
        Ok(rec.info(id))
    }

    /// List jobs, newest first, optionally filtered by state.
    #[must_use]
    pub fn list(&self, filter: Option<JobState>, limit: usize) -> Vec<JobInfo> {
        let mut infos: Vec<JobInfo> = self
            .jobs
            .iter()
            .map(|entry| entry.value().lock().info(entry.key()))
            .filter(|info| filter.is_none_or(|f| info.status == f))
            .collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        infos.truncate(limit);
        infos
    }

    /// Aggregate counters.
    #[must_use]
    pub fn stats(&self) -> JobStats {
        let mut stats = JobStats {
            max_concurrent_jobs: self.config.max_concurrent_jobs,
            ..JobStats::default()
        };
        for entry in &self.jobs {
            stats.total_jobs += 1;
            match entry.value().lock().state {
                JobState::Pending => stats.pending += 1,
                JobState::Processing => stats.processing += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
                JobState::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Delete terminal jobs whose TTL elapsed. Returns how many.
    pub fn reap_once(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.job_ttl).unwrap_or(chrono::Duration::zero());
        let stale: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| {
                let rec = entry.value().lock();
                rec.state.is_terminal() && rec.completed_at.is_some_and(|done| done < cutoff)
            })
            .map(|entry| entry.key().clone())
            .collect();
        let removed = stale.len();
        for id in stale {
            let _ = self.jobs.remove(&id);
        }
        if removed > 0 {
            info!(removed, "job reaper removed expired jobs");
        }
        removed
    }

    /// Spawn the worker pool and the reaper. Handles exit on shutdown.
    pub fn spawn_workers(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.config.max_concurrent_jobs + 1);
        for worker in 0..self.config.max_concurrent_jobs {
            let queue = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                queue.worker_loop(worker).await;
            }));
        }

        let queue = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(queue.config.reap_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => { let _ = queue.reap_once(); }
                    () = queue.shutdown.cancelled() => break,
                }
            }
        }));
        handles
    }

    /// Stop the queue: cancel pending jobs, signal running ones, stop
    /// workers.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let pending: Vec<String> = self.pending.lock().drain(..).collect();
        for id in pending {
            if let Some(record) = self.jobs.get(&id) {
                let mut rec = record.lock();
                if rec.state == JobState::Pending {
                    rec.state = JobState::Cancelled;
                    rec.completed_at = Some(Utc::now());
                    rec.input = None;
                }
            }
        }
        for entry in &self.jobs {
            let rec = entry.value().lock();
            if rec.state == JobState::Processing {
                rec.cancel.cancel();
            }
        }
        self.wakeup.notify_waiters();
        info!("job queue shut down");
    }

    /// Pop the next still-pending job id.
    fn pop_next(&self) -> Option<String> {
        let mut pending = self.pending.lock();
        while let Some(id) = pending.pop_front() {
            let still_pending = self
                .jobs
                .get(&id)
                .is_some_and(|record| record.lock().state == JobState::Pending);
            if still_pending {
                return Some(id);
            }
        }
        None
    }

    async fn worker_loop(&self, worker: usize) {
        debug!(worker, "job worker started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            match self.pop_next() {
                Some(id) => self.process(&id).await,
                None => {
                    tokio::select! {
                        () = self.wakeup.notified() => {}
                        () = self.shutdown.cancelled() => break,
                    }
                }
            }
        }
        debug!(worker, "job worker stopped");
    }

    async fn process(&self, id: &str) {
        let Some(record) = self.jobs.get(id).map(|e| e.value().clone()) else {
            return;
        };

        // Claim the job.
        let (input, cancel) = {
            let mut rec = record.lock();
            if rec.state != JobState::Pending {
                return;
            }
            let Some(input) = rec.input.take() else {
                return;
            };
            rec.state = JobState::Processing;
            rec.started_at = Some(Utc::now());
            rec.progress_message = "processing".to_owned();
            (input, rec.cancel.clone())
        };
        info!(job_id = id, "job processing started");

        // Progress lands on the record, monotonically, capped below 1.0:
        // completion is the only way to reach exactly 1.0.
        let progress_record = Arc::clone(&record);
        let progress: ProgressFn = Arc::new(move |fraction: f64, message: String| {
            let mut rec = progress_record.lock();
            if rec.state != JobState::Processing {
                return;
            }
            let clamped = fraction.clamp(0.0, 0.99);
            if clamped > rec.progress {
                rec.progress = clamped;
            }
            rec.progress_message = message;
        });

        let outcome = self.runner.run(input, progress, cancel).await;

        let mut rec = record.lock();
        match outcome {
            Ok(result) => {
                rec.state = JobState::Completed;
                rec.progress = 1.0;
                rec.progress_message = "completed".to_owned();
                rec.result = Some(result);
                info!(job_id = id, "job completed");
            }
            Err(JobFailure::Cancelled) => {
                rec.state = JobState::Cancelled;
                rec.progress_message = "cancelled".to_owned();
                info!(job_id = id, "job cancelled at segment boundary");
            }
            Err(JobFailure::Failed(error)) => {
                rec.state = JobState::Failed;
                rec.progress_message = "failed".to_owned();
                warn!(job_id = id, kind = %error.kind, message = %error.message, "job failed");
                rec.error = Some(error);
            }
        }
        rec.completed_at = Some(Utc::now());
    }
}
