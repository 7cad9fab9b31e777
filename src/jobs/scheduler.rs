//! Job runner
//!
//! Every enabled job gets its own task and its own fixed-delay timer, so a slow or
//! failing job never holds up another one. Invocations of the same job never
//! overlap: the next tick is only awaited after the previous run returned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Schedule;
use crate::error::{EngineError, EngineResult};

/// Execution context handed to every job invocation
#[derive(Debug, Clone)]
pub struct JobContext {
    job_name: String,
    token: CancellationToken,
    started_at: DateTime<Utc>,
}

impl JobContext {
    pub fn new(job_name: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            job_name: job_name.into(),
            token,
            started_at: Utc::now(),
        }
    }

    /// Context that is never cancelled, for one-off runs
    pub fn background(job_name: impl Into<String>) -> Self {
        Self::new(job_name, CancellationToken::new())
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown was requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// A unit of scheduled work
#[async_trait]
pub trait Job: Send + Sync {
    /// Returns a JSON summary of the run for the status board
    async fn run(&self, ctx: JobContext) -> EngineResult<Value>;
}

/// Adapter turning an async closure into a [`Job`]
pub struct FnJob<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EngineResult<Value>> + Send + 'static,
{
    async fn run(&self, ctx: JobContext) -> EngineResult<Value> {
        (self.f)(ctx).await
    }
}

pub fn job_fn<F, Fut>(f: F) -> Arc<dyn Job>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EngineResult<Value>> + Send + 'static,
{
    Arc::new(FnJob { f })
}

/// Registration entry
#[derive(Clone)]
pub struct ScheduledJob {
    pub name: String,
    pub schedule: Schedule,
    pub job: Arc<dyn Job>,
    pub enabled: bool,
}

/// Last known state of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobRunInfo {
    pub name: String,
    pub schedule: String,
    pub enabled: bool,
    pub running: bool,
    pub runs: u64,
    pub failures: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_output: Option<Value>,
}

/// Shared, read-mostly view of every registered job
#[derive(Clone, Default)]
pub struct JobStatusBoard {
    jobs: Arc<RwLock<HashMap<String, JobRunInfo>>>,
}

impl JobStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn register(&self, name: &str, schedule: Schedule, enabled: bool) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(
            name.to_string(),
            JobRunInfo {
                name: name.to_string(),
                schedule: schedule.to_string(),
                enabled,
                running: false,
                runs: 0,
                failures: 0,
                last_started_at: None,
                last_finished_at: None,
                last_error: None,
                last_output: None,
            },
        );
    }

    async fn record_start(&self, name: &str, at: DateTime<Utc>) {
        if let Some(info) = self.jobs.write().await.get_mut(name) {
            info.running = true;
            info.last_started_at = Some(at);
        }
    }

    async fn record_finish(&self, name: &str, outcome: Result<Value, String>) {
        if let Some(info) = self.jobs.write().await.get_mut(name) {
            info.running = false;
            info.runs += 1;
            info.last_finished_at = Some(Utc::now());
            match outcome {
                Ok(output) => {
                    info.last_error = None;
                    info.last_output = Some(output);
                }
                Err(error) => {
                    info.failures += 1;
                    info.last_error = Some(error);
                }
            }
        }
    }

    pub async fn get(&self, name: &str) -> Option<JobRunInfo> {
        self.jobs.read().await.get(name).cloned()
    }

    /// All jobs, sorted by name
    pub async fn snapshot(&self) -> Vec<JobRunInfo> {
        let mut jobs: Vec<JobRunInfo> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        jobs
    }
}

/// Owns the job registry and the lifecycle of every job task
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    status: JobStatusBoard,
    started: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            shutdown: CancellationToken::new(),
            handles: Vec::new(),
            status: JobStatusBoard::new(),
            started: false,
        }
    }

    /// Register a job; names are unique and registration closes once started
    pub async fn register(
        &mut self,
        name: impl Into<String>,
        schedule: Schedule,
        job: Arc<dyn Job>,
        enabled: bool,
    ) -> EngineResult<()> {
        let name = name.into();

        if self.started {
            return Err(EngineError::InternalError(format!(
                "cannot register '{}' after the scheduler started",
                name
            )));
        }
        if self.jobs.iter().any(|j| j.name == name) {
            return Err(EngineError::DuplicateJob(name));
        }

        self.status.register(&name, schedule, enabled).await;
        self.jobs.push(ScheduledJob {
            name,
            schedule,
            job,
            enabled,
        });

        Ok(())
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn status_board(&self) -> JobStatusBoard {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.shutdown.is_cancelled()
    }

    /// Spawn one timer task per enabled job
    pub fn start(&mut self) {
        if self.started {
            tracing::warn!("Scheduler already started");
            return;
        }
        self.started = true;

        for entry in &self.jobs {
            if !entry.enabled {
                tracing::info!(job = %entry.name, "Job registered but disabled");
                continue;
            }

            tracing::info!(job = %entry.name, schedule = %entry.schedule, "Starting job");
            let handle = tokio::spawn(run_job_loop(
                entry.clone(),
                self.shutdown.clone(),
                self.status.clone(),
            ));
            self.handles.push(handle);
        }
    }

    /// Cancel every job and wait for in-flight runs to return
    pub async fn stop(&mut self) {
        tracing::info!("Stopping scheduler");
        self.shutdown.cancel();

        let results = futures_util::future::join_all(self.handles.drain(..)).await;
        for result in results {
            if let Err(e) = result {
                tracing::error!(error = %e, "Job task ended abnormally");
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

async fn run_job_loop(entry: ScheduledJob, shutdown: CancellationToken, status: JobStatusBoard) {
    let period = entry.schedule.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let ctx = JobContext::new(entry.name.clone(), shutdown.child_token());
        status.record_start(&entry.name, ctx.started_at()).await;
        tracing::debug!(job = %entry.name, "Job run started");

        // Run on its own task so a panic stays inside this invocation
        let job = entry.job.clone();
        let outcome = match tokio::spawn(async move { job.run(ctx).await }).await {
            Ok(Ok(output)) => {
                tracing::info!(job = %entry.name, summary = %output, "Job run completed");
                Ok(output)
            }
            Ok(Err(e)) => {
                tracing::error!(job = %entry.name, error = %e, code = e.error_code(), "Job run failed");
                Err(e.to_string())
            }
            Err(e) => {
                tracing::error!(job = %entry.name, error = %e, "Job run panicked");
                Err(format!("job panicked: {}", e))
            }
        };

        status.record_finish(&entry.name, outcome).await;
    }

    tracing::info!(job = %entry.name, "Job stopped");
}
