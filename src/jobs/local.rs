//! In-process job queue over the tokio runtime.
//!
//! Jobs run on blocking threads with a per-job timeout; completed
//! entries linger in the status table for the configured result TTL
//! and are pruned lazily. Follow-up jobs handed back by a handler are
//! scheduled by the worker once the parent result is recorded, so a
//! caller polling the parent never sees the follow-up first.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::errors::{JobError, JobResult};
use super::{JobHandler, JobQueue, JobSnapshot, JobSpec, JobStatus};

struct JobState {
    status: JobStatus,
    result: Option<serde_json::Value>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobState {
    fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            result: None,
            finished_at: None,
        }
    }
}

struct QueueInner {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
    jobs: RwLock<HashMap<String, JobState>>,
    result_ttl: i64,
    timeout: i64,
}

impl QueueInner {
    fn jobs_read(&self) -> JobResult<RwLockReadGuard<'_, HashMap<String, JobState>>> {
        self.jobs.read().map_err(|_| JobError::Poisoned)
    }

    fn jobs_write(&self) -> JobResult<RwLockWriteGuard<'_, HashMap<String, JobState>>> {
        self.jobs.write().map_err(|_| JobError::Poisoned)
    }

    fn handler(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers
            .read()
            .ok()
            .and_then(|handlers| handlers.get(name).cloned())
    }

    fn prune(&self, jobs: &mut HashMap<String, JobState>) {
        let now = Utc::now();
        let ttl = chrono::Duration::seconds(self.result_ttl);
        jobs.retain(|_, state| match state.finished_at {
            Some(at) => now < at + ttl,
            None => true,
        });
    }

    /// Flip a queued job to started; `None` when it was cancelled
    fn start(&self, id: &str) -> Option<()> {
        let mut jobs = self.jobs.write().ok()?;
        let state = jobs.get_mut(id)?;
        state.status = JobStatus::Started;
        Some(())
    }

    fn settle(&self, id: &str, status: JobStatus, result: Option<serde_json::Value>) {
        if let Ok(mut jobs) = self.jobs.write() {
            if let Some(state) = jobs.get_mut(id) {
                state.status = status;
                state.result = result;
                state.finished_at = Some(Utc::now());
            }
        }
    }
}

/// Job queue living inside the service process.
///
/// Cheap to clone; clones share the same job table. Spawning workers
/// needs an ambient tokio runtime.
#[derive(Clone)]
pub struct LocalQueue {
    inner: Arc<QueueInner>,
}

impl LocalQueue {
    /// `result_ttl`: seconds a completed job stays queryable.
    /// `timeout`: seconds one run may take.
    pub fn new(result_ttl: i64, timeout: i64) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                handlers: RwLock::new(HashMap::new()),
                jobs: RwLock::new(HashMap::new()),
                result_ttl,
                timeout,
            }),
        }
    }

    /// Register a handler under a job name
    pub fn register(&self, name: &str, handler: Arc<dyn JobHandler>) -> JobResult<()> {
        self.inner
            .handlers
            .write()
            .map_err(|_| JobError::Poisoned)?
            .insert(name.to_string(), handler);
        Ok(())
    }

    fn submit(&self, id: &str, spec: JobSpec, delay: Duration) -> JobResult<()> {
        if self.inner.handler(&spec.name).is_none() {
            return Err(JobError::UnknownHandler(spec.name));
        }
        {
            let mut jobs = self.inner.jobs_write()?;
            self.inner.prune(&mut jobs);
            jobs.insert(id.to_string(), JobState::queued());
        }
        spawn_worker(Arc::clone(&self.inner), id.to_string(), spec, delay);
        Ok(())
    }
}

impl JobQueue for LocalQueue {
    fn enqueue(&self, id: &str, spec: JobSpec) -> JobResult<()> {
        self.submit(id, spec, Duration::ZERO)
    }

    fn schedule_in(&self, id: &str, spec: JobSpec, delay: Duration) -> JobResult<()> {
        self.submit(id, spec, delay)
    }

    fn status(&self, id: &str) -> JobResult<JobSnapshot> {
        {
            let mut jobs = self.inner.jobs_write()?;
            self.inner.prune(&mut jobs);
        }
        let jobs = self.inner.jobs_read()?;
        let state = jobs.get(id).ok_or(JobError::NotFound)?;

        let ttl = state.finished_at.map(|at| {
            (at + chrono::Duration::seconds(self.inner.result_ttl) - Utc::now()).num_seconds()
        });
        Ok(JobSnapshot {
            status: state.status,
            result: state.result.clone(),
            ttl,
            timeout: self.inner.timeout,
        })
    }

    fn cancel(&self, id: &str) -> JobResult<()> {
        let mut jobs = self.inner.jobs_write()?;
        let state = jobs.get(id).ok_or(JobError::NotFound)?;
        if state.status != JobStatus::Queued {
            return Err(JobError::AlreadyStarted);
        }
        jobs.remove(id);
        Ok(())
    }
}

fn spawn_worker(inner: Arc<QueueInner>, id: String, spec: JobSpec, delay: Duration) {
    tokio::spawn(run_job(inner, id, spec, delay));
}

// Boxed so a follow-up can spawn another worker without a recursive
// future type.
fn run_job(
    inner: Arc<QueueInner>,
    id: String,
    spec: JobSpec,
    delay: Duration,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if inner.start(&id).is_none() {
            // cancelled while waiting
            return;
        }
        let Some(handler) = inner.handler(&spec.name) else {
            inner.settle(&id, JobStatus::Failed, None);
            return;
        };

        let args = spec.args;
        let timeout = Duration::from_secs(inner.timeout.max(0) as u64);
        let ran = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || handler.run(&args)),
        )
        .await;

        match ran {
            Ok(Ok(Ok(outcome))) => {
                inner.settle(&id, JobStatus::Finished, Some(outcome.result));
                if let Some(follow) = outcome.follow_up {
                    if let Ok(mut jobs) = inner.jobs.write() {
                        jobs.insert(follow.id.clone(), JobState::queued());
                    }
                    spawn_worker(Arc::clone(&inner), follow.id, follow.spec, follow.delay);
                }
            }
            // handler error, worker panic, or timeout
            _ => inner.settle(&id, JobStatus::Failed, None),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::{FollowUp, JobOutcome};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(serde_json::Value);

    impl JobHandler for Fixed {
        fn run(&self, _args: &serde_json::Value) -> JobResult<JobOutcome> {
            Ok(JobOutcome::finished(self.0.clone()))
        }
    }

    struct Failing;

    impl JobHandler for Failing {
        fn run(&self, _args: &serde_json::Value) -> JobResult<JobOutcome> {
            Err(JobError::Handler("boom".to_string()))
        }
    }

    struct Slow(u64);

    impl JobHandler for Slow {
        fn run(&self, _args: &serde_json::Value) -> JobResult<JobOutcome> {
            std::thread::sleep(Duration::from_millis(self.0));
            Ok(JobOutcome::finished(serde_json::json!("slept")))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl JobHandler for Counting {
        fn run(&self, _args: &serde_json::Value) -> JobResult<JobOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(JobOutcome::finished(serde_json::json!(null)))
        }
    }

    async fn wait_until(
        queue: &LocalQueue,
        id: &str,
        pred: impl Fn(&JobResult<JobSnapshot>) -> bool,
    ) -> JobResult<JobSnapshot> {
        for _ in 0..200 {
            let status = queue.status(id);
            if pred(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached the expected state", id);
    }

    fn spec(name: &str) -> JobSpec {
        JobSpec::new(name, serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_enqueue_runs_to_finished() {
        let queue = LocalQueue::new(600, 60);
        queue
            .register("echo", Arc::new(Fixed(serde_json::json!({"ok": true}))))
            .unwrap();
        queue.enqueue("job-1", spec("echo")).unwrap();

        let snapshot = wait_until(&queue, "job-1", |s| {
            matches!(s, Ok(snap) if snap.status == JobStatus::Finished)
        })
        .await
        .unwrap();

        assert_eq!(snapshot.result, Some(serde_json::json!({"ok": true})));
        assert_eq!(snapshot.timeout, 60);
        assert!(snapshot.ttl.is_some());
    }

    #[tokio::test]
    async fn test_failing_handler_marks_failed() {
        let queue = LocalQueue::new(600, 60);
        queue.register("bad", Arc::new(Failing)).unwrap();
        queue.enqueue("job-2", spec("bad")).unwrap();

        let snapshot = wait_until(&queue, "job-2", |s| {
            matches!(s, Ok(snap) if snap.status == JobStatus::Failed)
        })
        .await
        .unwrap();
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_handler_is_rejected_up_front() {
        let queue = LocalQueue::new(600, 60);
        assert!(matches!(
            queue.enqueue("job-3", spec("nope")),
            Err(JobError::UnknownHandler(name)) if name == "nope"
        ));
        assert!(matches!(queue.status("job-3"), Err(JobError::NotFound)));
    }

    #[tokio::test]
    async fn test_cancel_drops_a_scheduled_job() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = LocalQueue::new(600, 60);
        queue
            .register("count", Arc::new(Counting(Arc::clone(&counter))))
            .unwrap();
        queue
            .schedule_in("job-4", spec("count"), Duration::from_millis(50))
            .unwrap();

        queue.cancel("job-4").unwrap();
        assert!(matches!(queue.status("job-4"), Err(JobError::NotFound)));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_start_is_rejected() {
        let queue = LocalQueue::new(600, 60);
        queue.register("slow", Arc::new(Slow(500))).unwrap();
        queue.enqueue("job-5", spec("slow")).unwrap();

        wait_until(&queue, "job-5", |s| {
            matches!(s, Ok(snap) if snap.status != JobStatus::Queued)
        })
        .await
        .unwrap();
        assert!(matches!(
            queue.cancel("job-5"),
            Err(JobError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_timeout_fails_the_job() {
        let queue = LocalQueue::new(600, 1);
        queue.register("slow", Arc::new(Slow(3000))).unwrap();
        queue.enqueue("job-6", spec("slow")).unwrap();

        let snapshot = wait_until(&queue, "job-6", |s| {
            matches!(s, Ok(snap) if snap.status == JobStatus::Failed)
        })
        .await
        .unwrap();
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn test_follow_up_runs_after_the_parent() {
        struct Chaining;

        impl JobHandler for Chaining {
            fn run(&self, _args: &serde_json::Value) -> JobResult<JobOutcome> {
                Ok(JobOutcome::finished(serde_json::json!("parent")).then(FollowUp {
                    id: "job-7-child".to_string(),
                    spec: JobSpec::new("echo", serde_json::json!({})),
                    delay: Duration::ZERO,
                }))
            }
        }

        let queue = LocalQueue::new(600, 60);
        queue.register("chain", Arc::new(Chaining)).unwrap();
        queue
            .register("echo", Arc::new(Fixed(serde_json::json!("child"))))
            .unwrap();
        queue.enqueue("job-7", spec("chain")).unwrap();

        let child = wait_until(&queue, "job-7-child", |s| {
            matches!(s, Ok(snap) if snap.status == JobStatus::Finished)
        })
        .await
        .unwrap();
        assert_eq!(child.result, Some(serde_json::json!("child")));

        let parent = queue.status("job-7").unwrap();
        assert_eq!(parent.status, JobStatus::Finished);
    }

    #[tokio::test]
    async fn test_finished_jobs_are_pruned_after_the_result_ttl() {
        let queue = LocalQueue::new(0, 60);
        queue
            .register("echo", Arc::new(Fixed(serde_json::json!(null))))
            .unwrap();
        queue.enqueue("job-8", spec("echo")).unwrap();

        wait_until(&queue, "job-8", |s| matches!(s, Err(JobError::NotFound)))
            .await
            .ok();
    }
}
