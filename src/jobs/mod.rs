//! Background jobs.
//!
//! - `JobQueue`: enqueue now or after a delay, poll status, cancel
//!   before start
//! - `JobHandler`: a named job body; may hand back a follow-up job
//! - `local`: an in-process queue over the tokio runtime
//! - `handlers`: the image pipeline jobs
//!
//! Execution is at-least-once and job bodies are idempotent, so a
//! crash between a job finishing and its status landing only costs a
//! re-run.

pub mod errors;
pub mod handlers;
pub mod local;

use std::time::Duration;

pub use errors::{JobError, JobResult};
pub use handlers::{CleanupHandler, ProcessHandler, CLEANUP_JOB, PROCESS_JOB};
pub use local::LocalQueue;

/// A named job and its JSON arguments
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub args: serde_json::Value,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Life cycle of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

/// Point-in-time view of one job
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    /// Seconds until a completed job is pruned
    pub ttl: Option<i64>,
    /// Seconds a run may take before it is failed
    pub timeout: i64,
}

impl JobSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ttl": self.ttl,
            "status": self.status.as_str(),
            "is_failed": self.status == JobStatus::Failed,
            "is_finished": self.status == JobStatus::Finished,
            "is_queued": self.status == JobStatus::Queued,
            "is_started": self.status == JobStatus::Started,
            "timeout": self.timeout,
            "result": self.result,
        })
    }
}

/// A job to run after the current one completes
#[derive(Debug, Clone)]
pub struct FollowUp {
    pub id: String,
    pub spec: JobSpec,
    pub delay: Duration,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub result: serde_json::Value,
    pub follow_up: Option<FollowUp>,
}

impl JobOutcome {
    pub fn finished(result: serde_json::Value) -> Self {
        Self {
            result,
            follow_up: None,
        }
    }

    pub fn then(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

/// A registered job body. Runs on a blocking thread; the queue owns
/// scheduling of any follow-up it hands back.
pub trait JobHandler: Send + Sync {
    fn run(&self, args: &serde_json::Value) -> JobResult<JobOutcome>;
}

/// Queueing surface the service talks to
pub trait JobQueue: Send + Sync {
    /// Queue a job for immediate execution
    fn enqueue(&self, id: &str, spec: JobSpec) -> JobResult<()>;

    /// Queue a job to start after a delay
    fn schedule_in(&self, id: &str, spec: JobSpec, delay: Duration) -> JobResult<()>;

    /// Current view of a job
    ///
    /// # Errors
    ///
    /// `NotFound` once a completed job has been pruned, or for an id
    /// that was never queued.
    fn status(&self, id: &str) -> JobResult<JobSnapshot>;

    /// Drop a job that has not started yet
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` when the job is past cancellation.
    fn cancel(&self, id: &str) -> JobResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(JobStatus::Queued.as_str(), "queued");
        assert_eq!(JobStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = JobSnapshot {
            status: JobStatus::Finished,
            result: Some(serde_json::json!({"thumb": "a.thumb.jpg"})),
            ttl: Some(500),
            timeout: 180,
        };
        let json = snapshot.to_json();

        assert_eq!(json["status"], "finished");
        assert_eq!(json["is_finished"], true);
        assert_eq!(json["is_queued"], false);
        assert_eq!(json["ttl"], 500);
        assert_eq!(json["result"]["thumb"], "a.thumb.jpg");
    }
}
