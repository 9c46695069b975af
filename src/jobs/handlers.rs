//! Image pipeline jobs.
//!
//! `process` extracts the thumbnail and metadata dump, strips the
//! image in place, and hands back a delayed `cleanup` follow-up.
//! `cleanup` removes the three artifacts and is idempotent, so a
//! re-run after a crash is harmless.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::image::ExifImage;

use super::errors::{JobError, JobResult};
use super::{FollowUp, JobHandler, JobOutcome, JobSpec};

pub const PROCESS_JOB: &str = "process";
pub const CLEANUP_JOB: &str = "cleanup";

fn id_arg(args: &serde_json::Value) -> JobResult<&str> {
    args.get("id")
        .and_then(serde_json::Value::as_str)
        .ok_or(JobError::InvalidArgs("id"))
}

/// Cleans one uploaded image and schedules its removal
pub struct ProcessHandler {
    data_dir: PathBuf,
    /// Seconds the artifacts stay around after processing
    cleanup_after: i64,
}

impl ProcessHandler {
    pub fn new(data_dir: PathBuf, cleanup_after: i64) -> Self {
        Self {
            data_dir,
            cleanup_after,
        }
    }
}

impl JobHandler for ProcessHandler {
    fn run(&self, args: &serde_json::Value) -> JobResult<JobOutcome> {
        let id = id_arg(args)?;
        let image = ExifImage::new(self.data_dir.join(format!("{id}.jpg")));

        image.thumb()?;
        image.dump()?;
        image.clean()?;

        let removed_around = Utc::now() + chrono::Duration::seconds(self.cleanup_after);
        let result = serde_json::json!({
            "thumb": image.thumb_name(),
            "json": image.json_name(),
            "removed_around": removed_around.to_rfc3339(),
        });

        Ok(JobOutcome::finished(result).then(FollowUp {
            id: format!("cleanup:{id}"),
            spec: JobSpec::new(CLEANUP_JOB, serde_json::json!({ "id": id })),
            delay: Duration::from_secs(self.cleanup_after.max(0) as u64),
        }))
    }
}

/// Removes the artifacts of one upload
pub struct CleanupHandler {
    data_dir: PathBuf,
}

impl CleanupHandler {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

impl JobHandler for CleanupHandler {
    fn run(&self, args: &serde_json::Value) -> JobResult<JobOutcome> {
        let id = id_arg(args)?;

        for name in [
            format!("{id}.jpg"),
            format!("{id}.thumb.jpg"),
            format!("{id}.json"),
        ] {
            let path = self.data_dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(JobError::Handler(err.to_string())),
            }
        }
        Ok(JobOutcome::finished(serde_json::json!(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::exif::fixtures::sample_jpeg;
    use crate::image::intake;

    #[test]
    fn test_process_produces_artifacts_and_a_cleanup_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        intake(&sample_jpeg(6, true), "brave-owl", dir.path()).unwrap();

        let handler = ProcessHandler::new(dir.path().to_path_buf(), 600);
        let outcome = handler
            .run(&serde_json::json!({"id": "brave-owl"}))
            .unwrap();

        assert_eq!(outcome.result["thumb"], "brave-owl.thumb.jpg");
        assert_eq!(outcome.result["json"], "brave-owl.json");
        assert!(outcome.result["removed_around"].is_string());

        let follow = outcome.follow_up.unwrap();
        assert_eq!(follow.id, "cleanup:brave-owl");
        assert_eq!(follow.spec.name, CLEANUP_JOB);
        assert_eq!(follow.delay, Duration::from_secs(600));

        assert!(dir.path().join("brave-owl.thumb.jpg").exists());
        assert!(dir.path().join("brave-owl.json").exists());
        let cleaned = fs::read(dir.path().join("brave-owl.jpg")).unwrap();
        assert!(crate::image::exif::parse(&cleaned).unwrap().thumbnail.is_none());
    }

    #[test]
    fn test_process_without_the_upload_fails() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ProcessHandler::new(dir.path().to_path_buf(), 600);

        assert!(matches!(
            handler.run(&serde_json::json!({"id": "missing"})),
            Err(JobError::Handler(_))
        ));
    }

    #[test]
    fn test_handlers_reject_missing_id() {
        let dir = tempfile::tempdir().unwrap();
        let process = ProcessHandler::new(dir.path().to_path_buf(), 600);
        let cleanup = CleanupHandler::new(dir.path().to_path_buf());

        assert!(matches!(
            process.run(&serde_json::json!({})),
            Err(JobError::InvalidArgs("id"))
        ));
        assert!(matches!(
            cleanup.run(&serde_json::json!({"id": 7})),
            Err(JobError::InvalidArgs("id"))
        ));
    }

    #[test]
    fn test_cleanup_removes_artifacts_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        intake(&sample_jpeg(6, true), "shiny-fox", dir.path()).unwrap();
        let process = ProcessHandler::new(dir.path().to_path_buf(), 600);
        process.run(&serde_json::json!({"id": "shiny-fox"})).unwrap();

        let cleanup = CleanupHandler::new(dir.path().to_path_buf());
        cleanup.run(&serde_json::json!({"id": "shiny-fox"})).unwrap();

        assert!(!dir.path().join("shiny-fox.jpg").exists());
        assert!(!dir.path().join("shiny-fox.thumb.jpg").exists());
        assert!(!dir.path().join("shiny-fox.json").exists());

        // second run over nothing
        cleanup.run(&serde_json::json!({"id": "shiny-fox"})).unwrap();
    }
}
