//! # Shared Service State
//!
//! One [`AppState`] is built at startup and shared across every
//! handler. It owns the store, the record managers, the job queue, and
//! the upload id generator.

use std::sync::{Arc, Mutex};

use crate::activation::ActivationManager;
use crate::codes::CodeManager;
use crate::config::ServiceConfig;
use crate::ids::PronounceableIds;
use crate::jobs::{CleanupHandler, LocalQueue, ProcessHandler, CLEANUP_JOB, PROCESS_JOB};
use crate::store::{KvStore, MemoryStore, WriteBatch};
use crate::user::UserManager;

use super::errors::{ApiError, ApiResult};

/// Tries before giving up on finding an unused upload id
const MAX_ID_TRIES: usize = 5;

/// Everything the handlers share
pub struct AppState {
    pub config: ServiceConfig,
    pub store: Arc<MemoryStore>,
    pub users: Arc<UserManager<MemoryStore>>,
    pub codes: CodeManager<MemoryStore>,
    pub activations: ActivationManager<MemoryStore>,
    pub queue: LocalQueue,
    ids: Mutex<PronounceableIds>,
}

impl AppState {
    /// Wire up the store, managers, and job queue for a config.
    ///
    /// The image pipeline handlers are registered here so a built
    /// state is ready to accept uploads.
    pub fn build(config: ServiceConfig) -> ApiResult<Arc<Self>> {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(UserManager::new(store.clone()));
        let codes = CodeManager::new(store.clone(), users.clone());
        let activations = ActivationManager::new(store.clone(), users.clone());

        let queue = LocalQueue::new(config.result_ttl, config.job_timeout);
        queue.register(
            PROCESS_JOB,
            Arc::new(ProcessHandler::new(config.data_dir.clone(), config.ttl)),
        )?;
        queue.register(
            CLEANUP_JOB,
            Arc::new(CleanupHandler::new(config.data_dir.clone())),
        )?;

        Ok(Arc::new(Self {
            config,
            store,
            users,
            codes,
            activations,
            queue,
            ids: Mutex::new(PronounceableIds::new()),
        }))
    }

    /// Hand out an upload id that is not currently reserved.
    ///
    /// The reservation key expires after `id_lifespan` seconds, at
    /// which point the id may circulate again. Gives up after a fixed
    /// number of collisions.
    pub fn reserve_id(&self) -> ApiResult<String> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| ApiError::Internal("id generator lock poisoned".to_string()))?;

        let mut id = ids.next_id();
        for _ in 0..MAX_ID_TRIES {
            let key = reservation_key(&id);
            if !self.store.exists(&key)? {
                let mut batch = WriteBatch::new();
                batch
                    .hash_set(&key, "reserved", "1")
                    .expire(&key, self.config.id_lifespan);
                self.store.apply(batch)?;
                return Ok(id);
            }
            id = ids.next_id();
        }

        Err(ApiError::TooManyRetries)
    }
}

fn reservation_key(id: &str) -> String {
    format!("exif:{id}")
}
