//! Collaborator seams: persistence, notification dispatch, and the
//! authentication context. The core only ever talks to these traits; the
//! binary and the tests plug in the in-memory adapters from `memory`.

use super::checklist::TaskSeed;
use super::domain::{
    ActivityEntry, ApplicationId, Task, TaskId, TrainerApplication, TrainerId, Training,
    TrainingId, TrainingStatus,
};
use super::domain::{Actor, ApplicationStatus, DeliveryMode};
use chrono::{DateTime, NaiveDate, Utc};

/// Storage failure kinds, kept deliberately small so callers can pick a retry
/// strategy: `Conflict` after reload, `Timeout` with backoff, `NotFound` never.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("concurrent modification detected, reload and retry")]
    Conflict,
    #[error("storage timed out: {0}")]
    Timeout(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Seed for a new training; the store assigns id and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSeed {
    pub brand_id: super::domain::BrandId,
    pub customer_id: super::domain::CustomerId,
    pub title: String,
    pub delivery_mode: DeliveryMode,
    pub status: TrainingStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Seed for a new trainer application; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSeed {
    pub training_id: TrainingId,
    pub trainer_id: TrainerId,
    pub message: Option<String>,
    pub proposed_rate: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

/// All-or-nothing write batch for one training.
///
/// `expected_version` is the optimistic lock: the store must refuse the whole
/// batch with `StoreError::Conflict` when the stored training has moved on.
/// On success the training's version is bumped and every part of the batch is
/// visible together; on failure nothing is.
#[derive(Debug, Clone)]
pub struct TrainingCommit {
    /// Updated copy of the training (pass it unchanged when only satellites move).
    pub training: Training,
    pub expected_version: u64,
    pub new_tasks: Vec<TaskSeed>,
    pub updated_tasks: Vec<Task>,
    pub new_application: Option<ApplicationSeed>,
    pub updated_applications: Vec<TrainerApplication>,
    pub activity: Vec<ActivityEntry>,
}

impl TrainingCommit {
    /// Batch that rewrites the training row and nothing else.
    pub fn for_training(training: Training, expected_version: u64) -> Self {
        Self {
            training,
            expected_version,
            new_tasks: Vec::new(),
            updated_tasks: Vec::new(),
            new_application: None,
            updated_applications: Vec::new(),
            activity: Vec::new(),
        }
    }
}

/// What the store materialized out of a commit batch.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub training: Training,
    pub created_tasks: Vec<Task>,
    pub created_application: Option<TrainerApplication>,
}

/// Persistence boundary for the lifecycle engine.
///
/// Reads are point lookups; every mutation goes through `commit` so the
/// read-validate-write sequence stays atomic per training.
pub trait TrainingStore: Send + Sync {
    fn training(&self, id: TrainingId) -> Result<Training, StoreError>;
    fn tasks(&self, training_id: TrainingId) -> Result<Vec<Task>, StoreError>;
    fn task(&self, id: TaskId) -> Result<Task, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<TrainerApplication, StoreError>;
    fn applications_for(
        &self,
        training_id: TrainingId,
    ) -> Result<Vec<TrainerApplication>, StoreError>;
    fn insert_training(&self, seed: TrainingSeed) -> Result<Training, StoreError>;
    fn commit(&self, batch: TrainingCommit) -> Result<CommitReceipt, StoreError>;
    /// Chronological audit trail for one training; a plain restartable read.
    fn activity(&self, training_id: TrainingId) -> Result<Vec<ActivityEntry>, StoreError>;
}

/// Events pushed to the external notifier after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    StatusChanged {
        training_id: TrainingId,
        from: TrainingStatus,
        to: TrainingStatus,
    },
    ApplicationReceived {
        training_id: TrainingId,
        trainer_id: TrainerId,
    },
    ApplicationDecided {
        application_id: ApplicationId,
        outcome: ApplicationStatus,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("notification transport unavailable: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget notification dispatch. A failed notification never rolls
/// back the commit it follows; the service logs and moves on.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Supplies the authenticated actor for each call at the HTTP boundary.
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<Actor>;
}
