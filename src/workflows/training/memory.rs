//! In-memory adapters backing the binary and the test suites.
//!
//! `InMemoryStore` keeps everything behind one mutex so a commit batch is
//! applied atomically: the version check happens under the same lock as the
//! writes, which is what gives two racing writers exactly one success and one
//! `Conflict`.

use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{
    ActivityEntry, Actor, ApplicationId, ApplicationStatus, Task, TaskId, TrainerApplication,
    Training, TrainingId,
};
use super::repository::{
    AuthProvider, CommitReceipt, NotificationEvent, Notifier, NotifyError, StoreError,
    TrainingCommit, TrainingSeed, TrainingStore,
};

#[derive(Debug, Default)]
struct StoreState {
    trainings: HashMap<TrainingId, Training>,
    tasks: HashMap<TaskId, Task>,
    applications: HashMap<ApplicationId, TrainerApplication>,
    activity: Vec<ActivityEntry>,
    next_training_id: u64,
    next_task_id: u64,
    next_application_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl TrainingStore for InMemoryStore {
    fn training(&self, id: TrainingId) -> Result<Training, StoreError> {
        let state = self.lock()?;
        state.trainings.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn tasks(&self, training_id: TrainingId) -> Result<Vec<Task>, StoreError> {
        let state = self.lock()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.training_id == training_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.position, task.id));
        Ok(tasks)
    }

    fn task(&self, id: TaskId) -> Result<Task, StoreError> {
        let state = self.lock()?;
        state.tasks.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn application(&self, id: ApplicationId) -> Result<TrainerApplication, StoreError> {
        let state = self.lock()?;
        state
            .applications
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn applications_for(
        &self,
        training_id: TrainingId,
    ) -> Result<Vec<TrainerApplication>, StoreError> {
        let state = self.lock()?;
        let mut applications: Vec<TrainerApplication> = state
            .applications
            .values()
            .filter(|application| application.training_id == training_id)
            .cloned()
            .collect();
        applications.sort_by_key(|application| application.id);
        Ok(applications)
    }

    fn insert_training(&self, seed: TrainingSeed) -> Result<Training, StoreError> {
        let mut state = self.lock()?;
        state.next_training_id += 1;
        let training = Training {
            id: TrainingId(state.next_training_id),
            brand_id: seed.brand_id,
            customer_id: seed.customer_id,
            title: seed.title,
            delivery_mode: seed.delivery_mode,
            status: seed.status,
            start_date: seed.start_date,
            end_date: seed.end_date,
            trainer_id: None,
            version: 1,
        };
        state.trainings.insert(training.id, training.clone());
        Ok(training)
    }

    fn commit(&self, batch: TrainingCommit) -> Result<CommitReceipt, StoreError> {
        let mut state = self.lock()?;

        let stored_version = state
            .trainings
            .get(&batch.training.id)
            .map(|training| training.version)
            .ok_or(StoreError::NotFound)?;
        if stored_version != batch.expected_version {
            return Err(StoreError::Conflict);
        }

        let mut training = batch.training;
        training.version = stored_version + 1;
        state.trainings.insert(training.id, training.clone());

        let mut created_tasks = Vec::with_capacity(batch.new_tasks.len());
        for seed in batch.new_tasks {
            state.next_task_id += 1;
            let task = Task {
                id: TaskId(state.next_task_id),
                training_id: training.id,
                template_key: seed.template_key,
                title: seed.title,
                position: seed.position,
                required: seed.required,
                completed: false,
                completed_at: None,
            };
            state.tasks.insert(task.id, task.clone());
            created_tasks.push(task);
        }

        for task in batch.updated_tasks {
            state.tasks.insert(task.id, task);
        }

        let created_application = match batch.new_application {
            Some(seed) => {
                state.next_application_id += 1;
                let application = TrainerApplication {
                    id: ApplicationId(state.next_application_id),
                    training_id: seed.training_id,
                    trainer_id: seed.trainer_id,
                    status: ApplicationStatus::Pending,
                    message: seed.message,
                    proposed_rate: seed.proposed_rate,
                    submitted_at: seed.submitted_at,
                    decided_by: None,
                    decided_at: None,
                };
                state
                    .applications
                    .insert(application.id, application.clone());
                Some(application)
            }
            None => None,
        };

        for application in batch.updated_applications {
            state.applications.insert(application.id, application);
        }

        state.activity.extend(batch.activity);

        Ok(CommitReceipt {
            training,
            created_tasks,
            created_application,
        })
    }

    fn activity(&self, training_id: TrainingId) -> Result<Vec<ActivityEntry>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .activity
            .iter()
            .filter(|entry| entry.training_id == training_id)
            .cloned()
            .collect())
    }
}

/// Notifier that records nothing and never fails. Used by the binary until a
/// real mail/webhook adapter is wired in.
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        tracing::debug!(?event, "notification dropped (null notifier)");
        Ok(())
    }
}

/// Static token-to-actor directory for demos and tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    actors: HashMap<String, Actor>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.actors.insert(token.into(), actor);
        self
    }
}

impl AuthProvider for StaticDirectory {
    fn authenticate(&self, token: &str) -> Option<Actor> {
        self.actors.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::workflows::training::domain::{
        ActivityAction, BrandId, CustomerId, DeliveryMode, EntityKind, TrainingStatus,
    };
    use crate::workflows::training::repository::TrainingCommit;

    fn seed() -> TrainingSeed {
        TrainingSeed {
            brand_id: BrandId(1),
            customer_id: CustomerId(1),
            title: "Moderation Basics".to_string(),
            delivery_mode: DeliveryMode::Online,
            status: TrainingStatus::Lead,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn insert_assigns_sequential_ids_and_version_one() {
        let store = InMemoryStore::new();
        let first = store.insert_training(seed()).expect("insert");
        let second = store.insert_training(seed()).expect("insert");
        assert_eq!(first.id, TrainingId(1));
        assert_eq!(second.id, TrainingId(2));
        assert_eq!(first.version, 1);
    }

    #[test]
    fn commit_bumps_version_and_refuses_stale_writers() {
        let store = InMemoryStore::new();
        let training = store.insert_training(seed()).expect("insert");

        let mut updated = training.clone();
        updated.status = TrainingStatus::Offered;
        let receipt = store
            .commit(TrainingCommit::for_training(updated, training.version))
            .expect("first commit wins");
        assert_eq!(receipt.training.version, 2);

        let mut stale = training.clone();
        stale.status = TrainingStatus::Cancelled;
        let err = store
            .commit(TrainingCommit::for_training(stale, training.version))
            .expect_err("stale commit must lose");
        assert_eq!(err, StoreError::Conflict);
    }

    #[test]
    fn commit_applies_the_whole_batch_together() {
        let store = InMemoryStore::new();
        let training = store.insert_training(seed()).expect("insert");

        let mut batch = TrainingCommit::for_training(training.clone(), training.version);
        batch.new_tasks = vec![crate::workflows::training::checklist::TaskSeed {
            template_key: "tech-check".to_string(),
            title: "Run tech check".to_string(),
            position: 0,
            required: true,
        }];
        batch.activity = vec![ActivityEntry {
            training_id: training.id,
            actor: "system".to_string(),
            entity_kind: EntityKind::Training,
            entity_id: training.id.0,
            action: ActivityAction::TrainingCreated,
            recorded_at: Utc::now(),
        }];

        let receipt = store.commit(batch).expect("commit");
        assert_eq!(receipt.created_tasks.len(), 1);
        assert_eq!(store.tasks(training.id).expect("tasks").len(), 1);
        assert_eq!(store.activity(training.id).expect("activity").len(), 1);
    }
}
