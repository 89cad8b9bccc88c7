//! Operation-level API of the lifecycle engine.
//!
//! Every operation takes the authenticated actor explicitly, authorizes first,
//! validates against the state machine or workflow rules, and then applies all
//! side effects through a single store commit so failures leave the training
//! untouched.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use super::authz::{self, Forbidden, Operation};
use super::checklist::ChecklistPolicy;
use super::domain::{
    ActivityAction, ActivityEntry, Actor, ApplicationId, ApplicationOutcome, ApplicationStatus,
    BrandId, CustomerId, DeliveryMode, EntityKind, Role, Task, TaskId, TrainerApplication,
    TrainerId, Training, TrainingId, TrainingStatus,
};
use super::machine::{self, InvalidTransition};
use super::repository::{
    ApplicationSeed, NotificationEvent, Notifier, StoreError, TrainingCommit, TrainingSeed,
    TrainingStore,
};

/// Typed failure surface of the engine. The HTTP layer maps each kind to a
/// status code; nothing is ever collapsed into a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum TrainingServiceError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Forbidden(#[from] Forbidden),
    #[error("trainer {trainer} already applied to training {training}")]
    DuplicateApplication {
        training: TrainingId,
        trainer: TrainerId,
    },
    #[error("training {training} does not accept applications in status '{status}'")]
    TrainingNotOpen {
        training: TrainingId,
        status: TrainingStatus,
    },
    #[error("training {training} already has trainer {assigned} assigned")]
    TrainerAlreadyAssigned {
        training: TrainingId,
        assigned: TrainerId,
    },
    #[error("application {0} was already decided")]
    ApplicationAlreadyDecided(ApplicationId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for creating a training in `Lead`.
#[derive(Debug, Clone)]
pub struct NewTraining {
    pub brand_id: BrandId,
    pub customer_id: CustomerId,
    pub title: String,
    pub delivery_mode: DeliveryMode,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Overrides the configured checklist-on-create default when set.
    pub generate_checklist: Option<bool>,
}

pub struct TrainingService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    checklist: ChecklistPolicy,
    checklist_on_create: bool,
}

impl<S, N> TrainingService<S, N>
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self::with_policy(store, notifier, ChecklistPolicy::standard(), false)
    }

    pub fn with_policy(
        store: Arc<S>,
        notifier: Arc<N>,
        checklist: ChecklistPolicy,
        checklist_on_create: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            checklist,
            checklist_on_create,
        }
    }

    /// Create a training in `Lead`, optionally instantiating its checklist
    /// right away (backoffice preference; the `Confirmed` entry hook covers
    /// the rest idempotently).
    pub fn create_training(
        &self,
        input: NewTraining,
        actor: &Actor,
    ) -> Result<Training, TrainingServiceError> {
        authz::authorize(Operation::CreateTraining, actor)?;

        let generate = input.generate_checklist.unwrap_or(self.checklist_on_create);
        let training = self.store.insert_training(TrainingSeed {
            brand_id: input.brand_id,
            customer_id: input.customer_id,
            title: input.title,
            delivery_mode: input.delivery_mode,
            status: TrainingStatus::Lead,
            start_date: input.start_date,
            end_date: input.end_date,
        })?;

        let mut batch = TrainingCommit::for_training(training.clone(), training.version);
        batch.activity.push(entry(
            &training,
            actor.username.clone(),
            EntityKind::Training,
            training.id.0,
            ActivityAction::TrainingCreated,
        ));
        if generate {
            batch.new_tasks = self.checklist.instantiate(training.delivery_mode, &[]);
            if !batch.new_tasks.is_empty() {
                batch.activity.push(entry(
                    &training,
                    actor.username.clone(),
                    EntityKind::Training,
                    training.id.0,
                    ActivityAction::ChecklistInstantiated {
                        count: batch.new_tasks.len(),
                    },
                ));
            }
        }

        let receipt = self.store.commit(batch)?;
        info!(training = %receipt.training.id, actor = %actor.username, "training created");
        Ok(receipt.training)
    }

    /// Move a training to `target`, applying the transition's side effects
    /// atomically. Reopening a cancelled training is its own capability.
    pub fn transition_training(
        &self,
        training_id: TrainingId,
        target: TrainingStatus,
        actor: &Actor,
    ) -> Result<Training, TrainingServiceError> {
        let training = self.store.training(training_id)?;

        let operation = if training.status == TrainingStatus::Cancelled {
            Operation::ReopenTraining
        } else {
            Operation::TransitionTraining
        };
        authz::authorize(operation, actor)?;

        // Trainers only ever report delivery of their own training; any other
        // request is an authorization problem, not a state machine one.
        if actor.role == Role::Trainer {
            let owns = training
                .trainer_id
                .is_some_and(|trainer| actor.owns_trainer(trainer));
            let delivery_report =
                training.status == TrainingStatus::InPreparation && target == TrainingStatus::Delivered;
            if !owns || !delivery_report {
                return Err(Forbidden::new(operation, actor).into());
            }
        }

        let tasks = self.store.tasks(training_id)?;
        let plan = machine::plan_transition(&training, target, &tasks)?;

        let mut updated = training.clone();
        updated.status = plan.to;

        let mut batch = TrainingCommit::for_training(updated, training.version);
        batch.activity.push(entry(
            &training,
            actor.username.clone(),
            EntityKind::Training,
            training.id.0,
            ActivityAction::StatusChanged {
                from: plan.from,
                to: plan.to,
            },
        ));

        if plan.instantiate_checklist {
            batch.new_tasks = self.checklist.instantiate(training.delivery_mode, &tasks);
            if !batch.new_tasks.is_empty() {
                batch.activity.push(entry(
                    &training,
                    actor.username.clone(),
                    EntityKind::Training,
                    training.id.0,
                    ActivityAction::ChecklistInstantiated {
                        count: batch.new_tasks.len(),
                    },
                ));
            }
        }

        let receipt = self.store.commit(batch)?;
        info!(
            training = %training.id,
            from = %plan.from,
            to = %plan.to,
            actor = %actor.username,
            "training status changed"
        );
        self.dispatch(NotificationEvent::StatusChanged {
            training_id: training.id,
            from: plan.from,
            to: plan.to,
        });
        Ok(receipt.training)
    }

    /// A trainer applies for the open trainer slot of a training.
    ///
    /// Carries no actor by design: submissions arrive through the public
    /// trainer portal and are attributed to the trainer profile itself.
    pub fn apply_as_trainer(
        &self,
        training_id: TrainingId,
        trainer_id: TrainerId,
        message: Option<String>,
        proposed_rate: Option<f64>,
    ) -> Result<TrainerApplication, TrainingServiceError> {
        let training = self.store.training(training_id)?;
        if !training.status.accepts_applications() {
            return Err(TrainingServiceError::TrainingNotOpen {
                training: training_id,
                status: training.status,
            });
        }

        let existing = self.store.applications_for(training_id)?;
        if existing
            .iter()
            .any(|application| application.trainer_id == trainer_id)
        {
            return Err(TrainingServiceError::DuplicateApplication {
                training: training_id,
                trainer: trainer_id,
            });
        }

        let mut batch = TrainingCommit::for_training(training.clone(), training.version);
        batch.new_application = Some(ApplicationSeed {
            training_id,
            trainer_id,
            message,
            proposed_rate,
            submitted_at: Utc::now(),
        });
        batch.activity.push(entry(
            &training,
            format!("trainer-{trainer_id}"),
            EntityKind::Training,
            training.id.0,
            ActivityAction::ApplicationSubmitted,
        ));

        let receipt = self.store.commit(batch)?;
        let application = receipt
            .created_application
            .ok_or_else(|| StoreError::Unavailable("commit dropped application".to_string()))?;
        self.dispatch(NotificationEvent::ApplicationReceived {
            training_id,
            trainer_id,
        });
        Ok(application)
    }

    /// Accept or reject a pending application. Accepting occupies the
    /// training's trainer slot; sibling pending applications stay pending and
    /// are closed out manually by backoffice.
    pub fn decide_application(
        &self,
        application_id: ApplicationId,
        outcome: ApplicationOutcome,
        actor: &Actor,
    ) -> Result<TrainerApplication, TrainingServiceError> {
        authz::authorize(Operation::DecideApplication, actor)?;

        let mut application = self.store.application(application_id)?;
        if application.status.is_decided() {
            return Err(TrainingServiceError::ApplicationAlreadyDecided(
                application_id,
            ));
        }

        let training = self.store.training(application.training_id)?;
        let mut updated_training = training.clone();

        application.status = match outcome {
            ApplicationOutcome::Accept => {
                if let Some(assigned) = training.trainer_id {
                    if assigned != application.trainer_id {
                        return Err(TrainingServiceError::TrainerAlreadyAssigned {
                            training: training.id,
                            assigned,
                        });
                    }
                }
                updated_training.trainer_id = Some(application.trainer_id);
                ApplicationStatus::Accepted
            }
            ApplicationOutcome::Reject => ApplicationStatus::Rejected,
        };
        application.decided_by = Some(actor.user_id);
        application.decided_at = Some(Utc::now());

        let mut batch = TrainingCommit::for_training(updated_training, training.version);
        batch.updated_applications.push(application.clone());
        batch.activity.push(entry(
            &training,
            actor.username.clone(),
            EntityKind::TrainerApplication,
            application.id.0,
            ActivityAction::ApplicationDecided {
                outcome: application.status,
            },
        ));

        self.store.commit(batch)?;
        info!(
            application = %application.id,
            training = %training.id,
            outcome = %application.status,
            actor = %actor.username,
            "application decided"
        );
        self.dispatch(NotificationEvent::ApplicationDecided {
            application_id,
            outcome: application.status,
        });
        Ok(application)
    }

    /// Mark a checklist task completed. Backoffice may complete any task; the
    /// assigned trainer only tasks of their own training.
    pub fn complete_task(
        &self,
        task_id: TaskId,
        actor: &Actor,
    ) -> Result<Task, TrainingServiceError> {
        authz::authorize(Operation::CompleteTask, actor)?;

        let mut task = self.store.task(task_id)?;
        let training = self.store.training(task.training_id)?;

        if actor.role == Role::Trainer {
            let owns = training
                .trainer_id
                .is_some_and(|trainer| actor.owns_trainer(trainer));
            if !owns {
                return Err(Forbidden::new(Operation::CompleteTask, actor).into());
            }
        }

        if task.completed {
            return Ok(task);
        }
        task.completed = true;
        task.completed_at = Some(Utc::now());

        let mut batch = TrainingCommit::for_training(training.clone(), training.version);
        batch.updated_tasks.push(task.clone());
        batch.activity.push(entry(
            &training,
            actor.username.clone(),
            EntityKind::Task,
            task.id.0,
            ActivityAction::TaskCompleted,
        ));

        self.store.commit(batch)?;
        Ok(task)
    }

    /// Administrative action: free the trainer slot again.
    ///
    /// The accepted application (if any) is reverted to `Pending` so the slot
    /// and the application record cannot drift apart.
    pub fn unassign_trainer(
        &self,
        training_id: TrainingId,
        actor: &Actor,
    ) -> Result<Training, TrainingServiceError> {
        authz::authorize(Operation::UnassignTrainer, actor)?;

        let training = self.store.training(training_id)?;
        let Some(removed) = training.trainer_id else {
            return Ok(training);
        };

        let mut updated = training.clone();
        updated.trainer_id = None;

        let mut batch = TrainingCommit::for_training(updated, training.version);
        for mut application in self.store.applications_for(training_id)? {
            if application.trainer_id == removed
                && application.status == ApplicationStatus::Accepted
            {
                application.status = ApplicationStatus::Pending;
                application.decided_by = None;
                application.decided_at = None;
                batch.updated_applications.push(application);
            }
        }
        batch.activity.push(entry(
            &training,
            actor.username.clone(),
            EntityKind::Training,
            training.id.0,
            ActivityAction::TrainerUnassigned,
        ));

        let receipt = self.store.commit(batch)?;
        info!(training = %training.id, trainer = %removed, actor = %actor.username, "trainer unassigned");
        Ok(receipt.training)
    }

    /// Chronological audit trail of a training.
    pub fn list_activity(
        &self,
        training_id: TrainingId,
    ) -> Result<Vec<ActivityEntry>, TrainingServiceError> {
        Ok(self.store.activity(training_id)?)
    }

    /// Current checklist of a training, in template order.
    pub fn list_tasks(&self, training_id: TrainingId) -> Result<Vec<Task>, TrainingServiceError> {
        Ok(self.store.tasks(training_id)?)
    }

    fn dispatch(&self, event: NotificationEvent) {
        if let Err(err) = self.notifier.notify(event) {
            warn!(%err, "notification dispatch failed, continuing");
        }
    }
}

fn entry(
    training: &Training,
    actor: String,
    entity_kind: EntityKind,
    entity_id: u64,
    action: ActivityAction,
) -> ActivityEntry {
    ActivityEntry {
        training_id: training.id,
        actor,
        entity_kind,
        entity_id,
        action,
        recorded_at: Utc::now(),
    }
}
