//! Training lifecycle state machine.
//!
//! The edge table is the single source of truth for legal status moves. Forward
//! movement follows the delivery pipeline one step at a time, cancellation is
//! reachable from every live status, and the only way out of `Cancelled` is the
//! admin-only reopen edge back to `Lead`.

use std::fmt;

use super::domain::{Task, Training, TrainingStatus};

/// Forward delivery pipeline, in order. Used to name the missing prerequisite
/// when a caller tries to skip ahead.
static PIPELINE: [TrainingStatus; 6] = [
    TrainingStatus::Lead,
    TrainingStatus::Offered,
    TrainingStatus::Confirmed,
    TrainingStatus::InPreparation,
    TrainingStatus::Delivered,
    TrainingStatus::Invoiced,
];

/// Legal outgoing edges per status.
pub const fn allowed_targets(from: TrainingStatus) -> &'static [TrainingStatus] {
    match from {
        TrainingStatus::Lead => &[TrainingStatus::Offered, TrainingStatus::Cancelled],
        TrainingStatus::Offered => &[TrainingStatus::Confirmed, TrainingStatus::Cancelled],
        TrainingStatus::Confirmed => &[TrainingStatus::InPreparation, TrainingStatus::Cancelled],
        TrainingStatus::InPreparation => &[TrainingStatus::Delivered, TrainingStatus::Cancelled],
        TrainingStatus::Delivered => &[TrainingStatus::Invoiced, TrainingStatus::Cancelled],
        TrainingStatus::Invoiced => &[TrainingStatus::Cancelled],
        // Reopen only; everything else stays closed once a training is cancelled.
        TrainingStatus::Cancelled => &[TrainingStatus::Lead],
    }
}

pub fn is_legal_edge(from: TrainingStatus, to: TrainingStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Why a requested transition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionBlock {
    /// Target is further down the pipeline; the named statuses must be passed first.
    MissingPrerequisite {
        required: &'static [TrainingStatus],
    },
    /// Target lies behind the current status and no reopen edge applies.
    BackwardStep,
    /// No edge between the two statuses exists at all.
    NoSuchEdge,
    /// Entering `Confirmed` needs the trainer slot filled.
    TrainerRequired,
    /// Entering `Delivered` needs every required checklist task completed.
    ChecklistIncomplete { open: usize },
}

impl fmt::Display for TransitionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionBlock::MissingPrerequisite { required } => {
                let chain = required
                    .iter()
                    .map(|status| status.label())
                    .collect::<Vec<_>>()
                    .join("', '");
                write!(f, "training must first pass through '{chain}'")
            }
            TransitionBlock::BackwardStep => f.write_str("status may not move backward"),
            TransitionBlock::NoSuchEdge => f.write_str("no such status transition exists"),
            TransitionBlock::TrainerRequired => {
                f.write_str("a trainer must be assigned before confirmation")
            }
            TransitionBlock::ChecklistIncomplete { open } => {
                write!(f, "{open} required checklist task(s) still open")
            }
        }
    }
}

/// Precondition or state violation; the training is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move training from '{from}' to '{to}': {reason}")]
pub struct InvalidTransition {
    pub from: TrainingStatus,
    pub to: TrainingStatus,
    pub reason: TransitionBlock,
}

/// Validated transition plus the side effects the service must apply with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: TrainingStatus,
    pub to: TrainingStatus,
    /// Entering `Confirmed` instantiates the checklist (idempotently).
    pub instantiate_checklist: bool,
}

/// Validate a status change against the edge table and the target's preconditions.
pub fn plan_transition(
    training: &Training,
    target: TrainingStatus,
    tasks: &[Task],
) -> Result<TransitionPlan, InvalidTransition> {
    let from = training.status;

    if !is_legal_edge(from, target) {
        return Err(InvalidTransition {
            from,
            to: target,
            reason: refusal_reason(from, target),
        });
    }

    match target {
        TrainingStatus::Confirmed if training.trainer_id.is_none() => {
            return Err(InvalidTransition {
                from,
                to: target,
                reason: TransitionBlock::TrainerRequired,
            });
        }
        TrainingStatus::Delivered => {
            let open = tasks
                .iter()
                .filter(|task| task.required && !task.completed)
                .count();
            if open > 0 {
                return Err(InvalidTransition {
                    from,
                    to: target,
                    reason: TransitionBlock::ChecklistIncomplete { open },
                });
            }
        }
        _ => {}
    }

    Ok(TransitionPlan {
        from,
        to: target,
        instantiate_checklist: target == TrainingStatus::Confirmed,
    })
}

fn refusal_reason(from: TrainingStatus, to: TrainingStatus) -> TransitionBlock {
    let position = |status| PIPELINE.iter().position(|entry| *entry == status);
    match (position(from), position(to)) {
        (Some(current), Some(requested)) if requested > current + 1 => {
            TransitionBlock::MissingPrerequisite {
                required: &PIPELINE[current + 1..requested],
            }
        }
        (Some(current), Some(requested)) if requested <= current => TransitionBlock::BackwardStep,
        _ => TransitionBlock::NoSuchEdge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::training::domain::{
        BrandId, CustomerId, DeliveryMode, TaskId, TrainerId, TrainingId,
    };

    fn training(status: TrainingStatus, trainer: Option<TrainerId>) -> Training {
        Training {
            id: TrainingId(1),
            brand_id: BrandId(1),
            customer_id: CustomerId(1),
            title: "Rust Grundlagen".to_string(),
            delivery_mode: DeliveryMode::Online,
            status,
            start_date: None,
            end_date: None,
            trainer_id: trainer,
            version: 1,
        }
    }

    fn task(required: bool, completed: bool) -> Task {
        Task {
            id: TaskId(1),
            training_id: TrainingId(1),
            template_key: "tech-check".to_string(),
            title: "Run tech check".to_string(),
            position: 0,
            required,
            completed,
            completed_at: None,
        }
    }

    #[test]
    fn pipeline_advances_one_step_at_a_time() {
        let steps = [
            (TrainingStatus::Lead, TrainingStatus::Offered),
            (TrainingStatus::Offered, TrainingStatus::Confirmed),
            (TrainingStatus::Confirmed, TrainingStatus::InPreparation),
            (TrainingStatus::InPreparation, TrainingStatus::Delivered),
            (TrainingStatus::Delivered, TrainingStatus::Invoiced),
        ];
        for (from, to) in steps {
            assert!(is_legal_edge(from, to), "{from} -> {to} should be legal");
        }
    }

    #[test]
    fn cancellation_reachable_from_every_live_status() {
        for status in TrainingStatus::ordered() {
            if status == TrainingStatus::Cancelled {
                assert!(!is_legal_edge(status, TrainingStatus::Cancelled));
            } else {
                assert!(is_legal_edge(status, TrainingStatus::Cancelled));
            }
        }
    }

    #[test]
    fn reopen_is_the_only_exit_from_cancelled() {
        assert_eq!(
            allowed_targets(TrainingStatus::Cancelled),
            &[TrainingStatus::Lead]
        );
    }

    #[test]
    fn skipping_ahead_names_the_missing_prerequisite() {
        let lead = training(TrainingStatus::Lead, None);
        let err = plan_transition(&lead, TrainingStatus::Delivered, &[])
            .expect_err("skip must be refused");
        assert_eq!(
            err.reason,
            TransitionBlock::MissingPrerequisite {
                required: &[
                    TrainingStatus::Offered,
                    TrainingStatus::Confirmed,
                    TrainingStatus::InPreparation,
                ]
            }
        );
        assert!(err.to_string().contains("confirmed"));
    }

    #[test]
    fn backward_moves_are_refused() {
        let delivered = training(TrainingStatus::Delivered, Some(TrainerId(5)));
        let err = plan_transition(&delivered, TrainingStatus::Lead, &[])
            .expect_err("backward move must be refused");
        assert_eq!(err.reason, TransitionBlock::BackwardStep);
    }

    #[test]
    fn confirmation_requires_an_assigned_trainer() {
        let offered = training(TrainingStatus::Offered, None);
        let err = plan_transition(&offered, TrainingStatus::Confirmed, &[])
            .expect_err("confirmation without trainer must fail");
        assert_eq!(err.reason, TransitionBlock::TrainerRequired);

        let staffed = training(TrainingStatus::Offered, Some(TrainerId(5)));
        let plan = plan_transition(&staffed, TrainingStatus::Confirmed, &[]).expect("plan");
        assert!(plan.instantiate_checklist);
    }

    #[test]
    fn delivery_requires_required_tasks_done() {
        let prepared = training(TrainingStatus::InPreparation, Some(TrainerId(5)));
        let tasks = vec![task(true, true), task(true, false), task(false, false)];
        let err = plan_transition(&prepared, TrainingStatus::Delivered, &tasks)
            .expect_err("open required task must block delivery");
        assert_eq!(err.reason, TransitionBlock::ChecklistIncomplete { open: 1 });

        let done = vec![task(true, true), task(false, false)];
        let plan = plan_transition(&prepared, TrainingStatus::Delivered, &done).expect("plan");
        assert!(!plan.instantiate_checklist);
    }

    #[test]
    fn same_status_request_is_not_an_edge() {
        let lead = training(TrainingStatus::Lead, None);
        let err =
            plan_transition(&lead, TrainingStatus::Lead, &[]).expect_err("self-loop refused");
        assert_eq!(err.reason, TransitionBlock::BackwardStep);
    }
}
