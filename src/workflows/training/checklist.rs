//! Checklist policy: a declarative table mapping a training's delivery mode to
//! the ordered set of tasks the backoffice works through before delivery.
//!
//! Extending the checklist means adding rows here; the state machine never
//! changes for it.

use super::domain::{DeliveryMode, Task};

/// One row of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTemplate {
    pub key: &'static str,
    pub title: &'static str,
    pub required: bool,
}

/// Seed for a task about to be persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSeed {
    pub template_key: String,
    pub title: String,
    pub position: u32,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct ChecklistPolicy {
    rows: Vec<(DeliveryMode, TaskTemplate)>,
}

impl ChecklistPolicy {
    pub fn standard() -> Self {
        Self {
            rows: standard_rows(),
        }
    }

    pub fn templates_for(&self, mode: DeliveryMode) -> Vec<&TaskTemplate> {
        self.rows
            .iter()
            .filter(|(row_mode, _)| *row_mode == mode)
            .map(|(_, template)| template)
            .collect()
    }

    /// Build seeds for every template not already present on the training.
    ///
    /// Idempotent per training: templates are matched by key against the
    /// existing task set, so re-invocation creates nothing new.
    pub fn instantiate(&self, mode: DeliveryMode, existing: &[Task]) -> Vec<TaskSeed> {
        self.templates_for(mode)
            .into_iter()
            .enumerate()
            .filter(|(_, template)| {
                !existing
                    .iter()
                    .any(|task| task.template_key == template.key)
            })
            .map(|(position, template)| TaskSeed {
                template_key: template.key.to_string(),
                title: template.title.to_string(),
                position: position as u32,
                required: template.required,
            })
            .collect()
    }
}

impl Default for ChecklistPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_rows() -> Vec<(DeliveryMode, TaskTemplate)> {
    vec![
        (
            DeliveryMode::Online,
            TaskTemplate {
                key: "tech-check",
                title: "Run tech check with the customer",
                required: true,
            },
        ),
        (
            DeliveryMode::Online,
            TaskTemplate {
                key: "send-access-link",
                title: "Send access link to participants",
                required: true,
            },
        ),
        (
            DeliveryMode::Online,
            TaskTemplate {
                key: "record-attendance",
                title: "Record attendance",
                required: true,
            },
        ),
        (
            DeliveryMode::Online,
            TaskTemplate {
                key: "send-certificate",
                title: "Send certificates of participation",
                required: true,
            },
        ),
        (
            DeliveryMode::Classroom,
            TaskTemplate {
                key: "book-venue",
                title: "Book and confirm the venue",
                required: true,
            },
        ),
        (
            DeliveryMode::Classroom,
            TaskTemplate {
                key: "ship-materials",
                title: "Ship training materials to the venue",
                required: true,
            },
        ),
        (
            DeliveryMode::Classroom,
            TaskTemplate {
                key: "confirm-trainer-travel",
                title: "Confirm trainer travel arrangements",
                required: true,
            },
        ),
        (
            DeliveryMode::Classroom,
            TaskTemplate {
                key: "record-attendance",
                title: "Record attendance",
                required: true,
            },
        ),
        (
            DeliveryMode::Classroom,
            TaskTemplate {
                key: "send-certificate",
                title: "Send certificates of participation",
                required: true,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::training::domain::{TaskId, TrainingId};

    fn task_from(seed: &TaskSeed) -> Task {
        Task {
            id: TaskId(seed.position as u64 + 1),
            training_id: TrainingId(1),
            template_key: seed.template_key.clone(),
            title: seed.title.clone(),
            position: seed.position,
            required: seed.required,
            completed: false,
            completed_at: None,
        }
    }

    #[test]
    fn online_checklist_has_four_ordered_templates() {
        let policy = ChecklistPolicy::standard();
        let keys: Vec<&str> = policy
            .templates_for(DeliveryMode::Online)
            .iter()
            .map(|template| template.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "tech-check",
                "send-access-link",
                "record-attendance",
                "send-certificate"
            ]
        );
    }

    #[test]
    fn classroom_checklist_has_five_ordered_templates() {
        let policy = ChecklistPolicy::standard();
        let keys: Vec<&str> = policy
            .templates_for(DeliveryMode::Classroom)
            .iter()
            .map(|template| template.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "book-venue",
                "ship-materials",
                "confirm-trainer-travel",
                "record-attendance",
                "send-certificate"
            ]
        );
    }

    #[test]
    fn instantiation_preserves_template_order_as_position() {
        let policy = ChecklistPolicy::standard();
        let seeds = policy.instantiate(DeliveryMode::Classroom, &[]);
        let positions: Vec<u32> = seeds.iter().map(|seed| seed.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn instantiation_is_idempotent() {
        let policy = ChecklistPolicy::standard();
        let first = policy.instantiate(DeliveryMode::Online, &[]);
        assert_eq!(first.len(), 4);

        let existing: Vec<Task> = first.iter().map(task_from).collect();
        let second = policy.instantiate(DeliveryMode::Online, &existing);
        assert!(second.is_empty(), "re-invocation must not duplicate tasks");
    }

    #[test]
    fn partial_checklist_is_topped_up_without_duplicates() {
        let policy = ChecklistPolicy::standard();
        let seeds = policy.instantiate(DeliveryMode::Online, &[]);
        let existing: Vec<Task> = seeds.iter().take(2).map(task_from).collect();

        let remainder = policy.instantiate(DeliveryMode::Online, &existing);
        let keys: Vec<&str> = remainder
            .iter()
            .map(|seed| seed.template_key.as_str())
            .collect();
        assert_eq!(keys, vec!["record-attendance", "send-certificate"]);
    }
}
