//! Capability-based authorization.
//!
//! Permissions live in one table: each operation names the roles allowed to
//! invoke it. Trainer-scoped operations additionally require the acting user
//! to own the trainer profile in question (`Actor::owns_trainer`); that check
//! sits with the service because it needs the loaded entities.

use super::domain::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTraining,
    TransitionTraining,
    ReopenTraining,
    DecideApplication,
    CompleteTask,
    UnassignTrainer,
}

impl Operation {
    /// The capability table. One row per operation, evaluated as data.
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Operation::CreateTraining => &[Role::Admin, Role::BackofficeUser],
            Operation::TransitionTraining => &[Role::Admin, Role::BackofficeUser, Role::Trainer],
            Operation::ReopenTraining => &[Role::Admin],
            Operation::DecideApplication => &[Role::Admin, Role::BackofficeUser],
            Operation::CompleteTask => &[Role::Admin, Role::BackofficeUser, Role::Trainer],
            Operation::UnassignTrainer => &[Role::Admin, Role::BackofficeUser],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Operation::CreateTraining => "create_training",
            Operation::TransitionTraining => "transition_training",
            Operation::ReopenTraining => "reopen_training",
            Operation::DecideApplication => "decide_application",
            Operation::CompleteTask => "complete_task",
            Operation::UnassignTrainer => "unassign_trainer",
        }
    }
}

/// Authorization failure. Distinct from `InvalidTransition`: the caller needs
/// different credentials, not different input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{actor}' ({role}) is not permitted to {operation}")]
pub struct Forbidden {
    pub actor: String,
    pub role: Role,
    pub operation: &'static str,
}

impl Forbidden {
    pub fn new(operation: Operation, actor: &Actor) -> Self {
        Self {
            actor: actor.username.clone(),
            role: actor.role,
            operation: operation.label(),
        }
    }
}

/// Check the capability table. Must run before any side effect.
pub fn authorize(operation: Operation, actor: &Actor) -> Result<(), Forbidden> {
    if operation.allowed_roles().contains(&actor.role) {
        Ok(())
    } else {
        Err(Forbidden::new(operation, actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::training::domain::{TrainerId, UserId};

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: UserId(1),
            username: "s.lang".to_string(),
            role,
            trainer_id: match role {
                Role::Trainer => Some(TrainerId(9)),
                _ => None,
            },
        }
    }

    #[test]
    fn reopen_is_admin_only() {
        assert!(authorize(Operation::ReopenTraining, &actor(Role::Admin)).is_ok());
        assert!(authorize(Operation::ReopenTraining, &actor(Role::BackofficeUser)).is_err());
        assert!(authorize(Operation::ReopenTraining, &actor(Role::Trainer)).is_err());
    }

    #[test]
    fn trainers_cannot_decide_applications() {
        let err = authorize(Operation::DecideApplication, &actor(Role::Trainer))
            .expect_err("trainer must be refused");
        assert_eq!(err.operation, "decide_application");
        assert_eq!(err.role, Role::Trainer);
    }

    #[test]
    fn backoffice_roles_manage_trainings() {
        for operation in [
            Operation::CreateTraining,
            Operation::TransitionTraining,
            Operation::DecideApplication,
            Operation::UnassignTrainer,
        ] {
            assert!(authorize(operation, &actor(Role::Admin)).is_ok());
            assert!(authorize(operation, &actor(Role::BackofficeUser)).is_ok());
        }
    }

    #[test]
    fn forbidden_message_names_actor_and_operation() {
        let err = Forbidden::new(Operation::UnassignTrainer, &actor(Role::Trainer));
        let message = err.to_string();
        assert!(message.contains("s.lang"));
        assert!(message.contains("unassign_trainer"));
    }
}
