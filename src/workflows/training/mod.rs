//! Training lifecycle engine: state machine, checklist policy, trainer
//! assignment workflow, and the capability-based authorization gating them.

pub mod authz;
pub mod checklist;
pub mod domain;
pub mod machine;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

pub use authz::{Forbidden, Operation};
pub use checklist::{ChecklistPolicy, TaskSeed, TaskTemplate};
pub use domain::{
    ActivityAction, ActivityEntry, Actor, ApplicationId, ApplicationOutcome, ApplicationStatus,
    Brand, BrandId, Customer, CustomerId, DeliveryMode, EntityKind, Role, Task, TaskId, Trainer,
    TrainerApplication, TrainerId, Training, TrainingId, TrainingStatus, UserId,
};
pub use machine::{InvalidTransition, TransitionBlock, TransitionPlan};
pub use repository::{
    ApplicationSeed, AuthProvider, CommitReceipt, NotificationEvent, Notifier, NotifyError,
    StoreError, TrainingCommit, TrainingSeed, TrainingStore,
};
pub use router::training_router;
pub use service::{NewTraining, TrainingService, TrainingServiceError};
