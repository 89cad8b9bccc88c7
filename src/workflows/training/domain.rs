use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(BrandId);
id_type!(CustomerId);
id_type!(TrainerId);
id_type!(
    /// Identifier for the central training entity.
    TrainingId
);
id_type!(TaskId);
id_type!(ApplicationId);
id_type!(UserId);

/// Lifecycle status of a training, from first customer contact to invoicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Lead,
    Offered,
    Confirmed,
    InPreparation,
    Delivered,
    Invoiced,
    Cancelled,
}

impl TrainingStatus {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Lead,
            Self::Offered,
            Self::Confirmed,
            Self::InPreparation,
            Self::Delivered,
            Self::Invoiced,
            Self::Cancelled,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Offered => "offered",
            Self::Confirmed => "confirmed",
            Self::InPreparation => "in_preparation",
            Self::Delivered => "delivered",
            Self::Invoiced => "invoiced",
            Self::Cancelled => "cancelled",
        }
    }

    /// New trainer applications are only taken before the trainer slot is settled.
    pub const fn accepts_applications(self) -> bool {
        matches!(self, Self::Lead | Self::Offered)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Online,
    Classroom,
}

impl DeliveryMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Classroom => "classroom",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User roles. Flat set, no inheritance: each operation names the roles it admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    BackofficeUser,
    Trainer,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::BackofficeUser => "backoffice_user",
            Self::Trainer => "trainer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated caller passed explicitly into every core operation.
///
/// There is deliberately no ambient current-user state; the HTTP facade resolves
/// an `Actor` per request and hands it down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    /// Linked trainer profile, when the user logs in for self-service.
    pub trainer_id: Option<TrainerId>,
}

impl Actor {
    pub fn is_backoffice(&self) -> bool {
        matches!(self.role, Role::Admin | Role::BackofficeUser)
    }

    /// Ownership predicate for trainer-scoped operations.
    pub fn owns_trainer(&self, trainer_id: TrainerId) -> bool {
        self.trainer_id == Some(trainer_id)
    }
}

/// Tenant boundary. Customers and trainings are scoped to a brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub default_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    /// A customer belongs to exactly one brand at a time.
    pub brand_id: BrandId,
    pub company_name: String,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trainer {
    pub id: TrainerId,
    /// Optional login account for trainer self-service.
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub brand_ids: Vec<BrandId>,
    pub specializations: Vec<String>,
    pub default_day_rate: Option<f64>,
}

impl Trainer {
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The central entity: a bookable engagement between a brand's customer and a trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    pub id: TrainingId,
    pub brand_id: BrandId,
    pub customer_id: CustomerId,
    pub title: String,
    pub delivery_mode: DeliveryMode,
    pub status: TrainingStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// At most one assigned trainer; optional until the workflow requires it.
    pub trainer_id: Option<TrainerId>,
    /// Optimistic-concurrency stamp, bumped by every committed write.
    pub version: u64,
}

/// One checklist item attached to a training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub training_id: TrainingId,
    pub template_key: String,
    pub title: String,
    /// Template order, preserved as the ordering key.
    pub position: u32,
    pub required: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decision requested by backoffice for a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationOutcome {
    Accept,
    Reject,
}

/// A trainer's request to be assigned to a training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerApplication {
    pub id: ApplicationId,
    pub training_id: TrainingId,
    pub trainer_id: TrainerId,
    pub status: ApplicationStatus,
    pub message: Option<String>,
    pub proposed_rate: Option<f64>,
    pub submitted_at: DateTime<Utc>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Training,
    Task,
    TrainerApplication,
}

/// Structured description of a state-changing action for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActivityAction {
    TrainingCreated,
    StatusChanged {
        from: TrainingStatus,
        to: TrainingStatus,
    },
    ChecklistInstantiated {
        count: usize,
    },
    TaskCompleted,
    ApplicationSubmitted,
    ApplicationDecided {
        outcome: ApplicationStatus,
    },
    TrainerUnassigned,
}

/// Immutable audit record. Appended on every successful mutation, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub training_id: TrainingId,
    pub actor: String,
    pub entity_kind: EntityKind,
    pub entity_id: u64,
    pub action: ActivityAction,
    pub recorded_at: DateTime<Utc>,
}
