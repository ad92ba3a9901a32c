//! Audit domain models
//! Change records captured around persistence commits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which mutation kinds produce audit records for an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditPolicy {
    None,
    CreateOnly,
    UpdateOnly,
    DeleteOnly,
    All,
}

impl AuditPolicy {
    /// Whether this policy admits the given action
    pub fn admits(&self, action: AuditAction) -> bool {
        match self {
            AuditPolicy::None => false,
            AuditPolicy::CreateOnly => action == AuditAction::Create,
            AuditPolicy::UpdateOnly => action == AuditAction::Update,
            AuditPolicy::DeleteOnly => action == AuditAction::Delete,
            AuditPolicy::All => true,
        }
    }
}

/// Classified mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "Create",
            AuditAction::Update => "Update",
            AuditAction::Delete => "Delete",
        }
    }
}

/// Tracked state of a pending entity mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

/// One field-level delta within an Update record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Immutable audit record, one per qualifying mutation
///
/// Holds no foreign key into the business store: trails survive purges of
/// the data they describe.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub table_name: String,
    pub entity_id: String,
    pub action: String,
    /// Acting principal; None for system-originated changes
    pub user_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    /// Ties together all records produced by one request
    pub correlation_id: Option<String>,
    /// Full field snapshot before the mutation (absent for Create)
    pub before: Option<serde_json::Value>,
    /// Full field snapshot after the mutation (absent for Delete)
    pub after: Option<serde_json::Value>,
    /// Per-field deltas (populated only for Update)
    #[sqlx(json)]
    pub changes: Vec<FieldChange>,
}

/// Entity types that participate in change auditing
///
/// `snapshot` defaults to the entity's serde representation, so any
/// `Serialize` struct gets field-level capture for free.
pub trait Auditable: Serialize {
    const TABLE: &'static str;

    fn audit_policy() -> AuditPolicy;

    fn entity_id(&self) -> String;

    fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// One pending mutation handed to the recorder before commit
///
/// The persistence path constructs these explicitly around its writes;
/// there is no framework hook in between.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub table_name: &'static str,
    pub entity_id: String,
    pub state: EntityState,
    pub policy: AuditPolicy,
    pub before: Option<serde_json::Map<String, serde_json::Value>>,
    pub after: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PendingChange {
    /// Pending insert: captures the post-mutation snapshot
    pub fn created<E: Auditable>(entity: &E) -> Self {
        Self {
            table_name: E::TABLE,
            entity_id: entity.entity_id(),
            state: EntityState::Added,
            policy: E::audit_policy(),
            before: None,
            after: Some(entity.snapshot()),
        }
    }

    /// Pending update: captures both snapshots
    pub fn updated<E: Auditable>(before: &E, after: &E) -> Self {
        Self {
            table_name: E::TABLE,
            entity_id: after.entity_id(),
            state: EntityState::Modified,
            policy: E::audit_policy(),
            before: Some(before.snapshot()),
            after: Some(after.snapshot()),
        }
    }

    /// Pending delete: captures the pre-mutation snapshot
    pub fn deleted<E: Auditable>(entity: &E) -> Self {
        Self {
            table_name: E::TABLE,
            entity_id: entity.entity_id(),
            state: EntityState::Deleted,
            policy: E::audit_policy(),
            before: Some(entity.snapshot()),
            after: None,
        }
    }
}
