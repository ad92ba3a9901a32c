//! Car and ownership domain models

use super::audit::{Auditable, AuditPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Car entity
///
/// Soft-deleted rows keep their data; every read path filters on
/// `is_deleted = FALSE`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Car {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,

    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Auditable for Car {
    const TABLE: &'static str = "cars";

    fn audit_policy() -> AuditPolicy {
        AuditPolicy::All
    }

    fn entity_id(&self) -> String {
        self.id.to_string()
    }

    // Snapshots capture business fields only; bookkeeping stamps would
    // show up as a dirty field on every update
    fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("make".to_string(), self.make.clone().into());
        map.insert("model".to_string(), self.model.clone().into());
        map.insert("year".to_string(), self.year.into());
        map.insert("vin".to_string(), self.vin.clone().into());
        map
    }
}

/// Owner assignment linking a car to a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OwnerCar {
    pub id: Uuid,
    pub car_id: Uuid,
    pub owner_id: Uuid,
    pub ownership_type: String,
    pub assigned_at: DateTime<Utc>,

    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auditable for OwnerCar {
    const TABLE: &'static str = "owner_cars";

    fn audit_policy() -> AuditPolicy {
        AuditPolicy::All
    }

    fn entity_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("car_id".to_string(), self.car_id.to_string().into());
        map.insert("owner_id".to_string(), self.owner_id.to_string().into());
        map.insert(
            "ownership_type".to_string(),
            self.ownership_type.clone().into(),
        );
        map.insert(
            "assigned_at".to_string(),
            self.assigned_at.to_rfc3339().into(),
        );
        map
    }
}

/// Create car request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCarRequest {
    #[validate(length(min = 1, max = 100, message = "Make must be 1-100 characters"))]
    pub make: String,
    #[validate(length(min = 1, max = 100, message = "Model must be 1-100 characters"))]
    pub model: String,
    #[validate(range(min = 1901, max = 2100, message = "Year must be greater than 1900"))]
    pub year: i32,
    #[validate(length(equal = 17, message = "VIN must be exactly 17 characters"))]
    pub vin: String,
}

/// Update car request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCarRequest {
    #[validate(length(min = 1, max = 100, message = "Make must be 1-100 characters"))]
    pub make: String,
    #[validate(length(min = 1, max = 100, message = "Model must be 1-100 characters"))]
    pub model: String,
    #[validate(range(min = 1901, max = 2100, message = "Year must be greater than 1900"))]
    pub year: i32,
    #[validate(length(equal = 17, message = "VIN must be exactly 17 characters"))]
    pub vin: String,
}

/// Assign owner request
#[derive(Debug, Deserialize, Validate)]
pub struct AssignOwnerRequest {
    pub owner_id: Uuid,
    #[validate(length(min = 1, max = 50))]
    pub ownership_type: String,
}

/// Car response DTO
#[derive(Debug, Serialize)]
pub struct CarResponse {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Car> for CarResponse {
    fn from(car: Car) -> Self {
        Self {
            id: car.id,
            make: car.make,
            model: car.model,
            year: car.year,
            vin: car.vin,
            created_at: car.created_at,
            updated_at: car.updated_at,
        }
    }
}
