//! 车辆服务：车辆与所有权关系的增删改查
//!
//! 每个写路径在提交前构造待提交变更集交给审计拦截，提交成功后
//! 异步落盘审计记录。删除一律是软删除。

use crate::{
    error::AppError,
    models::{audit::PendingChange, car::*},
    repository::{car_repo::CarRepository, user_repo::UserRepository},
    services::audit_recorder::AuditRecorder,
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct CarService {
    db: PgPool,
    recorder: Arc<AuditRecorder>,
}

impl CarService {
    pub fn new(db: PgPool, recorder: Arc<AuditRecorder>) -> Self {
        Self { db, recorder }
    }

    /// 创建车辆
    pub async fn create_car(
        &self,
        req: CreateCarRequest,
        actor: Uuid,
        correlation_id: &str,
    ) -> Result<Car, AppError> {
        let repo = CarRepository::new(self.db.clone());

        if repo.vin_exists(&req.vin).await? {
            return Err(AppError::Conflict("VIN already registered".to_string()));
        }

        let now = Utc::now();
        let car = Car {
            id: Uuid::new_v4(),
            make: req.make,
            model: req.model,
            year: req.year,
            vin: req.vin,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            created_by: Some(actor),
            updated_at: now,
            updated_by: Some(actor),
        };

        let entries = AuditRecorder::intercept(
            &[PendingChange::created(&car)],
            Some(actor),
            Some(correlation_id),
        );

        repo.insert_car(&car).await?;
        self.recorder.record(entries);

        tracing::info!(car_id = %car.id, vin = %car.vin, "Car created");

        Ok(car)
    }

    /// 获取车辆
    pub async fn get_car(&self, id: Uuid) -> Result<Car, AppError> {
        let repo = CarRepository::new(self.db.clone());
        repo.find_car(id).await?.ok_or(AppError::NotFound)
    }

    /// 列出车辆
    pub async fn list_cars(&self, limit: i64, offset: i64) -> Result<Vec<Car>, AppError> {
        let repo = CarRepository::new(self.db.clone());
        repo.list_cars(limit, offset).await
    }

    /// 更新车辆
    pub async fn update_car(
        &self,
        id: Uuid,
        req: UpdateCarRequest,
        actor: Uuid,
        correlation_id: &str,
    ) -> Result<Car, AppError> {
        let repo = CarRepository::new(self.db.clone());

        let before = repo.find_car(id).await?.ok_or(AppError::NotFound)?;

        if req.vin != before.vin && repo.vin_exists(&req.vin).await? {
            return Err(AppError::Conflict("VIN already registered".to_string()));
        }

        let mut after = before.clone();
        after.make = req.make;
        after.model = req.model;
        after.year = req.year;
        after.vin = req.vin;
        after.updated_at = Utc::now();
        after.updated_by = Some(actor);

        let entries = AuditRecorder::intercept(
            &[PendingChange::updated(&before, &after)],
            Some(actor),
            Some(correlation_id),
        );

        if !repo.update_car(&after).await? {
            return Err(AppError::NotFound);
        }
        self.recorder.record(entries);

        tracing::info!(car_id = %after.id, "Car updated");

        Ok(after)
    }

    /// 删除车辆（软删除）
    pub async fn delete_car(
        &self,
        id: Uuid,
        actor: Uuid,
        correlation_id: &str,
    ) -> Result<(), AppError> {
        let repo = CarRepository::new(self.db.clone());

        let before = repo.find_car(id).await?.ok_or(AppError::NotFound)?;

        let mut deleted = before.clone();
        deleted.is_deleted = true;
        deleted.deleted_at = Some(Utc::now());
        deleted.updated_by = Some(actor);

        let entries = AuditRecorder::intercept(
            &[PendingChange::deleted(&before)],
            Some(actor),
            Some(correlation_id),
        );

        if !repo.soft_delete_car(&deleted).await? {
            return Err(AppError::NotFound);
        }
        self.recorder.record(entries);

        tracing::info!(car_id = %id, "Car deleted");

        Ok(())
    }

    // ==================== Owner assignments ====================

    /// 将车辆分配给所有者
    pub async fn assign_owner(
        &self,
        car_id: Uuid,
        req: AssignOwnerRequest,
        actor: Uuid,
        correlation_id: &str,
    ) -> Result<OwnerCar, AppError> {
        let repo = CarRepository::new(self.db.clone());
        let user_repo = UserRepository::new(self.db.clone());

        // 车辆与所有者都必须存在
        repo.find_car(car_id).await?.ok_or(AppError::NotFound)?;
        user_repo
            .find_by_id(req.owner_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Owner does not exist".to_string()))?;

        let now = Utc::now();
        let assignment = OwnerCar {
            id: Uuid::new_v4(),
            car_id,
            owner_id: req.owner_id,
            ownership_type: req.ownership_type,
            assigned_at: now,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let entries = AuditRecorder::intercept(
            &[PendingChange::created(&assignment)],
            Some(actor),
            Some(correlation_id),
        );

        repo.insert_assignment(&assignment).await?;
        self.recorder.record(entries);

        tracing::info!(
            car_id = %car_id,
            owner_id = %assignment.owner_id,
            "Owner assigned"
        );

        Ok(assignment)
    }

    /// 列出车辆的所有权关系
    pub async fn list_owners(&self, car_id: Uuid) -> Result<Vec<OwnerCar>, AppError> {
        let repo = CarRepository::new(self.db.clone());
        repo.list_assignments_for_car(car_id).await
    }

    /// 解除所有权关系（软删除）
    pub async fn unassign_owner(
        &self,
        assignment_id: Uuid,
        actor: Uuid,
        correlation_id: &str,
    ) -> Result<(), AppError> {
        let repo = CarRepository::new(self.db.clone());

        let before = repo
            .find_assignment(assignment_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut deleted = before.clone();
        deleted.is_deleted = true;
        deleted.deleted_at = Some(Utc::now());

        let entries = AuditRecorder::intercept(
            &[PendingChange::deleted(&before)],
            Some(actor),
            Some(correlation_id),
        );

        if !repo.soft_delete_assignment(&deleted).await? {
            return Err(AppError::NotFound);
        }
        self.recorder.record(entries);

        tracing::info!(assignment_id = %assignment_id, "Owner unassigned");

        Ok(())
    }
}
