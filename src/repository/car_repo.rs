//! Car repository (车辆数据访问)
//! 所有读取路径显式过滤软删除行

use crate::{
    error::AppError,
    models::car::{Car, OwnerCar},
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct CarRepository {
    db: PgPool,
}

impl CarRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Cars ====================

    /// 插入车辆
    pub async fn insert_car(&self, car: &Car) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO cars (
                id, make, model, year, vin, is_deleted, deleted_at,
                created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(car.id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(&car.vin)
        .bind(car.is_deleted)
        .bind(car.deleted_at)
        .bind(car.created_at)
        .bind(car.created_by)
        .bind(car.updated_at)
        .bind(car.updated_by)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 根据 ID 查找车辆（排除软删除）
    pub async fn find_car(&self, id: Uuid) -> Result<Option<Car>, AppError> {
        let car =
            sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1 AND is_deleted = FALSE")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(car)
    }

    /// 列出车辆（排除软删除）
    pub async fn list_cars(&self, limit: i64, offset: i64) -> Result<Vec<Car>, AppError> {
        let cars = sqlx::query_as::<_, Car>(
            r#"
            SELECT * FROM cars
            WHERE is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(cars)
    }

    /// VIN 是否已被使用（包含软删除行，VIN 全局唯一）
    pub async fn vin_exists(&self, vin: &str) -> Result<bool, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM cars WHERE vin = $1")
            .bind(vin)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.is_some())
    }

    /// 更新车辆
    pub async fn update_car(&self, car: &Car) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cars
            SET make = $2, model = $3, year = $4, vin = $5,
                updated_at = $6, updated_by = $7
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(car.id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(&car.vin)
        .bind(car.updated_at)
        .bind(car.updated_by)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 软删除车辆
    pub async fn soft_delete_car(&self, car: &Car) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cars
            SET is_deleted = TRUE, deleted_at = $2, updated_at = $2, updated_by = $3
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(car.id)
        .bind(car.deleted_at)
        .bind(car.updated_by)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Owner assignments ====================

    /// 插入所有权关系
    pub async fn insert_assignment(&self, assignment: &OwnerCar) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO owner_cars (
                id, car_id, owner_id, ownership_type, assigned_at,
                is_deleted, deleted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.car_id)
        .bind(assignment.owner_id)
        .bind(&assignment.ownership_type)
        .bind(assignment.assigned_at)
        .bind(assignment.is_deleted)
        .bind(assignment.deleted_at)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 查找所有权关系（排除软删除）
    pub async fn find_assignment(&self, id: Uuid) -> Result<Option<OwnerCar>, AppError> {
        let assignment = sqlx::query_as::<_, OwnerCar>(
            "SELECT * FROM owner_cars WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(assignment)
    }

    /// 列出车辆的所有权关系（排除软删除）
    pub async fn list_assignments_for_car(&self, car_id: Uuid) -> Result<Vec<OwnerCar>, AppError> {
        let assignments = sqlx::query_as::<_, OwnerCar>(
            r#"
            SELECT * FROM owner_cars
            WHERE car_id = $1 AND is_deleted = FALSE
            ORDER BY assigned_at DESC
            "#,
        )
        .bind(car_id)
        .fetch_all(&self.db)
        .await?;

        Ok(assignments)
    }

    /// 软删除所有权关系
    pub async fn soft_delete_assignment(&self, assignment: &OwnerCar) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE owner_cars
            SET is_deleted = TRUE, deleted_at = $2, updated_at = $2
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.deleted_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
