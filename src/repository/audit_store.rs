//! Audit store (审计数据访问)
//! 与业务库物理隔离的追加式存储；审计记录与业务数据之间没有外键

use crate::{config::AppConfig, error::AppError, models::audit::AuditEntry};
use secrecy::ExposeSecret;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub struct AuditStore {
    db: PgPool,
}

impl AuditStore {
    /// 连接审计库并确保表结构存在
    ///
    /// 未单独配置审计库 URL 时退化为主库连接串（仍使用独立连接池，
    /// 审计写入不占用业务连接）。
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let url = config
            .audit
            .url
            .as_ref()
            .unwrap_or(&config.database.url)
            .expose_secret()
            .clone();

        let db = PgPoolOptions::new()
            .max_connections(config.audit.max_connections)
            .acquire_timeout(Duration::from_secs(config.audit.acquire_timeout_secs))
            .connect(&url)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create audit store pool: {}", e);
                AppError::Config(format!("Audit store unavailable: {}", e))
            })?;

        let store = Self { db };
        store.ensure_schema().await?;

        tracing::info!(
            separate_store = config.audit.url.is_some(),
            "Audit store initialized"
        );

        Ok(store)
    }

    /// 从现有连接池构造（测试用）
    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// 建表与索引
    /// 审计库不参与业务迁移，由存储自身负责表结构
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_entries (
                id UUID PRIMARY KEY,
                table_name TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                action TEXT NOT NULL,
                user_id UUID,
                occurred_at TIMESTAMPTZ NOT NULL,
                correlation_id TEXT,
                before JSONB,
                after JSONB,
                changes JSONB NOT NULL DEFAULT '[]'::jsonb
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        // 按 (表, 实体, 时间倒序) 检索轨迹
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_audit_entries_trail
            ON audit_entries (table_name, entity_id, occurred_at DESC)
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 批量插入审计记录
    pub async fn insert_many(&self, entries: &[AuditEntry]) -> Result<(), AppError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;

        for entry in entries {
            let changes = serde_json::to_value(&entry.changes)
                .map_err(|e| AppError::Internal(format!("Failed to encode changes: {}", e)))?;

            sqlx::query(
                r#"
                INSERT INTO audit_entries (
                    id, table_name, entity_id, action, user_id,
                    occurred_at, correlation_id, before, after, changes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(entry.id)
            .bind(&entry.table_name)
            .bind(&entry.entity_id)
            .bind(&entry.action)
            .bind(entry.user_id)
            .bind(entry.occurred_at)
            .bind(&entry.correlation_id)
            .bind(&entry.before)
            .bind(&entry.after)
            .bind(changes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        metrics::counter!("audit.entries_written").increment(entries.len() as u64);

        Ok(())
    }

    /// 查询某实体的审计轨迹，最近的记录在前
    pub async fn find_trail(
        &self,
        table_name: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT * FROM audit_entries
            WHERE table_name = $1 AND entity_id = $2
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(table_name)
        .bind(entity_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
