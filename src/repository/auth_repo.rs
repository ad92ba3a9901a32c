//! Authentication repository (认证数据访问)
//! 刷新令牌的存储、轮换与撤销

use crate::{error::AppError, models::auth::RefreshToken};
use sqlx::PgPool;
use uuid::Uuid;

pub struct AuthRepository {
    db: PgPool,
}

impl AuthRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 存储刷新令牌
    pub async fn store_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, token_hash, user_id, created_at, expires_at, revoked_at, replaced_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .bind(token.replaced_by)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 根据哈希查找刷新令牌
    pub async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AppError> {
        let token =
            sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token_hash = $1")
                .bind(token_hash)
                .fetch_optional(&self.db)
                .await?;

        Ok(token)
    }

    /// 轮换刷新令牌：撤销旧令牌并插入后继令牌，两步在同一事务内完成
    ///
    /// 撤销使用 compare-and-swap 语义：只有仍然活跃（未撤销且未过期）的
    /// 旧令牌才会被更新。并发轮换同一令牌时至多一个调用成功，落败方
    /// 返回 false。
    pub async fn rotate_refresh_token(
        &self,
        old_token_hash: &str,
        successor: &RefreshToken,
    ) -> Result<bool, AppError> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW(), replaced_by = $2
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(old_token_hash)
        .bind(successor.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // 旧令牌不存在、已撤销或已过期；事务随 drop 回滚
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, token_hash, user_id, created_at, expires_at, revoked_at, replaced_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(successor.id)
        .bind(&successor.token_hash)
        .bind(successor.user_id)
        .bind(successor.created_at)
        .bind(successor.expires_at)
        .bind(successor.revoked_at)
        .bind(successor.replaced_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    /// 根据哈希撤销刷新令牌
    /// 幂等：令牌不存在、已撤销或已过期时不报错
    pub async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 撤销用户的所有活跃刷新令牌（改密后强制重新登录）
    pub async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// 清理过期或已撤销且超出保留期的刷新令牌
    pub async fn cleanup_expired_tokens(&self, retention_days: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < NOW() - INTERVAL '1 day' * $1
               OR (revoked_at IS NOT NULL AND revoked_at < NOW() - INTERVAL '1 day' * $1)
            "#,
        )
        .bind(retention_days)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
