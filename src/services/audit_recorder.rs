//! 变更审计服务
//!
//! 持久层在提交前将待写入的实体变更集显式交给 intercept 分类打标；
//! 业务事务提交后由 record 异步落盘。审计库写入失败只记日志，
//! 永远不会中断业务操作。

use crate::{
    error::AppError,
    models::audit::*,
    repository::audit_store::AuditStore,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuditRecorder {
    store: Arc<AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    /// 在业务事务提交前同步分类一批待提交变更
    ///
    /// 整批记录共享同一时间戳和关联 ID。策略不允许的动作被跳过，
    /// 不产生记录。
    pub fn intercept(
        changes: &[PendingChange],
        user_id: Option<Uuid>,
        correlation_id: Option<&str>,
    ) -> Vec<AuditEntry> {
        let occurred_at = Utc::now();
        let mut entries = Vec::new();

        for change in changes {
            let action = match change.state {
                EntityState::Added => AuditAction::Create,
                EntityState::Modified => AuditAction::Update,
                EntityState::Deleted => AuditAction::Delete,
            };

            if !change.policy.admits(action) {
                continue;
            }

            let (before, after, field_changes) = match action {
                AuditAction::Create => {
                    (None, change.after.clone().map(serde_json::Value::Object), Vec::new())
                }
                AuditAction::Delete => {
                    (change.before.clone().map(serde_json::Value::Object), None, Vec::new())
                }
                AuditAction::Update => {
                    let diff = Self::diff_snapshots(
                        change.before.as_ref(),
                        change.after.as_ref(),
                    );
                    (
                        change.before.clone().map(serde_json::Value::Object),
                        change.after.clone().map(serde_json::Value::Object),
                        diff,
                    )
                }
            };

            entries.push(AuditEntry {
                id: Uuid::new_v4(),
                table_name: change.table_name.to_string(),
                entity_id: change.entity_id.clone(),
                action: action.as_str().to_string(),
                user_id,
                occurred_at,
                correlation_id: correlation_id.map(|s| s.to_string()),
                before,
                after,
                changes: field_changes,
            });
        }

        entries
    }

    /// 将审计记录异步写入审计库
    ///
    /// 在独立任务中执行，业务提交不等待；失败记 WARN 后丢弃。
    pub fn record(&self, entries: Vec<AuditEntry>) {
        if entries.is_empty() {
            return;
        }

        let store = self.store.clone();
        tokio::spawn(async move {
            let count = entries.len();
            if let Err(e) = store.insert_many(&entries).await {
                metrics::counter!("audit.write_failures").increment(1);
                tracing::warn!(
                    error = %e,
                    count,
                    "Failed to write audit entries. Continuing with business operation."
                );
            }
        });
    }

    /// 查询某实体的审计轨迹，最近的记录在前
    pub async fn trail(
        &self,
        table_name: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, AppError> {
        self.store.find_trail(table_name, entity_id).await
    }

    /// 计算脏字段集：两份快照中字符串化后不一致的字段
    fn diff_snapshots(
        before: Option<&serde_json::Map<String, serde_json::Value>>,
        after: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Vec<FieldChange> {
        let empty = serde_json::Map::new();
        let before = before.unwrap_or(&empty);
        let after = after.unwrap_or(&empty);

        let mut fields: Vec<&String> = before.keys().chain(after.keys()).collect();
        fields.sort();
        fields.dedup();

        let mut changes = Vec::new();
        for field in fields {
            let old_value = before.get(field).and_then(Self::stringify);
            let new_value = after.get(field).and_then(Self::stringify);

            if old_value != new_value {
                changes.push(FieldChange {
                    field: field.clone(),
                    old_value,
                    new_value,
                });
            }
        }

        changes
    }

    /// 字段值字符串化；null 视为缺失
    fn stringify(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Clone)]
    struct Gadget {
        id: u32,
        label: String,
        count: i64,
    }

    impl Auditable for Gadget {
        const TABLE: &'static str = "gadgets";

        fn audit_policy() -> AuditPolicy {
            AuditPolicy::All
        }

        fn entity_id(&self) -> String {
            self.id.to_string()
        }
    }

    #[derive(Serialize, Clone)]
    struct Silent {
        id: u32,
    }

    impl Auditable for Silent {
        const TABLE: &'static str = "silent";

        fn audit_policy() -> AuditPolicy {
            AuditPolicy::None
        }

        fn entity_id(&self) -> String {
            self.id.to_string()
        }
    }

    fn gadget() -> Gadget {
        Gadget {
            id: 7,
            label: "widget".to_string(),
            count: 3,
        }
    }

    #[test]
    fn test_create_produces_after_only() {
        let g = gadget();
        let changes = [PendingChange::created(&g)];
        let entries = AuditRecorder::intercept(&changes, None, None);

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.action, "Create");
        assert_eq!(entry.table_name, "gadgets");
        assert_eq!(entry.entity_id, "7");
        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
        assert!(entry.changes.is_empty());
    }

    #[test]
    fn test_delete_produces_before_only() {
        let g = gadget();
        let changes = [PendingChange::deleted(&g)];
        let entries = AuditRecorder::intercept(&changes, None, None);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "Delete");
        assert!(entries[0].before.is_some());
        assert!(entries[0].after.is_none());
    }

    #[test]
    fn test_update_produces_both_snapshots_and_deltas() {
        let old = gadget();
        let mut new = old.clone();
        new.label = "renamed".to_string();

        let changes = [PendingChange::updated(&old, &new)];
        let entries = AuditRecorder::intercept(&changes, None, None);

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.action, "Update");
        assert!(entry.before.is_some());
        assert!(entry.after.is_some());

        // 只有实际变化的字段出现在 delta 中
        assert_eq!(entry.changes.len(), 1);
        assert_eq!(entry.changes[0].field, "label");
        assert_eq!(entry.changes[0].old_value.as_deref(), Some("widget"));
        assert_eq!(entry.changes[0].new_value.as_deref(), Some("renamed"));
    }

    #[test]
    fn test_policy_none_records_nothing() {
        let s = Silent { id: 1 };
        let changes = [
            PendingChange::created(&s),
            PendingChange::updated(&s, &s),
            PendingChange::deleted(&s),
        ];
        let entries = AuditRecorder::intercept(&changes, None, None);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_batch_shares_timestamp_and_correlation() {
        let user_id = Uuid::new_v4();
        let g = gadget();
        let changes = [PendingChange::created(&g), PendingChange::deleted(&g)];

        let entries = AuditRecorder::intercept(&changes, Some(user_id), Some("trace-42"));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].occurred_at, entries[1].occurred_at);
        assert_eq!(entries[0].correlation_id.as_deref(), Some("trace-42"));
        assert_eq!(entries[1].correlation_id.as_deref(), Some("trace-42"));
        assert_eq!(entries[0].user_id, Some(user_id));
    }

    #[test]
    fn test_system_change_has_no_actor() {
        let g = gadget();
        let entries = AuditRecorder::intercept(&[PendingChange::created(&g)], None, None);
        assert!(entries[0].user_id.is_none());
    }

    #[test]
    fn test_diff_stringifies_non_string_values() {
        let old = gadget();
        let mut new = old.clone();
        new.count = 4;

        let entries =
            AuditRecorder::intercept(&[PendingChange::updated(&old, &new)], None, None);

        assert_eq!(entries[0].changes.len(), 1);
        assert_eq!(entries[0].changes[0].field, "count");
        assert_eq!(entries[0].changes[0].old_value.as_deref(), Some("3"));
        assert_eq!(entries[0].changes[0].new_value.as_deref(), Some("4"));
    }

    #[test]
    fn test_unchanged_update_yields_empty_delta() {
        let g = gadget();
        let entries = AuditRecorder::intercept(&[PendingChange::updated(&g, &g)], None, None);

        assert_eq!(entries.len(), 1);
        assert!(entries[0].changes.is_empty());
    }
}
