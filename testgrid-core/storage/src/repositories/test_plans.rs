//! 测试计划仓储

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::TestPlanRecord;

/// 测试计划仓储
pub struct TestPlanRepository {
    pool: SqlitePool,
}

impl TestPlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 插入或更新测试计划（阶段边界写入）
    pub async fn upsert(&self, record: &TestPlanRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO test_plans
            (id, status, phase, infra_parameters, workspace, created_at, completed_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                phase = excluded.phase,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.status)
        .bind(&record.phase)
        .bind(&record.infra_parameters)
        .bind(&record.workspace)
        .bind(record.created_at)
        .bind(record.completed_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!("持久化测试计划 {} ({} / {})", record.id, record.status, record.phase);

        Ok(())
    }

    /// 根据 ID 获取测试计划
    pub async fn get_by_id(&self, id: &str) -> Result<Option<TestPlanRecord>> {
        let record = sqlx::query_as::<_, TestPlanRecord>(
            r#"
            SELECT id, status, phase, infra_parameters, workspace,
                   created_at, completed_at, updated_at
            FROM test_plans
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 列出全部测试计划（按更新时间倒序）
    pub async fn list(&self) -> Result<Vec<TestPlanRecord>> {
        let records = sqlx::query_as::<_, TestPlanRecord>(
            r#"
            SELECT id, status, phase, infra_parameters, workspace,
                   created_at, completed_at, updated_at
            FROM test_plans
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
