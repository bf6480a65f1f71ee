//! 测试场景仓储

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::TestScenarioRecord;

/// 测试场景仓储
pub struct TestScenarioRepository {
    pool: SqlitePool,
}

impl TestScenarioRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建场景记录，返回行 ID
    pub async fn create(
        &self,
        test_plan_id: &str,
        name: &str,
        status: &str,
        dir: Option<&str>,
        output_dir: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO test_scenarios (test_plan_id, name, status, dir, output_dir, created_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(test_plan_id)
        .bind(name)
        .bind(status)
        .bind(dir)
        .bind(output_dir)
        .execute(&self.pool)
        .await?;

        let scenario_id = result.last_insert_rowid();
        debug!("持久化场景 {} (计划 {}, 行 {})", name, test_plan_id, scenario_id);

        Ok(scenario_id)
    }

    /// 更新场景状态
    pub async fn update_status(&self, id: i64, status: &str) -> Result<()> {
        sqlx::query("UPDATE test_scenarios SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 获取计划下的全部场景
    pub async fn list_by_plan(&self, test_plan_id: &str) -> Result<Vec<TestScenarioRecord>> {
        let records = sqlx::query_as::<_, TestScenarioRecord>(
            r#"
            SELECT id, test_plan_id, name, status, dir, output_dir, created_at
            FROM test_scenarios
            WHERE test_plan_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(test_plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
