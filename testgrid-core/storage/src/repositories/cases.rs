//! 测试用例仓储

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::TestCaseRecord;

/// 测试用例仓储
///
/// 用例写入后不再更新，重复解析产生新行（无隐式合并）
pub struct TestCaseRepository {
    pool: SqlitePool,
}

impl TestCaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建用例记录
    pub async fn create(
        &self,
        test_scenario_id: i64,
        name: &str,
        status: &str,
        failure_message: Option<&str>,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO test_cases (test_scenario_id, name, status, failure_message, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(test_scenario_id)
        .bind(name)
        .bind(status)
        .bind(failure_message)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 获取场景下的全部用例
    pub async fn list_by_scenario(&self, test_scenario_id: i64) -> Result<Vec<TestCaseRecord>> {
        let records = sqlx::query_as::<_, TestCaseRecord>(
            r#"
            SELECT id, test_scenario_id, name, status, failure_message, created_at
            FROM test_cases
            WHERE test_scenario_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(test_scenario_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
