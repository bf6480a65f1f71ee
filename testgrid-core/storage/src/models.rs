//! 数据库模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 测试计划数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestPlanRecord {
    pub id: String,
    pub status: String,
    pub phase: String,
    pub infra_parameters: Option<String>, // JSON object
    pub workspace: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// 测试场景数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestScenarioRecord {
    pub id: i64,
    pub test_plan_id: String,
    pub name: String,
    pub status: String,
    pub dir: Option<String>,
    pub output_dir: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 测试用例数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestCaseRecord {
    pub id: i64,
    pub test_scenario_id: i64,
    pub name: String,
    pub status: String,
    pub failure_message: Option<String>,
    pub created_at: DateTime<Utc>,
}
