//! 测试计划存储接口

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

use testgrid_common::{TestPlan, TestScenario};

use crate::error::Result;
use crate::models::TestPlanRecord;
use crate::Storage;

/// 测试计划存储接口
///
/// 阶段执行器在每次状态迁移后、返回之前写入，保证中断后留有可审计的
/// 阶段标记。存储不可达是致命错误，核心不做重试
#[async_trait]
pub trait TestPlanStore: Send + Sync {
    /// 持久化测试计划当前状态
    async fn persist_test_plan(&self, plan: &TestPlan) -> Result<()>;

    /// 持久化场景及其用例
    async fn persist_test_scenario(&self, plan_id: &str, scenario: &TestScenario) -> Result<()>;
}

/// SQLite 实现
pub struct SqliteTestPlanStore {
    storage: Storage,
}

impl SqliteTestPlanStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl TestPlanStore for SqliteTestPlanStore {
    async fn persist_test_plan(&self, plan: &TestPlan) -> Result<()> {
        let record = TestPlanRecord {
            id: plan.id.clone(),
            status: plan.status.to_string(),
            phase: plan.phase.to_string(),
            infra_parameters: Some(serde_json::to_string(&plan.infra_parameters)?),
            workspace: plan.workspace.display().to_string(),
            created_at: plan.created_at,
            completed_at: plan.completed_at,
            updated_at: chrono::Utc::now(),
        };
        self.storage.test_plans().upsert(&record).await
    }

    async fn persist_test_scenario(&self, plan_id: &str, scenario: &TestScenario) -> Result<()> {
        let scenario_id = self
            .storage
            .scenarios()
            .create(
                plan_id,
                &scenario.name,
                &scenario.status.to_string(),
                Some(&scenario.dir),
                Some(&scenario.output_dir),
            )
            .await?;

        for test_case in &scenario.test_cases {
            self.storage
                .cases()
                .create(
                    scenario_id,
                    &test_case.name,
                    &test_case.status.to_string(),
                    test_case.failure_message.as_deref(),
                    test_case.created_at,
                )
                .await?;
        }

        debug!(
            "持久化场景 {} 及 {} 条用例 (计划 {})",
            scenario.name,
            scenario.test_cases.len(),
            plan_id
        );

        Ok(())
    }
}

/// 内存实现(用于测试)
///
/// 记录全部状态迁移轨迹，便于断言持久化顺序
#[derive(Default)]
pub struct MemoryTestPlanStore {
    /// (计划 ID, 状态, 阶段) 迁移轨迹
    pub plan_transitions: Mutex<Vec<(String, String, String)>>,

    /// 持久化过的场景快照
    pub scenarios: Mutex<Vec<(String, TestScenario)>>,
}

impl MemoryTestPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最后一次持久化的阶段
    pub fn last_phase(&self, plan_id: &str) -> Option<String> {
        self.plan_transitions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _, _)| id == plan_id)
            .map(|(_, _, phase)| phase.clone())
    }
}

#[async_trait]
impl TestPlanStore for MemoryTestPlanStore {
    async fn persist_test_plan(&self, plan: &TestPlan) -> Result<()> {
        self.plan_transitions.lock().unwrap().push((
            plan.id.clone(),
            plan.status.to_string(),
            plan.phase.to_string(),
        ));
        Ok(())
    }

    async fn persist_test_scenario(&self, plan_id: &str, scenario: &TestScenario) -> Result<()> {
        self.scenarios
            .lock()
            .unwrap()
            .push((plan_id.to_string(), scenario.clone()));
        Ok(())
    }
}
