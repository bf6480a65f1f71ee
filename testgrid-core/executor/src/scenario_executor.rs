//! 场景执行器

use tracing::{error, info};

use testgrid_automation::TestExecutorFactory;
use testgrid_common::{DeploymentCreationResult, ScenarioStatus, TestPlan, TestScenario};

/// 场景执行器
///
/// 按场景声明的引擎类型委派给对应的测试执行器；
/// 场景级状态反映"执行是否完成"，用例成败在上层聚合
pub struct ScenarioExecutor {
    factory: TestExecutorFactory,
}

impl ScenarioExecutor {
    pub fn new(factory: TestExecutorFactory) -> Self {
        Self { factory }
    }

    /// 运行单个场景
    ///
    /// 引擎异常使场景进入 Error 状态，但场景对象始终返回给
    /// 调用方持久化，不会丢失
    pub async fn run_scenario(
        &self,
        plan: &TestPlan,
        mut scenario: TestScenario,
        script_file: &str,
        deployment: &DeploymentCreationResult,
    ) -> TestScenario {
        info!("执行场景: {}", scenario.name);
        scenario.status = ScenarioStatus::Running;

        let executor = match self.factory.executor_for(plan.scenario_config.test_engine) {
            Ok(executor) => executor,
            Err(e) => {
                error!("场景 {} 无可用测试引擎: {}", scenario.name, e);
                scenario.status = ScenarioStatus::Error;
                return scenario;
            }
        };

        match executor
            .execute(plan, &scenario, script_file, deployment)
            .await
        {
            Ok(()) => {
                // 执行完成即 Completed，与用例成败无关
                scenario.status = ScenarioStatus::Completed;
            }
            Err(e) => {
                error!("场景 {} 引擎执行失败: {}", scenario.name, e);
                scenario.status = ScenarioStatus::Error;
            }
        }

        info!("场景 {} 执行结束: {}", scenario.name, scenario.status);
        scenario
    }

    /// 中止场景执行（尽力而为）
    ///
    /// 引擎没有取消钩子时为空操作
    pub async fn abort(&self, plan: &TestPlan) {
        if let Ok(executor) = self.factory.executor_for(plan.scenario_config.test_engine) {
            if let Err(e) = executor.abort().await {
                error!("中止场景执行失败: {}", e);
            }
        }
    }
}
