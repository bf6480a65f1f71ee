//! 测试执行阶段

use std::sync::Arc;
use tracing::{error, info, warn};

use testgrid_automation::{scenario_output_dir, ResultParserRegistry};
use testgrid_common::{
    DeploymentCreationResult, ScenarioStatus, TestPlan, TestPlanPhase, TestPlanStatus,
    TestScenario,
};
use testgrid_infrastructure::InfrastructureProviderRegistry;
use testgrid_storage::TestPlanStore;

use crate::phase::{
    persist_phase, persist_progress, persist_status, print_progress_banner,
    release_infrastructure,
};
use crate::scenario_executor::ScenarioExecutor;
use crate::Result;

/// 测试阶段
pub struct TestPhase {
    scenario_executor: ScenarioExecutor,
    parser_registry: ResultParserRegistry,
    infra_registry: Arc<InfrastructureProviderRegistry>,
    store: Arc<dyn TestPlanStore>,
}

impl TestPhase {
    pub fn new(
        scenario_executor: ScenarioExecutor,
        parser_registry: ResultParserRegistry,
        infra_registry: Arc<InfrastructureProviderRegistry>,
        store: Arc<dyn TestPlanStore>,
    ) -> Self {
        Self {
            scenario_executor,
            parser_registry,
            infra_registry,
            store,
        }
    }

    /// 执行测试阶段
    pub async fn execute(&self, mut plan: TestPlan) -> Result<TestPlan> {
        print_progress_banner("开始测试阶段", &plan);

        if plan.phase == TestPlanPhase::DeployPhaseSucceeded
            && plan.status == TestPlanStatus::Running
        {
            persist_phase(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::TestPhaseStarted,
            )
            .await?;
        } else {
            error!("测试计划 {} 的部署阶段未成功，不启动测试阶段", plan.id);
            persist_status(self.store.as_ref(), &mut plan, TestPlanStatus::Error).await?;
            finalize_phase(&mut plan);
            self.store.persist_test_plan(&plan).await?;
            return Ok(plan);
        }

        self.run_scenario_tests(&mut plan).await?;

        // 根据结果更新最终状态
        self.update_status_from_results(&mut plan).await?;

        // 清理：测试阶段结束后释放基础设施
        release_infrastructure(&self.infra_registry, &plan).await;

        plan.completed_at = Some(chrono::Utc::now());
        self.store.persist_test_plan(&plan).await?;
        Ok(plan)
    }

    /// 运行 testgrid.yaml 声明的全部场景
    async fn run_scenario_tests(&self, plan: &mut TestPlan) -> Result<()> {
        let deployment = plan
            .deployment_creation_result
            .clone()
            .unwrap_or_else(DeploymentCreationResult::default);

        let scenario_defs = plan.scenario_config.scenarios.clone();
        if scenario_defs.is_empty() {
            warn!("测试计划 {} 没有声明任何场景", plan.id);
            persist_progress(
                self.store.as_ref(),
                plan,
                TestPlanPhase::TestPhaseIncomplete,
                TestPlanStatus::Error,
            )
            .await?;
            return Ok(());
        }

        info!("--------- 已识别场景 ---------------------");
        for def in &scenario_defs {
            info!("{}", def.name);
        }
        info!("-------------------------------------------------");

        for def in scenario_defs {
            let scenario = TestScenario::new(
                &def.name,
                &plan.scenario_config.dir,
                &plan.scenario_config.output_dir,
            );
            let script_file = def.file.clone().unwrap_or_default();

            // 引擎执行
            let scenario = self
                .scenario_executor
                .run_scenario(plan, scenario, &script_file, &deployment)
                .await;

            // 结果解析；单个场景的解析失败不影响其余场景
            let scenario = self.populate_test_cases(plan, scenario).await?;

            // 场景持久化失败视为测试阶段不完整
            if let Err(e) = self.store.persist_test_scenario(&plan.id, &scenario).await {
                error!("场景 {} 持久化失败: {}", scenario.name, e);
                persist_progress(
                    self.store.as_ref(),
                    plan,
                    TestPlanPhase::TestPhaseIncomplete,
                    TestPlanStatus::Error,
                )
                .await?;
            }

            plan.scenarios.push(scenario);
        }

        Ok(())
    }

    /// 为场景选择解析器并填充用例
    async fn populate_test_cases(
        &self,
        plan: &mut TestPlan,
        mut scenario: TestScenario,
    ) -> Result<TestScenario> {
        if scenario.status == ScenarioStatus::Error {
            // 引擎失败的场景没有可解析的结果
            return Ok(scenario);
        }

        let location = scenario_output_dir(plan, &scenario);
        let parser = self.parser_registry.parser_for(scenario.clone(), &location);
        let mut parser = match parser {
            Some(parser) => parser,
            None => {
                error!(
                    "场景 {} 在 {} 下找不到结果解析器",
                    scenario.name,
                    location.display()
                );
                persist_progress(
                    self.store.as_ref(),
                    plan,
                    TestPlanPhase::TestPhaseIncomplete,
                    TestPlanStatus::Error,
                )
                .await?;
                scenario.status = ScenarioStatus::Error;
                return Ok(scenario);
            }
        };

        info!("--- 解析场景 {} 的结果", scenario.name);
        if let Err(e) = parser.parse_results() {
            // 解析错误只影响该场景
            error!("场景 {} 结果解析失败: {}", scenario.name, e);
            persist_progress(
                self.store.as_ref(),
                plan,
                TestPlanPhase::TestPhaseIncomplete,
                TestPlanStatus::Error,
            )
            .await?;
            scenario.status = ScenarioStatus::Error;
            return Ok(scenario);
        }

        info!("--- 归档场景 {} 的结果产物", scenario.name);
        let artifact_dir = plan.workspace.join("artifacts").join(&scenario.name);
        if let Err(e) = parser.persist_results(&artifact_dir) {
            warn!("场景 {} 结果归档失败: {}", scenario.name, e);
        }

        let mut parsed = parser.into_scenario();
        // 执行完成但没有任何结果视为场景错误
        if parsed.test_cases.is_empty() && parsed.performance_results.is_empty() {
            warn!("场景 {} 没有产出任何用例", parsed.name);
            parsed.status = ScenarioStatus::Error;
        }
        Ok(parsed)
    }

    /// 由场景/用例结果推导测试计划最终状态
    ///
    /// 任一场景 Error -> 计划 Error；阶段完成且有失败用例 -> Fail；
    /// 否则 Success
    async fn update_status_from_results(&self, plan: &mut TestPlan) -> Result<()> {
        if plan.status == TestPlanStatus::Error {
            finalize_phase(plan);
            self.store.persist_test_plan(plan).await?;
            return Ok(());
        }

        if plan.phase == TestPlanPhase::TestPhaseStarted {
            plan.set_phase(TestPlanPhase::TestPhaseSucceeded);
        }

        for scenario in &plan.scenarios {
            if scenario.status == ScenarioStatus::Error {
                // 场景级错误使计划进入 ERROR，而非 FAIL
                error!("发现出错场景 {}", scenario.name);
                persist_status(self.store.as_ref(), plan, TestPlanStatus::Error).await?;
                return Ok(());
            }
        }

        let has_failures = plan.scenarios.iter().any(|s| s.has_failures());
        if has_failures {
            if plan.phase == TestPlanPhase::TestPhaseSucceeded {
                persist_status(self.store.as_ref(), plan, TestPlanStatus::Fail).await?;
            } else {
                error!("存在失败用例且测试阶段不完整，计划状态记为 ERROR");
                persist_status(self.store.as_ref(), plan, TestPlanStatus::Error).await?;
            }
        } else if plan.phase == TestPlanPhase::TestPhaseSucceeded {
            persist_status(self.store.as_ref(), plan, TestPlanStatus::Success).await?;
        } else {
            info!("解析结果全部通过，但此前阶段存在问题，计划状态记为 ERROR");
            persist_status(self.store.as_ref(), plan, TestPlanStatus::Error).await?;
        }
        Ok(())
    }
}

/// 把仍处于 Started 的测试阶段收敛到对应的出错终态
fn finalize_phase(plan: &mut TestPlan) {
    if plan.phase == TestPlanPhase::TestPhaseStarted {
        plan.set_phase(TestPlanPhase::TestPhaseError);
    }
}
