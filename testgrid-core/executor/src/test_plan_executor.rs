//! 测试计划执行器

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use testgrid_automation::{ResultParserRegistry, TestExecutorFactory};
use testgrid_common::{TestCaseStatus, TestPlan, TestPlanStatus};
use testgrid_deployment::DeployerRegistry;
use testgrid_infrastructure::InfrastructureProviderRegistry;
use testgrid_storage::TestPlanStore;

use crate::deploy_phase::DeployPhase;
use crate::infra_phase::InfraPhase;
use crate::phase::release_infrastructure;
use crate::scenario_executor::ScenarioExecutor;
use crate::test_phase::TestPhase;
use crate::Result;

const SUMMARY_LINE_LENGTH: usize = 72;

/// 测试计划执行器
///
/// 按 基础设施 -> 部署 -> 测试 的固定顺序驱动三个阶段；
/// 前置阶段出错时后续阶段不执行（由各阶段前置条件保证）
pub struct TestPlanExecutor {
    infra_phase: InfraPhase,
    deploy_phase: DeployPhase,
    test_phase: TestPhase,
    infra_registry: Arc<InfrastructureProviderRegistry>,
    store: Arc<dyn TestPlanStore>,
}

impl TestPlanExecutor {
    /// 以显式依赖构建执行器
    pub fn new(
        infra_registry: Arc<InfrastructureProviderRegistry>,
        deployer_registry: Arc<DeployerRegistry>,
        executor_factory: TestExecutorFactory,
        parser_registry: ResultParserRegistry,
        store: Arc<dyn TestPlanStore>,
    ) -> Self {
        let infra_phase = InfraPhase::new(Arc::clone(&infra_registry), Arc::clone(&store));
        let deploy_phase = DeployPhase::new(
            Arc::clone(&deployer_registry),
            Arc::clone(&infra_registry),
            Arc::clone(&store),
        );
        let scenario_executor = ScenarioExecutor::new(executor_factory);
        let test_phase = TestPhase::new(
            scenario_executor,
            parser_registry,
            Arc::clone(&infra_registry),
            Arc::clone(&store),
        );
        Self {
            infra_phase,
            deploy_phase,
            test_phase,
            infra_registry,
            store,
        }
    }

    /// 以默认注册表构建执行器
    pub fn with_defaults(store: Arc<dyn TestPlanStore>) -> Self {
        Self::new(
            Arc::new(InfrastructureProviderRegistry::with_default_providers()),
            Arc::new(DeployerRegistry::with_default_deployers()),
            TestExecutorFactory::with_default_executors(),
            ResultParserRegistry::with_default_parsers(),
            store,
        )
    }

    /// 执行测试计划
    ///
    /// 返回 true 当且仅当最终状态为 SUCCESS
    pub async fn execute(&self, plan: TestPlan) -> Result<bool> {
        let start = Instant::now();

        self.store.persist_test_plan(&plan).await?;

        let plan = self.infra_phase.execute(plan).await?;
        let plan = self.deploy_phase.execute(plan).await?;
        let plan = self.test_phase.execute(plan).await?;

        self.print_summary(&plan, start.elapsed());

        Ok(plan.status == TestPlanStatus::Success)
    }

    /// 中止测试计划，尽力释放已供应的资源
    pub async fn abort(&self, plan: &TestPlan) {
        warn!("中止测试计划 {}", plan.id);
        release_infrastructure(&self.infra_registry, plan).await;
    }

    /// 打印运行摘要
    ///
    /// 计划处于不一致状态（如打印时仍为 RUNNING）时只记录诊断日志，
    /// 摘要本身绝不报错
    pub fn print_summary(&self, plan: &TestPlan, elapsed: Duration) {
        if plan.status == TestPlanStatus::Running {
            error!(
                "打印摘要时测试计划 {} 仍处于 RUNNING 状态，结果可能不完整",
                plan.id
            );
        }

        info!("");
        info!("{}", "-".repeat(SUMMARY_LINE_LENGTH));
        info!("测试计划摘要 (Test Plan Summary for {:?}):", plan.infra_parameters);
        for scenario in &plan.scenarios {
            let verdict = if scenario.status == testgrid_common::ScenarioStatus::Error {
                "ERROR"
            } else if scenario.has_failures() {
                "FAIL"
            } else {
                "SUCCESS"
            };
            let dots_width = SUMMARY_LINE_LENGTH
                .saturating_sub(scenario.name.len() + verdict.len() + 2)
                .max(3);
            info!("{} {} {}", scenario.name, ".".repeat(dots_width), verdict);
        }

        let mut total_cases = 0usize;
        let mut failed_cases = 0usize;
        let mut failed_lines = Vec::new();
        for scenario in &plan.scenarios {
            for test_case in &scenario.test_cases {
                total_cases += 1;
                if test_case.status == TestCaseStatus::Fail {
                    failed_cases += 1;
                    failed_lines.push(format!(
                        "{}::{}: {}",
                        scenario.name,
                        test_case.name,
                        test_case.failure_message.as_deref().unwrap_or("unknown")
                    ));
                }
            }
        }

        if !failed_lines.is_empty() {
            info!("");
            info!("Failed tests:");
            for line in &failed_lines {
                info!("{}", line);
            }
            info!(" - ");
        }
        info!("");
        info!("Tests run: {}, Failures/Errors: {}", total_cases, failed_cases);
        info!("");

        let banner = match plan.status {
            TestPlanStatus::Success => "TEST RUN SUCCESS",
            TestPlanStatus::Fail => "TEST RUN FAIL",
            TestPlanStatus::Error => "TEST RUN ERROR",
            TestPlanStatus::Running => "TEST RUN INCONCLUSIVE",
        };
        info!("{}", banner);
        info!("总耗时: {}", format_duration(elapsed));
        info!("{}", "-".repeat(SUMMARY_LINE_LENGTH));
        info!("");
    }
}

/// 人类可读的耗时格式
fn format_duration(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use testgrid_common::{
        DeploymentConfig, InfrastructureConfig, ScenarioConfig, ScenarioStatus, TestCase,
        TestScenario,
    };
    use testgrid_storage::MemoryTestPlanStore;

    fn sample_plan() -> TestPlan {
        TestPlan::new(
            InfrastructureConfig {
                provisioners: vec![],
                parameters: HashMap::from([("DBEngine".to_string(), "mysql".to_string())]),
            },
            DeploymentConfig { patterns: vec![] },
            ScenarioConfig {
                test_engine: Default::default(),
                dir: "scenarios".to_string(),
                output_dir: "out".to_string(),
                scenarios: vec![],
                scripts: vec![],
                input_parameters: HashMap::new(),
            },
            PathBuf::from("/tmp/tg-summary"),
        )
    }

    #[test]
    fn test_print_summary_never_panics_on_inconsistent_plan() {
        let executor = TestPlanExecutor::with_defaults(Arc::new(MemoryTestPlanStore::new()));

        let mut plan = sample_plan();
        // 打印时仍是 RUNNING：只应产生诊断日志
        plan.status = TestPlanStatus::Running;

        let mut scenario = TestScenario::new("s1", "scenarios", "out");
        scenario.status = ScenarioStatus::Completed;
        scenario.add_test_case(TestCase::new(
            "tc-fail",
            TestCaseStatus::Fail,
            Some("断言失败".to_string()),
        ));
        plan.scenarios.push(scenario);

        executor.print_summary(&plan, Duration::from_secs(75));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(Duration::from_secs(3700)), "1h 1m 40s");
    }
}
