//! Shell 测试执行器

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use testgrid_common::{
    DeploymentCreationResult, ShellExecutor, TestEngineType, TestPlan, TestScenario,
};

use super::{deployment_environment, ensure_dir, scenario_location, scenario_output_dir, TestExecutor};
use crate::{AutomationError, Result};

const DEFAULT_SCENARIO_TIMEOUT_SECS: u64 = 7200;

/// Shell 测试执行器
///
/// 直接运行场景声明的脚本文件
pub struct ShellTestExecutor;

impl ShellTestExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellTestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestExecutor for ShellTestExecutor {
    fn name(&self) -> &str {
        "SHELL"
    }

    fn can_run(&self, engine: TestEngineType) -> bool {
        engine == TestEngineType::Shell
    }

    async fn execute(
        &self,
        test_plan: &TestPlan,
        scenario: &TestScenario,
        script_file: &str,
        deployment: &DeploymentCreationResult,
    ) -> Result<()> {
        let location = scenario_location(test_plan, scenario);
        let output_dir = scenario_output_dir(test_plan, scenario);
        ensure_dir(&output_dir)?;

        info!("运行 Shell 场景: {} (脚本 {})", scenario.name, script_file);

        let mut environment = deployment_environment(test_plan, deployment);
        environment.insert(
            "TESTGRID_SCENARIO_OUTPUT".to_string(),
            output_dir.display().to_string(),
        );

        let executor = ShellExecutor::new(Some(&location)).with_environment(environment);
        let shell_result = executor
            .execute(
                &format!("bash {}", script_file),
                Duration::from_secs(DEFAULT_SCENARIO_TIMEOUT_SECS),
            )
            .await?;

        if !shell_result.success() {
            return Err(AutomationError::ExecutionFailed(format!(
                "测试脚本退出码 {} (场景 {})",
                shell_result.exit_code, scenario.name
            )));
        }
        Ok(())
    }
}
