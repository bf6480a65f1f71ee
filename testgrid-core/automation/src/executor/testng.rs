//! TestNG 执行器

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use testgrid_common::{
    DeploymentCreationResult, ShellExecutor, TestEngineType, TestPlan, TestScenario,
};

use super::{deployment_environment, ensure_dir, scenario_location, scenario_output_dir, TestExecutor};
use crate::{AutomationError, Result};

const DEFAULT_SCENARIO_TIMEOUT_SECS: u64 = 7200;

/// 场景入口脚本名
const RUN_SCENARIO_SCRIPT: &str = "run-scenario.sh";

/// TestNG 执行器
///
/// 通过场景目录下的 run-scenario.sh 包装 mvn 调用；
/// 脚本缺失时生成一个最小入口
pub struct TestNgExecutor;

impl TestNgExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TestNgExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestExecutor for TestNgExecutor {
    fn name(&self) -> &str {
        "TESTNG"
    }

    fn can_run(&self, engine: TestEngineType) -> bool {
        engine == TestEngineType::Testng
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

        let entry = if script_file.is_empty() {
            RUN_SCENARIO_SCRIPT.to_string()
        } else {
            script_file.to_string()
        };

        // 入口脚本缺失时生成最小包装
        let entry_path = location.join(&entry);
        if !entry_path.exists() {
            warn!(
                "场景 {} 缺少入口脚本 {}，生成默认 mvn 包装",
                scenario.name, entry
            );
            ensure_dir(&location)?;
            std::fs::write(
                &entry_path,
                "#!/bin/bash\nmvn clean test -B\n",
            )?;
        }

        info!("运行 TestNG 场景: {} (入口 {})", scenario.name, entry);

        let mut environment = deployment_environment(test_plan, deployment);
        environment.insert(
            "TESTGRID_SCENARIO_OUTPUT".to_string(),
            output_dir.display().to_string(),
        );

        let executor = ShellExecutor::new(Some(&location)).with_environment(environment);
        let shell_result = executor
            .execute(
                &format!("bash {}", entry),
                Duration::from_secs(DEFAULT_SCENARIO_TIMEOUT_SECS),
            )
            .await?;

        if !shell_result.success() {
            return Err(AutomationError::ExecutionFailed(format!(
                "TestNG 入口脚本退出码 {} (场景 {})",
                shell_result.exit_code, scenario.name
            )));
        }
        Ok(())
    }
}
