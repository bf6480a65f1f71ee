//! JMeter 执行器

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use testgrid_common::{
    DeploymentCreationResult, ShellExecutor, TestEngineType, TestPlan, TestScenario,
};

use super::{deployment_environment, ensure_dir, scenario_location, scenario_output_dir, TestExecutor};
use crate::{AutomationError, Result};

/// 场景默认超时
const DEFAULT_SCENARIO_TIMEOUT_SECS: u64 = 7200;

/// JMeter 执行器
///
/// 非 GUI 模式运行 .jmx 工程，JTL 结果写入场景输出目录
pub struct JMeterExecutor {
    /// jmeter 可执行文件路径
    jmeter_path: String,
}

impl JMeterExecutor {
    pub fn new() -> Self {
        Self {
            jmeter_path: "jmeter".to_string(),
        }
    }

    /// 自定义 jmeter 路径
    pub fn with_path(path: &str) -> Self {
        Self {
            jmeter_path: path.to_string(),
        }
    }
}

impl Default for JMeterExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestExecutor for JMeterExecutor {
    fn name(&self) -> &str {
        "JMETER"
    }

    fn can_run(&self, engine: TestEngineType) -> bool {
        engine == TestEngineType::Jmeter
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

        let result_file = output_dir.join(format!("{}.jtl", scenario.name));
        info!(
            "运行 JMeter 场景: {} (工程 {}, 结果 {})",
            scenario.name,
            script_file,
            result_file.display()
        );

        let command = format!(
            "{} -n -t {} -l {}",
            self.jmeter_path,
            script_file,
            result_file.display()
        );

        let executor = ShellExecutor::new(Some(&location))
            .with_environment(deployment_environment(test_plan, deployment));
        let shell_result = executor
            .execute(&command, Duration::from_secs(DEFAULT_SCENARIO_TIMEOUT_SECS))
            .await?;

        if !shell_result.success() {
            return Err(AutomationError::ExecutionFailed(format!(
                "JMeter 退出码 {} (场景 {})",
                shell_result.exit_code, scenario.name
            )));
        }
        Ok(())
    }
}
