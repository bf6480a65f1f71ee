//! 测试引擎执行器

mod jmeter;
mod shell;
mod testng;

pub use jmeter::JMeterExecutor;
pub use shell::ShellTestExecutor;
pub use testng::TestNgExecutor;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use testgrid_common::{DeploymentCreationResult, TestEngineType, TestPlan, TestScenario};

use crate::{AutomationError, Result};

/// 测试引擎执行器
///
/// 按能力集选择（can_run）；中止是尽力而为的操作，
/// 引擎没有取消钩子时为空操作
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// 执行器名称
    fn name(&self) -> &str;

    /// 是否能运行指定引擎类型
    fn can_run(&self, engine: TestEngineType) -> bool;

    /// 运行场景入口脚本
    async fn execute(
        &self,
        test_plan: &TestPlan,
        scenario: &TestScenario,
        script_file: &str,
        deployment: &DeploymentCreationResult,
    ) -> Result<()>;

    /// 中止执行（尽力而为）
    async fn abort(&self) -> Result<()> {
        Ok(())
    }
}

/// 执行器工厂
pub struct TestExecutorFactory {
    executors: Vec<Arc<dyn TestExecutor>>,
}

impl TestExecutorFactory {
    /// 创建并注册默认执行器
    pub fn with_default_executors() -> Self {
        Self {
            executors: vec![
                Arc::new(JMeterExecutor::new()),
                Arc::new(TestNgExecutor::new()),
                Arc::new(ShellTestExecutor::new()),
            ],
        }
    }

    /// 按引擎类型选择执行器
    pub fn executor_for(&self, engine: TestEngineType) -> Result<Arc<dyn TestExecutor>> {
        for executor in &self.executors {
            if executor.can_run(engine) {
                debug!("引擎 {} 使用执行器 {}", engine, executor.name());
                return Ok(Arc::clone(executor));
            }
        }
        Err(AutomationError::UnsupportedEngine(engine.to_string()))
    }
}

impl Default for TestExecutorFactory {
    fn default() -> Self {
        Self::with_default_executors()
    }
}

/// 构建测试脚本的环境变量：部署输出 + 主机列表 + 场景输入参数
pub(crate) fn deployment_environment(
    test_plan: &TestPlan,
    deployment: &DeploymentCreationResult,
) -> HashMap<String, String> {
    let mut environment = test_plan.job_properties.clone();
    environment.extend(deployment.properties.clone());
    environment.extend(test_plan.scenario_config.input_parameters.clone());
    for host in &deployment.hosts {
        let label = host.label.to_uppercase().replace('-', "_");
        environment.insert(format!("HOST_{}", label), host.ip.clone());
        if let Some(port) = host.port {
            environment.insert(format!("PORT_{}", label), port.to_string());
        }
    }
    environment.insert("TEST_PLAN_ID".to_string(), test_plan.id.clone());
    environment
}

/// 场景的结果输出目录
pub fn scenario_output_dir(test_plan: &TestPlan, scenario: &TestScenario) -> std::path::PathBuf {
    test_plan
        .test_outputs_location()
        .join(&scenario.output_dir)
        .join("scenarios")
        .join(&scenario.name)
}

/// 场景脚本所在目录
pub fn scenario_location(test_plan: &TestPlan, scenario: &TestScenario) -> std::path::PathBuf {
    test_plan.scenario_repository.join(&scenario.dir).join(&scenario.name)
}

/// 确保目录存在
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use testgrid_common::Host;

    #[test]
    fn test_factory_resolves_each_engine() {
        let factory = TestExecutorFactory::with_default_executors();
        assert_eq!(
            factory.executor_for(TestEngineType::Jmeter).unwrap().name(),
            "JMETER"
        );
        assert_eq!(
            factory.executor_for(TestEngineType::Testng).unwrap().name(),
            "TESTNG"
        );
        assert_eq!(
            factory.executor_for(TestEngineType::Shell).unwrap().name(),
            "SHELL"
        );
    }

    #[test]
    fn test_deployment_environment_exports_hosts() {
        let mut deployment = DeploymentCreationResult::default();
        deployment.hosts.push(Host {
            label: "api-node".to_string(),
            ip: "10.1.0.2".to_string(),
            port: Some(9443),
        });
        deployment
            .properties
            .insert("PRODUCT_URL".to_string(), "https://10.1.0.2".to_string());

        let plan = testgrid_common::TestPlan::new(
            testgrid_common::InfrastructureConfig {
                provisioners: vec![],
                parameters: Default::default(),
            },
            testgrid_common::DeploymentConfig { patterns: vec![] },
            testgrid_common::ScenarioConfig {
                test_engine: Default::default(),
                dir: String::new(),
                output_dir: String::new(),
                scenarios: vec![],
                scripts: vec![],
                input_parameters: Default::default(),
            },
            std::path::PathBuf::from("/tmp/ws"),
        );

        let environment = deployment_environment(&plan, &deployment);
        assert_eq!(environment["HOST_API_NODE"], "10.1.0.2");
        assert_eq!(environment["PORT_API_NODE"], "9443");
        assert_eq!(environment["PRODUCT_URL"], "https://10.1.0.2");
    }
}
