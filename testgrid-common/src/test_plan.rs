//! 测试计划聚合模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

use crate::config::{DeploymentConfig, InfrastructureConfig, ScenarioConfig};
use crate::deployment::{DeploymentCreationResult, InfrastructureProvisionResult};
use crate::status::{ScenarioStatus, TestCaseStatus, TestPlanPhase, TestPlanStatus};

/// 测试计划 - 一次"基础设施组合 x 产品版本"的执行单元
///
/// 根聚合；Deployment/TestScenario/TestCase 均为其严格从属对象，
/// 生命周期不超出本次运行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    /// 计划 ID
    pub id: String,

    /// 总体状态
    pub status: TestPlanStatus,

    /// 当前阶段
    pub phase: TestPlanPhase,

    /// 基础设施组合参数（OS、DB 引擎/版本、JDK、云厂商）
    pub infra_parameters: HashMap<String, String>,

    /// 基础设施配置
    pub infrastructure_config: InfrastructureConfig,

    /// 部署配置
    pub deployment_config: DeploymentConfig,

    /// 场景配置
    pub scenario_config: ScenarioConfig,

    /// 作业级属性
    pub job_properties: HashMap<String, String>,

    /// 运行工作区
    pub workspace: PathBuf,

    /// 场景测试仓库路径
    pub scenario_repository: PathBuf,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,

    /// 基础设施阶段产出
    pub infrastructure_provision_result: Option<InfrastructureProvisionResult>,

    /// 部署阶段产出
    pub deployment_creation_result: Option<DeploymentCreationResult>,

    /// 场景列表
    pub scenarios: Vec<TestScenario>,
}

impl TestPlan {
    /// 创建新的测试计划
    pub fn new(
        infrastructure_config: InfrastructureConfig,
        deployment_config: DeploymentConfig,
        scenario_config: ScenarioConfig,
        workspace: PathBuf,
    ) -> Self {
        let infra_parameters = infrastructure_config.parameters.clone();
        let scenario_repository = workspace.join("scenarios");
        Self {
            id: Uuid::new_v4().to_string(),
            status: TestPlanStatus::Running,
            phase: TestPlanPhase::ExecutionPlanned,
            infra_parameters,
            infrastructure_config,
            deployment_config,
            scenario_config,
            job_properties: HashMap::new(),
            workspace,
            scenario_repository,
            created_at: Utc::now(),
            completed_at: None,
            infrastructure_provision_result: None,
            deployment_creation_result: None,
            scenarios: Vec::new(),
        }
    }

    /// 迁移到目标阶段
    ///
    /// 阶段单调递增；非法回退被拒绝并保留原阶段
    pub fn set_phase(&mut self, phase: TestPlanPhase) {
        if !self.phase.can_transition_to(phase) {
            warn!(
                "拒绝阶段回退: {} -> {} (测试计划 {})",
                self.phase, phase, self.id
            );
            return;
        }
        self.phase = phase;
    }

    /// 数据桶路径（脚本输入/输出属性文件所在目录）
    pub fn data_bucket(&self) -> PathBuf {
        self.workspace.join("data-bucket")
    }

    /// 测试输出路径
    pub fn test_outputs_location(&self) -> PathBuf {
        self.data_bucket().join("test-outputs")
    }

    /// 是否启用调试模式（调试模式下不释放基础设施）
    pub fn is_debug_mode(&self) -> bool {
        self.job_properties
            .get("TESTGRID_DEBUG_MODE")
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

/// 测试场景 - 一个命名的测试套件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestScenario {
    /// 场景名称
    pub name: String,

    /// 执行状态
    pub status: ScenarioStatus,

    /// 场景目录
    pub dir: String,

    /// 输出目录
    pub output_dir: String,

    /// 用例列表（由结果解析器填充）
    pub test_cases: Vec<TestCase>,

    /// 性能测试数据行（summary.csv）
    #[serde(default)]
    pub performance_results: Vec<Vec<String>>,

    /// 性能汇总图表文件
    #[serde(default)]
    pub summary_graphs: Vec<String>,
}

impl TestScenario {
    /// 创建处于 Planned 状态的场景
    pub fn new(name: &str, dir: &str, output_dir: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Planned,
            dir: dir.to_string(),
            output_dir: output_dir.to_string(),
            test_cases: Vec::new(),
            performance_results: Vec::new(),
            summary_graphs: Vec::new(),
        }
    }

    /// 添加用例
    pub fn add_test_case(&mut self, test_case: TestCase) {
        self.test_cases.push(test_case);
    }

    /// 是否存在失败用例
    pub fn has_failures(&self) -> bool {
        self.test_cases
            .iter()
            .any(|tc| tc.status == TestCaseStatus::Fail)
    }
}

/// 测试用例 - 场景内的单个断言/采样结果
///
/// 由结果解析器创建，持久化后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// 用例名称
    pub name: String,

    /// 结果状态
    pub status: TestCaseStatus,

    /// 失败信息
    pub failure_message: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    /// 创建用例记录
    pub fn new(name: &str, status: TestCaseStatus, failure_message: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            failure_message,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentConfig, InfrastructureConfig, ScenarioConfig};

    fn sample_plan() -> TestPlan {
        TestPlan::new(
            InfrastructureConfig {
                provisioners: vec![],
                parameters: HashMap::from([("OS".to_string(), "centos".to_string())]),
            },
            DeploymentConfig { patterns: vec![] },
            ScenarioConfig {
                test_engine: Default::default(),
                dir: String::new(),
                output_dir: String::new(),
                scenarios: vec![],
                scripts: vec![],
                input_parameters: HashMap::new(),
            },
            PathBuf::from("/tmp/testgrid-ws"),
        )
    }

    #[test]
    fn test_new_plan_initial_state() {
        let plan = sample_plan();
        assert_eq!(plan.status, TestPlanStatus::Running);
        assert_eq!(plan.phase, TestPlanPhase::ExecutionPlanned);
        assert_eq!(plan.infra_parameters["OS"], "centos");
    }

    #[test]
    fn test_phase_rollback_rejected() {
        let mut plan = sample_plan();
        plan.set_phase(TestPlanPhase::InfraPhaseStarted);
        plan.set_phase(TestPlanPhase::InfraPhaseError);
        // 出错后不允许回到更早阶段
        plan.set_phase(TestPlanPhase::ExecutionPlanned);
        assert_eq!(plan.phase, TestPlanPhase::InfraPhaseError);
    }

    #[test]
    fn test_scenario_failure_detection() {
        let mut scenario = TestScenario::new("login", "scenarios", "out");
        scenario.add_test_case(TestCase::new("tc-1", TestCaseStatus::Success, None));
        assert!(!scenario.has_failures());
        scenario.add_test_case(TestCase::new(
            "tc-2",
            TestCaseStatus::Fail,
            Some("断言失败".to_string()),
        ));
        assert!(scenario.has_failures());
    }
}
