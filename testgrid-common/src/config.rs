//! testgrid.yaml 配置模型

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{CommonError, Result};

/// testgrid.yaml 顶层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestGridConfig {
    /// 基础设施配置
    #[serde(rename = "infrastructureConfig")]
    pub infrastructure_config: InfrastructureConfig,

    /// 部署配置
    #[serde(rename = "deploymentConfig")]
    pub deployment_config: DeploymentConfig,

    /// 场景配置
    #[serde(rename = "scenarioConfig")]
    pub scenario_config: ScenarioConfig,

    /// 作业级属性（所有脚本可见）
    #[serde(rename = "jobProperties", default)]
    pub job_properties: HashMap<String, String>,
}

impl TestGridConfig {
    /// 从 YAML 文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommonError::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| CommonError::ConfigError(format!("配置文件解析失败: {}", e)))
    }
}

/// 基础设施配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureConfig {
    /// 供应器列表（按声明顺序）
    #[serde(default)]
    pub provisioners: Vec<Provisioner>,

    /// 基础设施组合参数（OS、DB、JDK 等）
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl InfrastructureConfig {
    /// 获取第一个供应器
    pub fn first_provisioner(&self) -> Option<&Provisioner> {
        self.provisioners.first()
    }
}

/// 基础设施供应器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provisioner {
    /// 供应器名称
    pub name: String,

    /// 脚本列表
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl Provisioner {
    /// 按 order 升序返回指定阶段判定的脚本
    pub fn scripts_ordered(&self) -> Vec<&Script> {
        let mut scripts: Vec<&Script> = self.scripts.iter().collect();
        scripts.sort_by_key(|s| s.order);
        scripts
    }
}

/// 部署配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// 部署模式列表
    #[serde(rename = "deploymentPatterns", default)]
    pub patterns: Vec<DeploymentPattern>,
}

impl DeploymentConfig {
    /// 获取第一个部署模式
    pub fn first_pattern(&self) -> Option<&DeploymentPattern> {
        self.patterns.first()
    }
}

/// 部署模式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPattern {
    /// 模式名称
    pub name: String,

    /// 部署脚本列表
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl DeploymentPattern {
    /// 按 order 升序返回脚本
    pub fn scripts_ordered(&self) -> Vec<&Script> {
        let mut scripts: Vec<&Script> = self.scripts.iter().collect();
        scripts.sort_by_key(|s| s.order);
        scripts
    }
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// 测试引擎类型
    #[serde(rename = "testType", default)]
    pub test_engine: TestEngineType,

    /// 场景目录（相对场景仓库）
    #[serde(default)]
    pub dir: String,

    /// 结果输出目录（相对数据桶）
    #[serde(rename = "outputDir", default)]
    pub output_dir: String,

    /// 声明的场景列表
    #[serde(default)]
    pub scenarios: Vec<ScenarioDef>,

    /// 场景级脚本
    #[serde(default)]
    pub scripts: Vec<Script>,

    /// 传递给测试脚本的输入参数
    #[serde(rename = "inputParameters", default)]
    pub input_parameters: HashMap<String, String>,
}

/// 单个场景声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDef {
    /// 场景名称
    pub name: String,

    /// 入口脚本文件
    #[serde(default)]
    pub file: Option<String>,
}

/// 测试自动化引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestEngineType {
    /// JMeter
    Jmeter,
    /// TestNG
    #[default]
    Testng,
    /// 直接执行 Shell 脚本
    Shell,
}

impl std::fmt::Display for TestEngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            TestEngineType::Jmeter => "JMETER",
            TestEngineType::Testng => "TESTNG",
            TestEngineType::Shell => "SHELL",
        };
        write!(f, "{}", value)
    }
}

/// 脚本的生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptPhase {
    /// 仅创建
    Create,
    /// 创建且负责销毁
    CreateAndDelete,
    /// 部署
    Deploy,
    /// 销毁
    Destroy,
}

/// 脚本背后的供应技术
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptType {
    /// Shell 脚本
    Shell,
    /// AWS CloudFormation 模板
    Cloudformation,
    /// Kubernetes 清单
    Kubernetes,
    /// Terraform 模块
    Terraform,
}

/// 外部脚本定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// 脚本名称
    pub name: String,

    /// 供应技术类型
    #[serde(rename = "type")]
    pub script_type: ScriptType,

    /// 生命周期阶段（CloudFormation 缺省为 CREATE_AND_DELETE）
    #[serde(default)]
    pub phase: Option<ScriptPhase>,

    /// 脚本文件路径（相对所在仓库）
    pub file: String,

    /// 同阶段内的执行顺序
    #[serde(default)]
    pub order: u32,

    /// 脚本输入参数
    #[serde(rename = "inputParameters", default)]
    pub input_parameters: HashMap<String, String>,
}

impl Script {
    /// 解析生效阶段
    pub fn phase(&self) -> ScriptPhase {
        match self.phase {
            Some(phase) => phase,
            None if self.script_type == ScriptType::Cloudformation => ScriptPhase::CreateAndDelete,
            None => ScriptPhase::Create,
        }
    }

    /// 是否参与创建阶段
    pub fn is_creation(&self) -> bool {
        matches!(self.phase(), ScriptPhase::Create | ScriptPhase::CreateAndDelete)
    }

    /// 是否参与销毁阶段
    pub fn is_destruction(&self) -> bool {
        matches!(self.phase(), ScriptPhase::Destroy | ScriptPhase::CreateAndDelete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
infrastructureConfig:
  provisioners:
    - name: provision-vms
      scripts:
        - name: create-network
          type: SHELL
          phase: CREATE
          file: infra/create-network.sh
          order: 1
        - name: create-instances
          type: CLOUDFORMATION
          file: infra/instances.yaml
          order: 2
        - name: destroy-network
          type: SHELL
          phase: DESTROY
          file: infra/destroy-network.sh
          order: 3
  parameters:
    OS: ubuntu
    DBEngine: mysql
deploymentConfig:
  deploymentPatterns:
    - name: single-node
      scripts:
        - name: deploy-product
          type: SHELL
          phase: DEPLOY
          file: deploy/deploy.sh
scenarioConfig:
  testType: JMETER
  dir: scenarios
  outputDir: scenario-outputs
  scenarios:
    - name: login-flow
      file: login.jmx
jobProperties:
  PRODUCT_VERSION: "1.2.0"
"#;

    #[test]
    fn test_parse_testgrid_yaml() {
        let config: TestGridConfig = serde_yaml::from_str(SAMPLE_YAML).unwrap();
        let provisioner = config.infrastructure_config.first_provisioner().unwrap();
        assert_eq!(provisioner.name, "provision-vms");
        assert_eq!(provisioner.scripts.len(), 3);
        assert_eq!(config.infrastructure_config.parameters["DBEngine"], "mysql");
        assert_eq!(config.scenario_config.test_engine, TestEngineType::Jmeter);
        assert_eq!(config.job_properties["PRODUCT_VERSION"], "1.2.0");
    }

    #[test]
    fn test_cloudformation_phase_default() {
        let config: TestGridConfig = serde_yaml::from_str(SAMPLE_YAML).unwrap();
        let provisioner = config.infrastructure_config.first_provisioner().unwrap();
        let cf_script = &provisioner.scripts[1];
        assert_eq!(cf_script.phase, None);
        assert_eq!(cf_script.phase(), ScriptPhase::CreateAndDelete);
        assert!(cf_script.is_creation());
        assert!(cf_script.is_destruction());
    }

    #[test]
    fn test_scripts_ordered() {
        let provisioner = Provisioner {
            name: "p".to_string(),
            scripts: vec![
                Script {
                    name: "b".to_string(),
                    script_type: ScriptType::Shell,
                    phase: Some(ScriptPhase::Create),
                    file: "b.sh".to_string(),
                    order: 2,
                    input_parameters: HashMap::new(),
                },
                Script {
                    name: "a".to_string(),
                    script_type: ScriptType::Shell,
                    phase: Some(ScriptPhase::Create),
                    file: "a.sh".to_string(),
                    order: 1,
                    input_parameters: HashMap::new(),
                },
            ],
        };
        let ordered = provisioner.scripts_ordered();
        assert_eq!(ordered[0].name, "a");
        assert_eq!(ordered[1].name, "b");
    }
}
