//! Shell 部署器

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use testgrid_common::{
    Agent, DeploymentCreationResult, Host, InfrastructureProvisionResult, Script, ShellExecutor,
    TestPlan,
};

use crate::deployer::Deployer;
use crate::Result;

/// 部署输出属性文件名
pub const DEPLOYMENT_OUT_FILE: &str = "deployment-output.properties";

/// 部署脚本默认超时
const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 3600;

/// Shell 部署器
///
/// 执行 DEPLOY 脚本后读取脚本写出的部署输出属性：
/// `host.<label>=<ip>[:port]` 行映射为主机，
/// `agent.<instance>=<agent_id>` 行映射为远程代理，
/// 其余行原样并入结果属性
pub struct ShellDeployer;

impl ShellDeployer {
    pub fn new() -> Self {
        Self
    }

    /// 从属性集中提取主机与代理
    fn collect_endpoints(
        test_plan: &TestPlan,
        properties: &HashMap<String, String>,
    ) -> (Vec<Host>, Vec<Agent>) {
        let mut hosts = Vec::new();
        let mut agents = Vec::new();
        for (key, value) in properties {
            if let Some(label) = key.strip_prefix("host.") {
                let (ip, port) = match value.split_once(':') {
                    Some((ip, port)) => (ip.to_string(), port.parse::<u16>().ok()),
                    None => (value.clone(), None),
                };
                hosts.push(Host {
                    label: label.to_string(),
                    ip,
                    port,
                });
            } else if let Some(instance) = key.strip_prefix("agent.") {
                agents.push(Agent {
                    agent_id: value.clone(),
                    instance_name: instance.to_string(),
                    instance_id: String::new(),
                    test_plan_id: test_plan.id.clone(),
                });
            }
        }
        (hosts, agents)
    }
}

impl Default for ShellDeployer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Deployer for ShellDeployer {
    fn name(&self) -> &str {
        "SHELL"
    }

    fn can_handle(&self, script: &Script) -> bool {
        // 部署阶段当前仅支持 shell 类脚本
        matches!(script.script_type, testgrid_common::ScriptType::Shell)
    }

    async fn deploy(
        &self,
        test_plan: &TestPlan,
        script: &Script,
        provision_result: &InfrastructureProvisionResult,
    ) -> Result<DeploymentCreationResult> {
        info!("--- 执行部署脚本: {}, 文件: {}", script.name, script.file);

        let out_file = test_plan.data_bucket().join(DEPLOYMENT_OUT_FILE);

        // 部署脚本可见：供应输出 + 作业属性 + 脚本输入参数
        let mut environment = test_plan.job_properties.clone();
        environment.extend(provision_result.properties.clone());
        environment.extend(script.input_parameters.clone());
        environment.insert(
            "TESTGRID_OUTPUT_PROPS".to_string(),
            out_file.display().to_string(),
        );
        environment.insert("TEST_PLAN_ID".to_string(), test_plan.id.clone());

        let timeout = script
            .input_parameters
            .get("timeout")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_DEPLOY_TIMEOUT_SECS));

        let executor =
            ShellExecutor::new(Some(&test_plan.workspace)).with_environment(environment);
        let shell_result = executor
            .execute(&format!("bash {}", script.file), timeout)
            .await?;

        if !shell_result.success() {
            error!(
                "部署脚本 {} 退出码 {}，输出:\n{}",
                script.name, shell_result.exit_code, shell_result.output
            );
        }

        let properties = read_properties(&out_file);
        let (hosts, agents) = Self::collect_endpoints(test_plan, &properties);
        if shell_result.success() && hosts.is_empty() {
            warn!("部署脚本 {} 未产出任何主机", script.name);
        }

        Ok(DeploymentCreationResult {
            name: script.name.clone(),
            success: shell_result.success(),
            hosts,
            agents,
            properties,
        })
    }
}

/// 读取 key=value 属性文件
fn read_properties(path: &Path) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    if let Ok(content) = std::fs::read_to_string(path) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                properties.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use testgrid_common::{DeploymentConfig, InfrastructureConfig, ScenarioConfig};

    fn sample_plan(workspace: PathBuf) -> TestPlan {
        TestPlan::new(
            InfrastructureConfig {
                provisioners: vec![],
                parameters: HashMap::new(),
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
            workspace,
        )
    }

    #[test]
    fn test_collect_endpoints() {
        let plan = sample_plan(PathBuf::from("/tmp/ws"));
        let properties = HashMap::from([
            ("host.db".to_string(), "10.0.0.5:3306".to_string()),
            ("host.web".to_string(), "10.0.0.6".to_string()),
            ("agent.web-node".to_string(), "agent-uuid-1".to_string()),
            ("PRODUCT_URL".to_string(), "http://10.0.0.6".to_string()),
        ]);
        let (mut hosts, agents) = ShellDeployer::collect_endpoints(&plan, &properties);
        hosts.sort_by(|a, b| a.label.cmp(&b.label));

        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].label, "db");
        assert_eq!(hosts[0].port, Some(3306));
        assert_eq!(hosts[1].port, None);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].instance_name, "web-node");
        assert_eq!(agents[0].test_plan_id, plan.id);
    }

    #[tokio::test]
    async fn test_deploy_reads_output_properties() {
        let dir = tempfile::tempdir().unwrap();
        let plan = sample_plan(dir.path().to_path_buf());
        std::fs::create_dir_all(plan.data_bucket()).unwrap();

        // 脚本向 $TESTGRID_OUTPUT_PROPS 写出主机信息
        let script_path = dir.path().join("deploy.sh");
        std::fs::write(
            &script_path,
            "echo host.web=127.0.0.1:8080 >> \"$TESTGRID_OUTPUT_PROPS\"\n",
        )
        .unwrap();

        let script = Script {
            name: "deploy-product".to_string(),
            script_type: testgrid_common::ScriptType::Shell,
            phase: Some(testgrid_common::ScriptPhase::Deploy),
            file: script_path.display().to_string(),
            order: 1,
            input_parameters: HashMap::new(),
        };
        let provision = InfrastructureProvisionResult::succeeded("infra");

        let deployer = ShellDeployer::new();
        let result = deployer.deploy(&plan, &script, &provision).await.unwrap();
        assert!(result.success);
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.hosts[0].ip, "127.0.0.1");
        assert_eq!(result.hosts[0].port, Some(8080));
    }

    #[tokio::test]
    async fn test_failed_script_returns_unsuccessful_result() {
        let dir = tempfile::tempdir().unwrap();
        let plan = sample_plan(dir.path().to_path_buf());
        std::fs::create_dir_all(plan.data_bucket()).unwrap();

        let script_path = dir.path().join("deploy.sh");
        std::fs::write(&script_path, "exit 7\n").unwrap();

        let script = Script {
            name: "deploy-product".to_string(),
            script_type: testgrid_common::ScriptType::Shell,
            phase: Some(testgrid_common::ScriptPhase::Deploy),
            file: script_path.display().to_string(),
            order: 1,
            input_parameters: HashMap::new(),
        };
        let provision = InfrastructureProvisionResult::succeeded("infra");

        let deployer = ShellDeployer::new();
        let result = deployer.deploy(&plan, &script, &provision).await.unwrap();
        assert!(!result.success);
        assert!(result.hosts.is_empty());
    }
}
