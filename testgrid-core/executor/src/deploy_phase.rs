//! 部署创建阶段

use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, error};

use testgrid_common::{
    Agent, DeploymentCreationResult, Host, ScriptPhase, TestPlan, TestPlanPhase, TestPlanStatus,
};
use testgrid_deployment::DeployerRegistry;
use testgrid_infrastructure::InfrastructureProviderRegistry;
use testgrid_storage::TestPlanStore;

use crate::phase::{
    persist_phase, persist_progress, print_message, print_progress_banner, release_infrastructure,
};
use crate::Result;

/// 部署阶段
pub struct DeployPhase {
    deployer_registry: Arc<DeployerRegistry>,
    infra_registry: Arc<InfrastructureProviderRegistry>,
    store: Arc<dyn TestPlanStore>,
}

impl DeployPhase {
    pub fn new(
        deployer_registry: Arc<DeployerRegistry>,
        infra_registry: Arc<InfrastructureProviderRegistry>,
        store: Arc<dyn TestPlanStore>,
    ) -> Self {
        Self {
            deployer_registry,
            infra_registry,
            store,
        }
    }

    /// 执行部署阶段
    pub async fn execute(&self, mut plan: TestPlan) -> Result<TestPlan> {
        print_progress_banner("开始部署阶段", &plan);

        if plan.phase == TestPlanPhase::InfraPhaseSucceeded
            && plan.status == TestPlanStatus::Running
        {
            persist_phase(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::DeployPhaseStarted,
            )
            .await?;
        } else {
            error!(
                "测试计划 {} 的基础设施阶段未成功，不启动后续阶段",
                plan.id
            );
            persist_progress(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::InfraPhaseError,
                TestPlanStatus::Error,
            )
            .await?;
            return Ok(plan);
        }

        let result = self.create_deployment(&plan).await;
        let success = result.success && !result.hosts.is_empty();
        if result.success && result.hosts.is_empty() {
            // 基础设施成功但没有任何主机：空部署视为部署错误
            error!("测试计划 {} 部署未产出任何主机", plan.id);
        }
        plan.deployment_creation_result = Some(result);

        if success {
            persist_phase(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::DeployPhaseSucceeded,
            )
            .await?;
            self.persist_deployment_outputs(&plan);
        } else {
            persist_progress(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::DeployPhaseError,
                TestPlanStatus::Error,
            )
            .await?;
            error!(
                "测试计划 {} 部署失败，开始释放基础设施",
                plan.id
            );
            release_infrastructure(&self.infra_registry, &plan).await;
        }

        Ok(plan)
    }

    /// 在已供应的基础设施上按序执行部署脚本
    async fn create_deployment(&self, plan: &TestPlan) -> DeploymentCreationResult {
        let provision_result = match &plan.infrastructure_provision_result {
            Some(result) if result.success => result.clone(),
            _ => {
                debug!("供应结果缺失或失败，部署直接判失败");
                return DeploymentCreationResult::default();
            }
        };

        let pattern = match plan.deployment_config.first_pattern() {
            Some(pattern) => pattern.clone(),
            None => {
                error!("测试计划 {} 缺少部署模式定义", plan.id);
                return DeploymentCreationResult::default();
            }
        };

        let mut merged = DeploymentCreationResult {
            name: pattern.name.clone(),
            success: true,
            ..Default::default()
        };

        // 基础设施输出里声明的主机/代理同样计入部署结果
        let (hosts, agents) = endpoints_from_properties(plan, &provision_result.properties);
        merged.hosts = hosts;
        merged.agents = agents;

        for script in pattern.scripts_ordered() {
            if script.phase() != ScriptPhase::Deploy {
                continue;
            }
            print_message(&format!("\t\t 创建部署: {}", script.name));

            let deployer = match self.deployer_registry.resolve(script) {
                Ok(deployer) => deployer,
                Err(e) => {
                    error!("无法为脚本 {} 解析部署器: {}", script.name, e);
                    merged.success = false;
                    break;
                }
            };

            match deployer.deploy(plan, script, &provision_result).await {
                Ok(result) => {
                    let failed = !result.success;
                    merged.merge(result);
                    if failed {
                        // 快速失败：后续部署脚本不再执行
                        error!("部署脚本 {} 失败，跳过后续脚本", script.name);
                        break;
                    }
                }
                Err(e) => {
                    error!("部署脚本 {} 执行出错: {}", script.name, e);
                    merged.success = false;
                    break;
                }
            }
            debug!("部署结果: success={}", merged.success);
        }

        merged
    }

    /// 部署成功后把计划 ID 与场景输入参数追加到部署输出属性
    fn persist_deployment_outputs(&self, plan: &TestPlan) {
        let location = plan
            .data_bucket()
            .join(testgrid_deployment::shell_deployer::DEPLOYMENT_OUT_FILE);

        let mut content = String::new();
        let _ = writeln!(content, "TEST_PLAN_ID={}", plan.id);
        for (key, value) in &plan.scenario_config.input_parameters {
            let _ = writeln!(content, "{}={}", key, value);
        }

        use std::io::Write as _;
        let appended = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&location)
            .and_then(|mut file| file.write_all(content.as_bytes()));
        if let Err(e) = appended {
            error!("无法写入部署输出 {}: {}", location.display(), e);
        }
    }
}

/// 从属性集中提取 host./agent. 前缀的端点声明
fn endpoints_from_properties(
    plan: &TestPlan,
    properties: &std::collections::HashMap<String, String>,
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
                test_plan_id: plan.id.clone(),
            });
        }
    }
    (hosts, agents)
}
