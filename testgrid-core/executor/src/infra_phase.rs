//! 基础设施供应阶段

use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, error};

use testgrid_common::{
    InfrastructureProvisionResult, ScriptPhase, TestPlan, TestPlanPhase, TestPlanStatus,
};
use testgrid_infrastructure::InfrastructureProviderRegistry;
use testgrid_storage::TestPlanStore;

use crate::phase::{persist_phase, persist_progress, print_message, print_progress_banner};
use crate::Result;

/// 基础设施阶段
pub struct InfraPhase {
    registry: Arc<InfrastructureProviderRegistry>,
    store: Arc<dyn TestPlanStore>,
}

impl InfraPhase {
    pub fn new(
        registry: Arc<InfrastructureProviderRegistry>,
        store: Arc<dyn TestPlanStore>,
    ) -> Self {
        Self { registry, store }
    }

    /// 执行基础设施阶段
    ///
    /// 失败的阶段记录状态后仍返回测试计划，绝不越过阶段边界抛错
    pub async fn execute(&self, mut plan: TestPlan) -> Result<TestPlan> {
        print_progress_banner("开始基础设施阶段", &plan);

        if !self.verify_precondition(&plan) {
            error!("测试计划 {} 前置条件不满足，不启动基础设施阶段", plan.id);
            persist_progress(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::InfraPhaseError,
                TestPlanStatus::Error,
            )
            .await?;
            return Ok(plan);
        }

        persist_phase(self.store.as_ref(), &mut plan, TestPlanPhase::InfraPhaseStarted).await?;

        let result = self.provision_infrastructure(&mut plan).await?;
        let success = result.success;
        plan.infrastructure_provision_result = Some(result);

        if success {
            persist_phase(
                self.store.as_ref(),
                &mut plan,
                TestPlanPhase::InfraPhaseSucceeded,
            )
            .await?;
        }
        Ok(plan)
    }

    fn verify_precondition(&self, plan: &TestPlan) -> bool {
        plan.phase == TestPlanPhase::ExecutionPlanned && plan.status == TestPlanStatus::Running
    }

    /// 按序执行供应脚本并合并结果
    async fn provision_infrastructure(
        &self,
        plan: &mut TestPlan,
    ) -> Result<InfrastructureProvisionResult> {
        let provisioner = match plan.infrastructure_config.first_provisioner() {
            Some(provisioner) => provisioner.clone(),
            None => {
                error!("测试计划 {} 缺少基础设施供应器定义", plan.id);
                persist_progress(
                    self.store.as_ref(),
                    plan,
                    TestPlanPhase::InfraPhaseError,
                    TestPlanStatus::Error,
                )
                .await?;
                return Ok(InfrastructureProvisionResult::default());
            }
        };

        print_message(&format!("\t\t 供应基础设施: {}", provisioner.name));

        self.persist_infra_inputs(plan);

        let mut merged = InfrastructureProvisionResult::succeeded(&provisioner.name);

        for script in provisioner.scripts_ordered() {
            if script.phase() == ScriptPhase::Destroy {
                continue;
            }

            let provider = match self.registry.resolve(script) {
                Ok(provider) => provider,
                Err(e) => {
                    // 无法解析供应器属于配置错误
                    error!("测试计划 {} 无可用供应器: {}", plan.id, e);
                    merged.success = false;
                    persist_progress(
                        self.store.as_ref(),
                        plan,
                        TestPlanPhase::InfraPhaseError,
                        TestPlanStatus::Error,
                    )
                    .await?;
                    return Ok(merged);
                }
            };

            if let Err(e) = provider.init(plan).await {
                error!("供应器 {} 初始化失败: {}", provider.name(), e);
                merged.success = false;
                break;
            }

            match provider.provision(plan, script).await {
                Ok(result) => {
                    let failed = !result.success;
                    merged.merge(result);
                    if failed {
                        // 快速失败：后续脚本不再执行，已产出的属性保留
                        error!("脚本 {} 供应失败，跳过后续脚本", script.name);
                        break;
                    }
                }
                Err(e) => {
                    error!("脚本 {} 执行出错: {}", script.name, e);
                    merged.success = false;
                    break;
                }
            }
        }

        if !merged.success {
            persist_progress(
                self.store.as_ref(),
                plan,
                TestPlanPhase::InfraPhaseError,
                TestPlanStatus::Error,
            )
            .await?;
        }

        debug!("基础设施供应结果: success={}", merged.success);
        Ok(merged)
    }

    /// 把作业属性与基础设施参数写入数据桶属性文件，供脚本读取
    fn persist_infra_inputs(&self, plan: &TestPlan) {
        let location = plan.data_bucket().join("testplan.properties");
        if let Err(e) = std::fs::create_dir_all(plan.data_bucket()) {
            error!("无法创建数据桶目录: {}", e);
            return;
        }

        let mut content = String::new();
        for (key, value) in &plan.job_properties {
            let _ = writeln!(content, "{}={}", key, value);
        }
        for (key, value) in &plan.infra_parameters {
            let _ = writeln!(content, "{}={}", key, value);
        }
        if let Err(e) = std::fs::write(&location, content) {
            error!("无法写入 {}: {}", location.display(), e);
        }
    }
}
