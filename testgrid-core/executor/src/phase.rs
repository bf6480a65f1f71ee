//! 阶段公共骨架

use tracing::{error, info};

use testgrid_common::{TestPlan, TestPlanPhase, TestPlanStatus};
use testgrid_infrastructure::{InfrastructureProviderRegistry, CREATE_SUCCEEDED_PREFIX};
use testgrid_storage::TestPlanStore;

use crate::Result;

const LINE_LENGTH: usize = 72;

/// 打印阶段进度横幅
pub(crate) fn print_progress_banner(message: &str, plan: &TestPlan) {
    info!("");
    info!("----------------------{}--------------------------", message);
    info!("测试计划状态: {}", plan.status);
    info!("测试计划阶段: {}", plan.phase);
    info!("---------------------------------------------------------------");
    info!("");
}

/// 打印提示信息
pub(crate) fn print_message(message: &str) {
    info!("");
    info!("{}", "-".repeat(LINE_LENGTH));
    info!("{}", message);
    info!("{}", "-".repeat(LINE_LENGTH));
    info!("");
}

/// 迁移阶段与状态并立即持久化
///
/// 在返回前写入存储，保证进程中途崩溃后留有可审计的阶段标记；
/// 存储不可达是致命错误，不做重试
pub(crate) async fn persist_progress(
    store: &dyn TestPlanStore,
    plan: &mut TestPlan,
    phase: TestPlanPhase,
    status: TestPlanStatus,
) -> Result<()> {
    info!(
        "更新测试计划状态 {} --> {} 阶段 {} --> {}",
        plan.status, status, plan.phase, phase
    );
    plan.set_phase(phase);
    plan.status = status;
    store.persist_test_plan(plan).await?;
    Ok(())
}

/// 仅迁移阶段并持久化
pub(crate) async fn persist_phase(
    store: &dyn TestPlanStore,
    plan: &mut TestPlan,
    phase: TestPlanPhase,
) -> Result<()> {
    info!("更新测试计划阶段 {} --> {}", plan.phase, phase);
    plan.set_phase(phase);
    store.persist_test_plan(plan).await?;
    Ok(())
}

/// 仅更新状态并持久化
pub(crate) async fn persist_status(
    store: &dyn TestPlanStore,
    plan: &mut TestPlan,
    status: TestPlanStatus,
) -> Result<()> {
    info!("更新测试计划状态 {} --> {}", plan.status, status);
    plan.status = status;
    store.persist_test_plan(plan).await?;
    Ok(())
}

/// 释放基础设施
///
/// 执行首个供应器中参与销毁的脚本；供应器从未有成功的 CREATE 时
/// 整体跳过 DESTROY 脚本。调试模式下不释放。释放失败不再向上传播
pub(crate) async fn release_infrastructure(
    registry: &InfrastructureProviderRegistry,
    plan: &TestPlan,
) {
    let provisioner = match plan.infrastructure_config.first_provisioner() {
        Some(provisioner) => provisioner,
        None => return,
    };

    print_message(&format!("\t\t 释放基础设施: {}", provisioner.name));

    if plan.is_debug_mode() {
        print_message("调试模式已开启，不释放基础设施，请手动回收资源");
        return;
    }

    let provision_properties = plan
        .infrastructure_provision_result
        .as_ref()
        .map(|result| result.properties.clone())
        .unwrap_or_default();
    let any_create_succeeded = provision_properties
        .keys()
        .any(|key| key.starts_with(CREATE_SUCCEEDED_PREFIX));

    for script in provisioner.scripts_ordered() {
        if !script.is_destruction() {
            continue;
        }

        // 没有任何成功的 CREATE 时整体跳过 DESTROY；
        // CREATE_AND_DELETE 则要求自身的 CREATE 成功
        let own_marker = format!("{}{}", CREATE_SUCCEEDED_PREFIX, script.name);
        let should_release = match script.phase() {
            testgrid_common::ScriptPhase::CreateAndDelete => {
                provision_properties.contains_key(&own_marker)
            }
            _ => any_create_succeeded,
        };
        if !should_release {
            info!("跳过销毁脚本 {} (没有成功的供应记录)", script.name);
            continue;
        }

        match registry.resolve(script) {
            Ok(provider) => {
                if let Err(e) = provider.release(plan, script).await {
                    error!("销毁脚本 {} 执行失败: {}", script.name, e);
                }
            }
            Err(e) => error!("无法为销毁脚本 {} 解析供应器: {}", script.name, e),
        }
    }
}
