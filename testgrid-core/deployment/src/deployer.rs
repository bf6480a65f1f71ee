//! 部署器契约

use async_trait::async_trait;

use testgrid_common::{
    DeploymentCreationResult, InfrastructureProvisionResult, Script, TestPlan,
};

use crate::Result;

/// 部署器
///
/// 在已供应的基础设施上部署产品；部署失败以 `success=false`
/// 的结果返回，不越过阶段边界抛错
#[async_trait]
pub trait Deployer: Send + Sync {
    /// 部署器名称
    fn name(&self) -> &str;

    /// 是否能处理指定脚本
    fn can_handle(&self, script: &Script) -> bool;

    /// 执行部署脚本
    async fn deploy(
        &self,
        test_plan: &TestPlan,
        script: &Script,
        provision_result: &InfrastructureProvisionResult,
    ) -> Result<DeploymentCreationResult>;
}
