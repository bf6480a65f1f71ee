//! 基础设施供应器契约

use async_trait::async_trait;

use testgrid_common::{InfrastructureProvisionResult, Script, ScriptType, TestPlan};

use crate::Result;

/// 基础设施供应器
///
/// 可插拔适配器，负责创建/销毁云端或本地基础设施资源。
/// 供应失败以 `success=false` 的结果返回；只有无法调用底层工具
/// 才作为错误向上传播
#[async_trait]
pub trait InfrastructureProvider: Send + Sync {
    /// 供应器名称
    fn name(&self) -> &str;

    /// 是否能处理指定的脚本技术类型
    fn can_handle(&self, script_type: ScriptType) -> bool;

    /// 供应前的初始化（工作区准备等）
    async fn init(&self, test_plan: &TestPlan) -> Result<()>;

    /// 执行单个脚本完成供应
    async fn provision(
        &self,
        test_plan: &TestPlan,
        script: &Script,
    ) -> Result<InfrastructureProvisionResult>;

    /// 执行销毁脚本释放资源
    async fn release(&self, test_plan: &TestPlan, script: &Script) -> Result<bool>;
}
