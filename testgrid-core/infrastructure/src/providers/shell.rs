//! Shell 脚本供应器

use async_trait::async_trait;
use tracing::info;

use testgrid_common::{InfrastructureProvisionResult, Script, ScriptType, TestPlan};

use super::{run_provision_command, run_release_command};
use crate::provider::InfrastructureProvider;
use crate::Result;

/// Shell 脚本供应器
///
/// 直接执行 testgrid.yaml 中声明的 shell 脚本
pub struct ShellScriptProvider;

impl ShellScriptProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellScriptProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfrastructureProvider for ShellScriptProvider {
    fn name(&self) -> &str {
        "SHELL"
    }

    fn can_handle(&self, script_type: ScriptType) -> bool {
        script_type == ScriptType::Shell
    }

    async fn init(&self, test_plan: &TestPlan) -> Result<()> {
        // 数据桶目录必须先于脚本执行存在
        std::fs::create_dir_all(test_plan.data_bucket())
            .map_err(testgrid_common::CommonError::IoError)?;
        Ok(())
    }

    async fn provision(
        &self,
        test_plan: &TestPlan,
        script: &Script,
    ) -> Result<InfrastructureProvisionResult> {
        info!("执行供应脚本: {}", script.file);
        let command = format!("bash {}", script.file);
        run_provision_command(test_plan, script, &command).await
    }

    async fn release(&self, test_plan: &TestPlan, script: &Script) -> Result<bool> {
        let command = format!("bash {}", script.file);
        run_release_command(test_plan, script, &command).await
    }
}
