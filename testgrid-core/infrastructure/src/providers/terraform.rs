//! Terraform 供应器

use async_trait::async_trait;
use std::path::Path;

use testgrid_common::{InfrastructureProvisionResult, Script, ScriptType, TestPlan};

use super::{run_provision_command, run_release_command};
use crate::provider::InfrastructureProvider;
use crate::Result;

/// Terraform 供应器
///
/// `file` 字段指向模块目录；输出变量追加到属性文件
pub struct TerraformProvider;

impl TerraformProvider {
    pub fn new() -> Self {
        Self
    }

    fn module_dir(script: &Script) -> String {
        // 允许直接指向 .tf 文件，取其所在目录
        let path = Path::new(&script.file);
        if path.extension().is_some() {
            path.parent()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string())
        } else {
            script.file.clone()
        }
    }
}

impl Default for TerraformProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfrastructureProvider for TerraformProvider {
    fn name(&self) -> &str {
        "TERRAFORM"
    }

    fn can_handle(&self, script_type: ScriptType) -> bool {
        script_type == ScriptType::Terraform
    }

    async fn init(&self, test_plan: &TestPlan) -> Result<()> {
        std::fs::create_dir_all(test_plan.data_bucket())
            .map_err(testgrid_common::CommonError::IoError)?;
        Ok(())
    }

    async fn provision(
        &self,
        test_plan: &TestPlan,
        script: &Script,
    ) -> Result<InfrastructureProvisionResult> {
        let dir = Self::module_dir(script);
        let command = format!(
            "terraform -chdir={} init -input=false && \
             terraform -chdir={} apply -auto-approve -input=false && \
             terraform -chdir={} output | sed 's/ *= */=/' >> \"$TESTGRID_OUTPUT_PROPS\"",
            dir, dir, dir
        );
        run_provision_command(test_plan, script, &command).await
    }

    async fn release(&self, test_plan: &TestPlan, script: &Script) -> Result<bool> {
        let dir = Self::module_dir(script);
        let command = format!(
            "terraform -chdir={} destroy -auto-approve -input=false",
            dir
        );
        run_release_command(test_plan, script, &command).await
    }
}
