//! CloudFormation 供应器

use async_trait::async_trait;

use testgrid_common::{InfrastructureProvisionResult, Script, ScriptType, TestPlan};

use super::{run_provision_command, run_release_command};
use crate::provider::InfrastructureProvider;
use crate::Result;

/// CloudFormation 供应器
///
/// 通过 aws cli 部署/删除栈；栈名取脚本名加计划 ID 前 8 位，
/// 保证同一模板的并发计划互不冲突
pub struct CloudFormationProvider;

impl CloudFormationProvider {
    pub fn new() -> Self {
        Self
    }

    fn stack_name(test_plan: &TestPlan, script: &Script) -> String {
        let short_id: String = test_plan.id.chars().take(8).collect();
        format!("testgrid-{}-{}", script.name, short_id)
    }
}

impl Default for CloudFormationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfrastructureProvider for CloudFormationProvider {
    fn name(&self) -> &str {
        "CLOUDFORMATION"
    }

    fn can_handle(&self, script_type: ScriptType) -> bool {
        script_type == ScriptType::Cloudformation
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
        let stack_name = Self::stack_name(test_plan, script);
        let command = format!(
            "aws cloudformation deploy --template-file {} --stack-name {} \
             --no-fail-on-empty-changeset && \
             aws cloudformation describe-stacks --stack-name {} \
             --query 'Stacks[0].Outputs[].[OutputKey,OutputValue]' --output text \
             | sed 's/\\t/=/' >> \"$TESTGRID_OUTPUT_PROPS\"",
            script.file, stack_name, stack_name
        );
        run_provision_command(test_plan, script, &command).await
    }

    async fn release(&self, test_plan: &TestPlan, script: &Script) -> Result<bool> {
        let stack_name = Self::stack_name(test_plan, script);
        let command = format!(
            "aws cloudformation delete-stack --stack-name {} && \
             aws cloudformation wait stack-delete-complete --stack-name {}",
            stack_name, stack_name
        );
        run_release_command(test_plan, script, &command).await
    }
}
