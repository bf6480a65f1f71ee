//! Kubernetes 供应器

use async_trait::async_trait;

use testgrid_common::{InfrastructureProvisionResult, Script, ScriptType, TestPlan};

use super::{run_provision_command, run_release_command};
use crate::provider::InfrastructureProvider;
use crate::Result;

/// Kubernetes 供应器
///
/// 以 kubectl 应用/删除清单；命名空间取自脚本参数 `namespace`，
/// 缺省 default
pub struct KubernetesProvider;

impl KubernetesProvider {
    pub fn new() -> Self {
        Self
    }

    fn namespace(script: &Script) -> &str {
        script
            .input_parameters
            .get("namespace")
            .map(String::as_str)
            .unwrap_or("default")
    }
}

impl Default for KubernetesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfrastructureProvider for KubernetesProvider {
    fn name(&self) -> &str {
        "KUBERNETES"
    }

    fn can_handle(&self, script_type: ScriptType) -> bool {
        script_type == ScriptType::Kubernetes
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
        let command = format!(
            "kubectl apply -f {} -n {}",
            script.file,
            Self::namespace(script)
        );
        run_provision_command(test_plan, script, &command).await
    }

    async fn release(&self, test_plan: &TestPlan, script: &Script) -> Result<bool> {
        let command = format!(
            "kubectl delete -f {} -n {} --ignore-not-found=true",
            script.file,
            Self::namespace(script)
        );
        run_release_command(test_plan, script, &command).await
    }
}
