//! 脚本类供应器实现

mod cloudformation;
mod kubernetes;
mod shell;
mod terraform;

pub use cloudformation::CloudFormationProvider;
pub use kubernetes::KubernetesProvider;
pub use shell::ShellScriptProvider;
pub use terraform::TerraformProvider;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use testgrid_common::{InfrastructureProvisionResult, Script, ShellExecutor, TestPlan};

use crate::Result;

/// 脚本默认超时
const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 3600;

/// 脚本输出属性文件名
pub(crate) const INFRA_OUT_FILE: &str = "infra-output.properties";

/// 标记某脚本 CREATE 成功的属性键前缀
///
/// release 阶段据此跳过没有成功 CREATE 的 DESTROY 脚本
pub const CREATE_SUCCEEDED_PREFIX: &str = "testgrid.create.succeeded.";

/// 解析脚本超时时间
pub(crate) fn script_timeout(script: &Script) -> Duration {
    script
        .input_parameters
        .get("timeout")
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_SCRIPT_TIMEOUT_SECS))
}

/// 构建脚本的环境变量：作业属性 + 基础设施参数 + 脚本输入参数
pub(crate) fn script_environment(test_plan: &TestPlan, script: &Script) -> HashMap<String, String> {
    let mut environment = test_plan.job_properties.clone();
    environment.extend(test_plan.infra_parameters.clone());
    environment.extend(script.input_parameters.clone());
    environment.insert(
        "TESTGRID_OUTPUT_PROPS".to_string(),
        test_plan
            .data_bucket()
            .join(INFRA_OUT_FILE)
            .display()
            .to_string(),
    );
    environment.insert("TEST_PLAN_ID".to_string(), test_plan.id.clone());
    environment
}

/// 执行供应命令并收集输出属性
pub(crate) async fn run_provision_command(
    test_plan: &TestPlan,
    script: &Script,
    command: &str,
) -> Result<InfrastructureProvisionResult> {
    info!("--- 执行脚本: {}, 文件: {}", script.name, script.file);

    let executor = ShellExecutor::new(Some(&test_plan.workspace))
        .with_environment(script_environment(test_plan, script));
    let shell_result = executor.execute(command, script_timeout(script)).await?;

    let mut result = InfrastructureProvisionResult {
        name: script.name.clone(),
        properties: read_output_properties(&test_plan.data_bucket().join(INFRA_OUT_FILE)),
        success: shell_result.success(),
    };

    if shell_result.success() {
        result.properties.insert(
            format!("{}{}", CREATE_SUCCEEDED_PREFIX, script.name),
            "true".to_string(),
        );
    } else {
        error!(
            "脚本 {} 退出码 {}，输出:\n{}",
            script.name, shell_result.exit_code, shell_result.output
        );
    }

    Ok(result)
}

/// 执行销毁命令
pub(crate) async fn run_release_command(
    test_plan: &TestPlan,
    script: &Script,
    command: &str,
) -> Result<bool> {
    info!("--- 释放基础设施: {}", script.name);

    let executor = ShellExecutor::new(Some(&test_plan.workspace))
        .with_environment(script_environment(test_plan, script));
    let shell_result = executor.execute(command, script_timeout(script)).await?;

    if !shell_result.success() {
        error!(
            "销毁脚本 {} 退出码 {}，输出:\n{}",
            script.name, shell_result.exit_code, shell_result.output
        );
    }
    Ok(shell_result.success())
}

/// 读取脚本写出的 key=value 属性文件
pub(crate) fn read_output_properties(path: &Path) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            // 脚本可以不产出属性文件
            return properties;
        }
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                properties.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => warn!("忽略格式非法的属性行: {}", line),
        }
    }
    properties
}
