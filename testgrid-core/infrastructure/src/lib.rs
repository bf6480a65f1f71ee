//! TestGrid 基础设施供应层
//!
//! 供应器契约、注册表与脚本类供应器实现

pub mod provider;
pub mod providers;
pub mod registry;

pub use provider::InfrastructureProvider;
pub use providers::{
    CloudFormationProvider, KubernetesProvider, ShellScriptProvider, TerraformProvider,
    CREATE_SUCCEEDED_PREFIX,
};
pub use registry::InfrastructureProviderRegistry;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("不支持的供应技术: {0}")]
    UnsupportedProvider(String),

    #[error("供应器初始化失败: {0}")]
    ProviderInitFailed(String),

    #[error("基础设施操作失败: {0}")]
    InfrastructureFailed(String),

    #[error("脚本执行错误: {0}")]
    ScriptError(#[from] testgrid_common::CommonError),
}

pub type Result<T> = std::result::Result<T, InfrastructureError>;
