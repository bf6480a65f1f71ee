//! TestGrid 产品部署层
//!
//! 部署器契约、注册表与 shell 部署器

pub mod deployer;
pub mod registry;
pub mod shell_deployer;

pub use deployer::Deployer;
pub use registry::DeployerRegistry;
pub use shell_deployer::ShellDeployer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("不支持的部署方式: {0}")]
    UnsupportedDeployer(String),

    #[error("部署失败: {0}")]
    DeploymentFailed(String),

    #[error("脚本执行错误: {0}")]
    ScriptError(#[from] testgrid_common::CommonError),
}

pub type Result<T> = std::result::Result<T, DeploymentError>;
