//! TestGrid 公共库
//!
//! 测试计划数据模型、配置模型与脚本执行工具

pub mod config;
pub mod deployment;
pub mod settings;
pub mod shell;
pub mod status;
pub mod test_plan;

pub use config::{
    DeploymentConfig, DeploymentPattern, InfrastructureConfig, Provisioner, ScenarioConfig,
    ScenarioDef, Script, ScriptPhase, ScriptType, TestEngineType, TestGridConfig,
};
pub use deployment::{Agent, DeploymentCreationResult, Host, InfrastructureProvisionResult};
pub use settings::{TestGridSettings, TinkererSettings};
pub use shell::{ShellExecutor, ShellResult};
pub use status::{ScenarioStatus, TestCaseStatus, TestPlanPhase, TestPlanStatus};
pub use test_plan::{TestCase, TestPlan, TestScenario};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("脚本启动失败: {0}")]
    ScriptExecutionError(String),

    #[error("脚本执行超时 ({0:?})")]
    Timeout(std::time::Duration),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerdeError(String),
}

pub type Result<T> = std::result::Result<T, CommonError>;
