//! TestGrid 测试计划执行管线
//!
//! 基础设施 -> 部署 -> 测试 三阶段状态机、场景执行与运行摘要

mod deploy_phase;
mod infra_phase;
mod phase;
mod scenario_executor;
mod test_phase;
mod test_plan_executor;

pub use deploy_phase::DeployPhase;
pub use infra_phase::InfraPhase;
pub use scenario_executor::ScenarioExecutor;
pub use test_phase::TestPhase;
pub use test_plan_executor::TestPlanExecutor;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("持久化失败: {0}")]
    PersistenceError(#[from] testgrid_storage::StorageError),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
