//! TestGrid 测试自动化层
//!
//! 测试引擎执行器与结果解析器

pub mod executor;
pub mod parser;

pub use executor::{
    scenario_location, scenario_output_dir, JMeterExecutor, ShellTestExecutor, TestExecutor,
    TestExecutorFactory, TestNgExecutor,
};
pub use parser::{
    FunctionalTestResultParser, PerformanceTestCsvParser, ResultParser, ResultParserRegistry,
    TestNgResultsParser,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("不支持的测试引擎: {0}")]
    UnsupportedEngine(String),

    #[error("测试执行失败: {0}")]
    ExecutionFailed(String),

    #[error("结果解析失败: {0}")]
    ParseError(String),

    #[error("结果归档失败: {0}")]
    ArchiveError(String),

    #[error("脚本执行错误: {0}")]
    ScriptError(#[from] testgrid_common::CommonError),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AutomationError>;
