//! TestGrid Tinkerer 远程代理客户端
//!
//! 通过 Tinkerer REST 服务在已供应主机上执行 shell 命令：
//! 同步调用、分块流式调用（分段落盘）、中止与代理查询

mod client;
mod protocol;
mod stream;

pub use client::{TinkererClient, TinkererClientConfig};
pub use protocol::{OperationCode, OperationRequest, OperationSegment, SyncCommandResponse};
pub use stream::AsyncCommandResponse;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TinkererError {
    #[error("Tinkerer 配置缺失: {0}")]
    ConfigError(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(String),

    #[error("响应解析失败: {0}")]
    ParseError(String),

    #[error("操作不存在: {0}")]
    OperationNotFound(String),

    #[error("流式读取超过最大空闲时间")]
    StreamIdleTimeout,

    #[error("等待输出分段超时: {0}")]
    SegmentPollTimeout(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TinkererError>;
