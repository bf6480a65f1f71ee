//! 存储层错误定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库连接失败: {0}")]
    ConnectionError(String),

    #[error("数据库迁移失败: {0}")]
    MigrationError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("记录不存在: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
