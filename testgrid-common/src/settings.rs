//! 进程级运行设置
//!
//! **数据存储方式**: TOML 文件 (~/.testgrid/config.toml)
//!
//! 启动时加载一次，此后只读；所有组件通过构造参数接收引用，
//! 不使用全局可变单例

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::{CommonError, Result};

/// TestGrid 运行设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestGridSettings {
    /// TestGrid 主目录（流式输出、工作区默认位置）
    #[serde(default = "default_home")]
    pub testgrid_home: PathBuf,

    /// Tinkerer 远程代理服务配置
    #[serde(default)]
    pub tinkerer: Option<TinkererSettings>,
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".testgrid")
}

/// Tinkerer 服务连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TinkererSettings {
    /// REST 基础路径
    pub base_path: String,

    /// Basic 认证用户名
    pub username: String,

    /// Basic 认证密码
    pub password: String,
}

impl Default for TestGridSettings {
    fn default() -> Self {
        Self {
            testgrid_home: default_home(),
            tinkerer: None,
        }
    }
}

impl TestGridSettings {
    /// 获取配置文件路径
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CommonError::ConfigError("无法获取用户主目录".to_string()))?;
        Ok(home.join(".testgrid").join("config.toml"))
    }

    /// 加载设置
    ///
    /// 配置文件不存在时返回默认值；环境变量 `TESTGRID_HOME` 覆盖主目录
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)
                .map_err(|e| CommonError::ConfigError(format!("设置文件解析失败: {}", e)))?
        } else {
            debug!("设置文件不存在，使用默认设置: {}", path.display());
            Self::default()
        };

        if let Ok(home) = std::env::var("TESTGRID_HOME") {
            let expanded = shellexpand::tilde(&home);
            settings.testgrid_home = PathBuf::from(expanded.as_ref());
        }

        Ok(settings)
    }

    /// 流式输出的落盘目录
    pub fn shell_stream_dir(&self) -> PathBuf {
        self.testgrid_home.join("shell")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TestGridSettings::default();
        assert!(settings.testgrid_home.ends_with(".testgrid"));
        assert!(settings.tinkerer.is_none());
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = TestGridSettings {
            testgrid_home: PathBuf::from("/opt/testgrid"),
            tinkerer: Some(TinkererSettings {
                base_path: "https://tinkerer.example.com/api/".to_string(),
                username: "admin".to_string(),
                password: "secret".to_string(),
            }),
        };
        let text = toml::to_string(&settings).unwrap();
        let parsed: TestGridSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.testgrid_home, PathBuf::from("/opt/testgrid"));
        assert_eq!(parsed.tinkerer.unwrap().username, "admin");
    }
}
