//! 外部脚本执行器

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::{CommonError, Result};

/// 脚本执行结果
///
/// 非零退出码不是错误，而是结构化结果；原始输出保留用于日志
#[derive(Debug, Clone)]
pub struct ShellResult {
    /// 退出码
    pub exit_code: i32,

    /// 按行拼接的输出（stdout + stderr）
    pub output: String,
}

impl ShellResult {
    /// 是否执行成功（退出码 0）
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Shell 脚本执行器
///
/// 以 `/bin/bash -c` 方式在指定工作目录同步执行命令并捕获输出
pub struct ShellExecutor {
    /// 工作目录
    working_directory: Option<PathBuf>,

    /// 注入的环境变量
    environment: HashMap<String, String>,
}

impl ShellExecutor {
    /// 创建新的执行器
    pub fn new(working_directory: Option<&Path>) -> Self {
        Self {
            working_directory: working_directory.map(|p| p.to_path_buf()),
            environment: HashMap::new(),
        }
    }

    /// 设置脚本输入参数（以环境变量注入）
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// 获取工作目录
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// 执行命令
    ///
    /// 进程启动失败返回 `ScriptExecutionError`；超时杀死子进程并返回
    /// `Timeout`；其余情况均返回结构化的 `ShellResult`
    pub async fn execute(&self, command: &str, timeout: Duration) -> Result<ShellResult> {
        debug!(
            "执行 shell 命令: {} (工作目录: {:?})",
            command, self.working_directory
        );

        let mut cmd = Command::new("/bin/bash");
        cmd.arg("-c").arg(command);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(dir) = &self.working_directory {
            if dir.exists() {
                cmd.current_dir(dir);
            }
        }

        for (key, value) in &self.environment {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| CommonError::ScriptExecutionError(format!("无法启动命令 '{}': {}", command, e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CommonError::ScriptExecutionError("无法获取子进程 stdout".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            CommonError::ScriptExecutionError("无法获取子进程 stderr".to_string())
        })?;

        let stdout_task = tokio::spawn(collect_lines(stdout));
        let stderr_task = tokio::spawn(collect_lines(stderr));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(result) => result.map_err(|e| {
                CommonError::ScriptExecutionError(format!("等待命令 '{}' 失败: {}", command, e))
            })?,
            Err(_) => {
                error!("命令执行超时 ({:?}): {}", timeout, command);
                let _ = child.kill().await;
                return Err(CommonError::Timeout(timeout));
            }
        };

        let stdout_output = stdout_task.await.unwrap_or_default();
        let stderr_output = stderr_task.await.unwrap_or_default();

        let mut output = stdout_output;
        if !stderr_output.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&stderr_output);
        }

        let exit_code = status.code().unwrap_or(-1);
        if exit_code == 0 {
            info!("命令执行成功: {}", command);
        } else {
            error!("命令退出码 {}: {}", exit_code, command);
        }

        Ok(ShellResult { exit_code, output })
    }
}

/// 按行读取流并以系统换行符拼接
async fn collect_lines<R>(reader: R) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        collected.push(line);
    }
    collected.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_success() {
        let executor = ShellExecutor::new(None);
        let result = executor
            .execute("echo hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_error() {
        let executor = ShellExecutor::new(None);
        let result = executor
            .execute("echo broken >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, 3);
        assert!(result.output.contains("broken"));
    }

    #[tokio::test]
    async fn test_environment_injection() {
        let executor = ShellExecutor::new(None).with_environment(HashMap::from([(
            "TG_PARAM".to_string(),
            "value-1".to_string(),
        )]));
        let result = executor
            .execute("echo $TG_PARAM", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.output, "value-1");
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let executor = ShellExecutor::new(None);
        let result = executor
            .execute("sleep 30", Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(CommonError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ShellExecutor::new(Some(dir.path()));
        let result = executor.execute("pwd", Duration::from_secs(5)).await.unwrap();
        assert!(result.output.contains(dir.path().file_name().unwrap().to_str().unwrap()));
    }
}
