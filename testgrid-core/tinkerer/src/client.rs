//! Tinkerer 客户端核心实现

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

use testgrid_common::{Agent, TinkererSettings};

use crate::protocol::{OperationRequest, SyncCommandResponse};
use crate::stream::{run_stream_loop, AsyncCommandResponse, StreamState};
use crate::{Result, TinkererError};

/// 流式任务池容量
const STREAM_POOL_CAPACITY: usize = 10;

/// 流式读取最大空闲时间（从流开始计时）
const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(15 * 60);

/// Tinkerer 客户端配置
#[derive(Debug, Clone)]
pub struct TinkererClientConfig {
    /// 连接超时（秒）
    pub connect_timeout: u64,

    /// 同步请求超时（秒）
    pub request_timeout: u64,

    /// 流式读取最大空闲时间
    pub max_idle_time: Duration,

    /// 分段文件落盘目录
    pub stream_dir: PathBuf,
}

impl Default for TinkererClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 300,
            max_idle_time: DEFAULT_MAX_IDLE_TIME,
            stream_dir: std::env::temp_dir().join("testgrid-shell"),
        }
    }
}

/// Tinkerer 远程代理客户端
///
/// 操作句柄保存在本客户端实例内，随客户端生命周期释放
pub struct TinkererClient {
    /// REST 基础路径
    base_path: String,

    /// Basic 认证头
    auth_header: String,

    /// HTTP 客户端
    http_client: Client,

    /// 配置
    config: TinkererClientConfig,

    /// 流式任务池
    stream_pool: Arc<Semaphore>,

    /// 操作 ID -> 流状态
    operations: Arc<RwLock<HashMap<String, Arc<Mutex<StreamState>>>>>,
}

impl TinkererClient {
    /// 创建新的客户端
    pub fn new(settings: &TinkererSettings, config: TinkererClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        let credentials = format!("{}:{}", settings.username, settings.password);
        let auth_header = format!("Basic {}", BASE64.encode(credentials.as_bytes()));

        std::fs::create_dir_all(&config.stream_dir)?;

        Ok(Self {
            base_path: settings.base_path.trim_end_matches('/').to_string(),
            auth_header,
            http_client,
            config,
            stream_pool: Arc::new(Semaphore::new(STREAM_POOL_CAPACITY)),
            operations: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// 代理操作端点
    fn agent_url(&self, test_plan_id: &str, instance_name: &str, path: &str) -> String {
        format!(
            "{}/test-plan/{}/agent/{}/{}",
            self.base_path, test_plan_id, instance_name, path
        )
    }

    /// 同步执行命令
    pub async fn execute_command_sync(
        &self,
        test_plan_id: &str,
        instance_name: &str,
        command: &str,
    ) -> Result<SyncCommandResponse> {
        let operation_id = Uuid::new_v4().to_string();
        let request = OperationRequest::shell(command, &operation_id);

        info!(
            "向 {} 代理 {} 发送同步命令",
            self.base_path, instance_name
        );

        let response = self
            .http_client
            .post(self.agent_url(test_plan_id, instance_name, "operation"))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .timeout(Duration::from_secs(self.config.request_timeout))
            .json(&request)
            .send()
            .await
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        response
            .json::<SyncCommandResponse>()
            .await
            .map_err(|e| TinkererError::ParseError(e.to_string()))
    }

    /// 异步流式执行命令
    ///
    /// 分块响应由受限任务池中的后台任务消费，每个分段写入
    /// `{operationId}_{n}.txt`，部分输出在进程重启后仍可读取
    pub async fn execute_command_async(
        &self,
        test_plan_id: &str,
        instance_name: &str,
        command: &str,
    ) -> Result<AsyncCommandResponse> {
        let operation_id = Uuid::new_v4().to_string();
        let request = OperationRequest::shell(command, &operation_id);

        info!(
            "向 {} 代理 {} 发送流式命令 (操作 {})",
            self.base_path, instance_name, operation_id
        );

        let response = self
            .http_client
            .post(self.agent_url(test_plan_id, instance_name, "stream-operation"))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .json(&request)
            .send()
            .await
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        let state = Arc::new(Mutex::new(StreamState::default()));
        self.operations
            .write()
            .await
            .insert(operation_id.clone(), Arc::clone(&state));

        let permit = Arc::clone(&self.stream_pool)
            .acquire_owned()
            .await
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        let stream = Box::pin(response.bytes_stream());
        let task_state = Arc::clone(&state);
        let task_operation_id = operation_id.clone();
        let stream_dir = self.config.stream_dir.clone();
        let max_idle_time = self.config.max_idle_time;
        tokio::spawn(async move {
            run_stream_loop(stream, task_operation_id, stream_dir, task_state, max_idle_time)
                .await;
            drop(permit);
        });

        Ok(AsyncCommandResponse::new(
            operation_id,
            self.config.stream_dir.clone(),
            state,
            self.config.max_idle_time,
        ))
    }

    /// 中止操作
    ///
    /// 请求转发给远端代理；本地仅停止读取新分段，
    /// 不保证远端进程终止
    pub async fn abort(
        &self,
        test_plan_id: &str,
        instance_name: &str,
        operation_id: &str,
    ) -> Result<u16> {
        let state = self
            .operations
            .read()
            .await
            .get(operation_id)
            .cloned()
            .ok_or_else(|| TinkererError::OperationNotFound(operation_id.to_string()))?;
        state.lock().unwrap().aborted = true;

        let request = OperationRequest::abort(operation_id);
        let response = self
            .http_client
            .post(self.agent_url(test_plan_id, instance_name, "stream-operation"))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .timeout(Duration::from_secs(self.config.request_timeout))
            .json(&request)
            .send()
            .await
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!("中止操作 {} 返回状态 {}", operation_id, status);
        }
        Ok(status)
    }

    /// 查询测试计划的代理列表
    pub async fn agents_by_test_plan(&self, test_plan_id: &str) -> Result<Vec<Agent>> {
        let response = self
            .http_client
            .get(format!("{}/test-plan/{}/agents", self.base_path, test_plan_id))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .timeout(Duration::from_secs(self.config.request_timeout))
            .send()
            .await
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        response
            .json::<Vec<Agent>>()
            .await
            .map_err(|e| TinkererError::ParseError(e.to_string()))
    }

    /// 查询已注册代理的测试计划 ID 列表
    pub async fn test_plan_ids(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/test-plans", self.base_path))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .timeout(Duration::from_secs(self.config.request_timeout))
            .send()
            .await
            .map_err(|e| TinkererError::HttpError(e.to_string()))?;

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| TinkererError::ParseError(e.to_string()))
    }
}
