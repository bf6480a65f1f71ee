//! 流式操作的分段处理

use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::protocol::OperationSegment;
use crate::{Result, TinkererError};

/// 分段文件轮询间隔
const SEGMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 流式操作的共享状态
///
/// 流式任务与调用方之间只同步完成标志与分段计数
#[derive(Debug, Default)]
pub(crate) struct StreamState {
    /// 是否已结束（正常完成、超时或中止）
    pub completed: bool,

    /// 退出值；超时/中止时为非零标记值
    pub exit_value: i32,

    /// 已落盘的分段数
    pub segment_count: u32,

    /// 是否收到本地中止请求
    pub aborted: bool,
}

/// 异步命令响应
///
/// 调用方通过该句柄轮询完成状态并读取已落盘的分段输出；
/// 分段文件在进程重启后仍然可用
pub struct AsyncCommandResponse {
    operation_id: String,
    stream_dir: PathBuf,
    state: Arc<Mutex<StreamState>>,
    poll_timeout: Duration,
}

impl AsyncCommandResponse {
    pub(crate) fn new(
        operation_id: String,
        stream_dir: PathBuf,
        state: Arc<Mutex<StreamState>>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            operation_id,
            stream_dir,
            state,
            poll_timeout,
        }
    }

    /// 操作 ID
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// 操作是否结束
    pub fn is_completed(&self) -> bool {
        self.state.lock().unwrap().completed
    }

    /// 退出值
    pub fn exit_value(&self) -> i32 {
        self.state.lock().unwrap().exit_value
    }

    /// 已落盘分段数
    pub fn segment_count(&self) -> u32 {
        self.state.lock().unwrap().segment_count
    }

    /// 读取全部分段输出
    ///
    /// 尚未刷盘的分段以 100ms 间隔轮询等待；超过轮询上限
    /// 视为瞬态 IO 故障升级
    pub async fn read_output(&self) -> Result<String> {
        // 等待流结束
        let wait_completed = async {
            loop {
                if self.is_completed() {
                    break;
                }
                tokio::time::sleep(SEGMENT_POLL_INTERVAL).await;
            }
        };
        timeout(self.poll_timeout, wait_completed)
            .await
            .map_err(|_| TinkererError::SegmentPollTimeout(self.operation_id.clone()))?;

        let count = self.segment_count();
        let mut output = String::new();
        for index in 0..count {
            let path = segment_file(&self.stream_dir, &self.operation_id, index);
            let content = self.poll_read(&path).await?;
            output.push_str(&content);
        }
        Ok(output)
    }

    /// 轮询读取单个分段文件
    async fn poll_read(&self, path: &Path) -> Result<String> {
        let read_loop = async {
            loop {
                match tokio::fs::read_to_string(path).await {
                    Ok(content) => return content,
                    Err(_) => tokio::time::sleep(SEGMENT_POLL_INTERVAL).await,
                }
            }
        };
        timeout(self.poll_timeout, read_loop)
            .await
            .map_err(|_| TinkererError::SegmentPollTimeout(path.display().to_string()))
    }
}

/// 分段文件路径: {operationId}_{n}.txt
pub(crate) fn segment_file(stream_dir: &Path, operation_id: &str, index: u32) -> PathBuf {
    stream_dir.join(format!("{}_{}.txt", operation_id, index))
}

/// 消费分块响应流，把每个 JSON 分段写入编号文件
///
/// 最大空闲时间从流开始计时（与远端代理协议保持一致）；
/// 超时后放弃流并以非零退出值标记失败，绝不无限挂起
pub(crate) async fn run_stream_loop<S, B, E>(
    mut stream: S,
    operation_id: String,
    stream_dir: PathBuf,
    state: Arc<Mutex<StreamState>>,
    max_idle_time: Duration,
) where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let consume = async {
        let mut line_buffer: Vec<u8> = Vec::new();
        let mut last_exit_value = 0i32;

        while let Some(chunk) = stream.next().await {
            if state.lock().unwrap().aborted {
                info!("操作 {} 已被本地中止，停止读取新分段", operation_id);
                return (last_exit_value, false);
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("操作 {} 流读取错误: {}", operation_id, e);
                    return (-1, false);
                }
            };
            line_buffer.extend_from_slice(chunk.as_ref());

            // 分块边界与行边界不对齐，按换行符切分
            while let Some(position) = line_buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = line_buffer.drain(..=position).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<OperationSegment>(line) {
                    Ok(segment) => {
                        if let Err(e) =
                            write_segment(&stream_dir, &operation_id, &state, &segment).await
                        {
                            error!("操作 {} 分段写入失败: {}", operation_id, e);
                        }
                        if segment.completed {
                            return (segment.exit_value, true);
                        }
                        last_exit_value = segment.exit_value;
                    }
                    Err(e) => warn!("操作 {} 忽略非法分段: {}", operation_id, e),
                }
            }
        }
        // 流在最终段之前断开
        (last_exit_value, false)
    };

    let (exit_value, finished) = match timeout(max_idle_time, consume).await {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(
                "操作 {} 流式读取超过最大空闲时间 ({:?})，放弃该流",
                operation_id, max_idle_time
            );
            (-1, false)
        }
    };

    let mut guard = state.lock().unwrap();
    guard.completed = true;
    if finished {
        guard.exit_value = exit_value;
        info!(
            "操作 {} 流式执行完成，退出值 {}",
            operation_id, exit_value
        );
    } else {
        // 超时/中止/中途断流一律标记为失败
        guard.exit_value = -1;
        debug!("操作 {} 以失败标记结束", operation_id);
    }
}

/// 把分段内容写入编号文件并递增计数
async fn write_segment(
    stream_dir: &Path,
    operation_id: &str,
    state: &Arc<Mutex<StreamState>>,
    segment: &OperationSegment,
) -> Result<()> {
    let index = {
        let guard = state.lock().unwrap();
        guard.segment_count
    };
    let path = segment_file(stream_dir, operation_id, index);
    tokio::fs::write(&path, &segment.response).await?;
    state.lock().unwrap().segment_count += 1;
    debug!("写入分段 {}", path.display());
    Ok(())
}
