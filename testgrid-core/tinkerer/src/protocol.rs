//! Tinkerer 协议模型

use serde::{Deserialize, Serialize};

/// 操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationCode {
    /// 执行 shell 命令
    Shell,
    /// 中止进行中的操作
    Abort,
}

/// 操作请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    /// 操作码
    pub code: OperationCode,

    /// 命令内容（ABORT 时为空）
    pub request: String,

    /// 操作 ID
    #[serde(rename = "operationId")]
    pub operation_id: String,
}

impl OperationRequest {
    /// 构建 shell 执行请求
    pub fn shell(command: &str, operation_id: &str) -> Self {
        Self {
            code: OperationCode::Shell,
            request: command.to_string(),
            operation_id: operation_id.to_string(),
        }
    }

    /// 构建中止请求
    pub fn abort(operation_id: &str) -> Self {
        Self {
            code: OperationCode::Abort,
            request: String::new(),
            operation_id: operation_id.to_string(),
        }
    }
}

/// 流式响应的单个分段
///
/// 分块 HTTP 响应中每行一个 JSON 分段；completed=true 的分段
/// 携带最终退出值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationSegment {
    /// 操作 ID
    #[serde(rename = "operationId", default)]
    pub operation_id: String,

    /// 本段输出内容
    #[serde(default)]
    pub response: String,

    /// 退出值（仅最终段有效）
    #[serde(rename = "exitValue", default)]
    pub exit_value: i32,

    /// 是否为最终段
    #[serde(default)]
    pub completed: bool,
}

/// 同步命令响应
#[derive(Debug, Clone, Deserialize)]
pub struct SyncCommandResponse {
    /// 命令输出
    #[serde(default)]
    pub response: String,

    /// 退出值
    #[serde(rename = "exitValue", default)]
    pub exit_value: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_request_json_shape() {
        let request = OperationRequest::shell("ls /var/log", "op-1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["code"], "SHELL");
        assert_eq!(json["request"], "ls /var/log");
        assert_eq!(json["operationId"], "op-1");

        let abort = OperationRequest::abort("op-1");
        let json = serde_json::to_value(&abort).unwrap();
        assert_eq!(json["code"], "ABORT");
    }

    #[test]
    fn test_segment_deserialization() {
        let segment: OperationSegment = serde_json::from_str(
            r#"{"operationId":"op-9","response":"line\n","exitValue":0,"completed":false}"#,
        )
        .unwrap();
        assert_eq!(segment.operation_id, "op-9");
        assert!(!segment.completed);

        // 最终段
        let fin: OperationSegment =
            serde_json::from_str(r#"{"operationId":"op-9","completed":true,"exitValue":3}"#)
                .unwrap();
        assert!(fin.completed);
        assert_eq!(fin.exit_value, 3);
    }

    #[test]
    fn test_sync_response_deserialization() {
        let response: SyncCommandResponse =
            serde_json::from_str(r#"{"response":"done","exitValue":0}"#).unwrap();
        assert_eq!(response.response, "done");
        assert_eq!(response.exit_value, 0);
    }
}
