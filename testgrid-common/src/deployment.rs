//! 部署与供应结果模型

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 已供应环境中的一台主机
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// 主机标签
    pub label: String,

    /// IP 地址
    pub ip: String,

    /// 端口（可选）
    #[serde(default)]
    pub port: Option<u16>,
}

/// 注册到 Tinkerer 的远程代理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// 代理 ID
    #[serde(rename = "agentId")]
    pub agent_id: String,

    /// 实例名称
    #[serde(rename = "instanceName")]
    pub instance_name: String,

    /// 实例 ID
    #[serde(rename = "instanceId", default)]
    pub instance_id: String,

    /// 所属测试计划 ID
    #[serde(rename = "testPlanId", default)]
    pub test_plan_id: String,
}

/// 基础设施供应结果
///
/// 同一供应器内多个脚本的结果按属性并集合并，任一失败则整体失败，
/// 但合并继续进行以保留诊断信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfrastructureProvisionResult {
    /// 供应器名称
    pub name: String,

    /// 脚本输出属性
    pub properties: HashMap<String, String>,

    /// 是否成功
    pub success: bool,
}

impl InfrastructureProvisionResult {
    /// 创建成功的空结果
    pub fn succeeded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: HashMap::new(),
            success: true,
        }
    }

    /// 合并单个脚本的结果
    pub fn merge(&mut self, other: InfrastructureProvisionResult) {
        self.properties.extend(other.properties);
        if !other.success {
            self.success = false;
        }
    }
}

/// 部署创建结果 - 一组可达的主机/代理
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentCreationResult {
    /// 部署模式名称
    pub name: String,

    /// 是否成功
    pub success: bool,

    /// 主机列表
    pub hosts: Vec<Host>,

    /// 远程代理列表
    pub agents: Vec<Agent>,

    /// 部署输出属性
    pub properties: HashMap<String, String>,
}

impl DeploymentCreationResult {
    /// 合并单个脚本的结果
    pub fn merge(&mut self, other: DeploymentCreationResult) {
        self.properties.extend(other.properties);
        self.hosts.extend(other.hosts);
        self.agents.extend(other.agents);
        if !other.success {
            self.success = false;
        }
    }
}
