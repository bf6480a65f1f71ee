//! 测试计划状态定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 测试计划总体状态
///
/// 状态由最后执行的阶段结果推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestPlanStatus {
    /// 执行中
    Running,

    /// 全部场景通过
    Success,

    /// 阶段完成但存在失败用例
    Fail,

    /// 阶段本身出错，场景未能运行
    Error,
}

impl fmt::Display for TestPlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TestPlanStatus::Running => "RUNNING",
            TestPlanStatus::Success => "SUCCESS",
            TestPlanStatus::Fail => "FAIL",
            TestPlanStatus::Error => "ERROR",
        };
        write!(f, "{}", value)
    }
}

/// 测试计划阶段
///
/// 阶段迁移单调递增，不允许回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestPlanPhase {
    /// 执行已规划
    ExecutionPlanned,

    /// 基础设施阶段开始
    InfraPhaseStarted,
    /// 基础设施阶段成功
    InfraPhaseSucceeded,
    /// 基础设施阶段出错
    InfraPhaseError,

    /// 部署阶段开始
    DeployPhaseStarted,
    /// 部署阶段成功
    DeployPhaseSucceeded,
    /// 部署阶段出错
    DeployPhaseError,

    /// 测试阶段开始
    TestPhaseStarted,
    /// 测试阶段成功
    TestPhaseSucceeded,
    /// 测试阶段出错
    TestPhaseError,
    /// 测试阶段未完整执行
    TestPhaseIncomplete,
}

impl TestPlanPhase {
    /// 阶段序号，用于单调性校验
    ///
    /// 同一阶段的 Succeeded/Error/Incomplete 属于同级终态
    pub fn rank(&self) -> u8 {
        match self {
            TestPlanPhase::ExecutionPlanned => 0,
            TestPlanPhase::InfraPhaseStarted => 1,
            TestPlanPhase::InfraPhaseSucceeded | TestPlanPhase::InfraPhaseError => 2,
            TestPlanPhase::DeployPhaseStarted => 3,
            TestPlanPhase::DeployPhaseSucceeded | TestPlanPhase::DeployPhaseError => 4,
            TestPlanPhase::TestPhaseStarted => 5,
            TestPlanPhase::TestPhaseSucceeded
            | TestPlanPhase::TestPhaseError
            | TestPlanPhase::TestPhaseIncomplete => 6,
        }
    }

    /// 检查能否迁移到目标阶段
    ///
    /// 出错终态只允许原地重写，不允许进入后续阶段
    pub fn can_transition_to(&self, next: TestPlanPhase) -> bool {
        if self.is_error() {
            return next == *self;
        }
        next.rank() >= self.rank()
    }

    /// 是否为出错终态
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TestPlanPhase::InfraPhaseError
                | TestPlanPhase::DeployPhaseError
                | TestPlanPhase::TestPhaseError
                | TestPlanPhase::TestPhaseIncomplete
        )
    }
}

impl fmt::Display for TestPlanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TestPlanPhase::ExecutionPlanned => "EXECUTION_PLANNED",
            TestPlanPhase::InfraPhaseStarted => "INFRA_PHASE_STARTED",
            TestPlanPhase::InfraPhaseSucceeded => "INFRA_PHASE_SUCCEEDED",
            TestPlanPhase::InfraPhaseError => "INFRA_PHASE_ERROR",
            TestPlanPhase::DeployPhaseStarted => "DEPLOY_PHASE_STARTED",
            TestPlanPhase::DeployPhaseSucceeded => "DEPLOY_PHASE_SUCCEEDED",
            TestPlanPhase::DeployPhaseError => "DEPLOY_PHASE_ERROR",
            TestPlanPhase::TestPhaseStarted => "TEST_PHASE_STARTED",
            TestPlanPhase::TestPhaseSucceeded => "TEST_PHASE_SUCCEEDED",
            TestPlanPhase::TestPhaseError => "TEST_PHASE_ERROR",
            TestPlanPhase::TestPhaseIncomplete => "TEST_PHASE_INCOMPLETE",
        };
        write!(f, "{}", value)
    }
}

/// 测试场景执行状态
///
/// Running -> Completed/Error 只发生一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStatus {
    /// 已规划
    Planned,
    /// 执行中
    Running,
    /// 执行完成（与用例成败无关）
    Completed,
    /// 引擎异常
    Error,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ScenarioStatus::Planned => "PLANNED",
            ScenarioStatus::Running => "RUNNING",
            ScenarioStatus::Completed => "COMPLETED",
            ScenarioStatus::Error => "ERROR",
        };
        write!(f, "{}", value)
    }
}

/// 测试用例结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestCaseStatus {
    /// 通过
    Success,
    /// 失败
    Fail,
    /// 跳过
    Skip,
}

impl fmt::Display for TestCaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TestCaseStatus::Success => "SUCCESS",
            TestCaseStatus::Fail => "FAIL",
            TestCaseStatus::Skip => "SKIP",
        };
        write!(f, "{}", value)
    }
}
