//! TestGrid 持久化层
//!
//! 测试计划/场景/用例的 SQLite 存储

mod connection;
mod error;
mod models;
mod repositories;
mod store;

pub use connection::StorageManager;
pub use error::{Result, StorageError};
pub use models::{TestCaseRecord, TestPlanRecord, TestScenarioRecord};
pub use repositories::{TestCaseRepository, TestPlanRepository, TestScenarioRepository};
pub use store::{MemoryTestPlanStore, SqliteTestPlanStore, TestPlanStore};

use sqlx::SqlitePool;

/// 统一的数据访问层入口
pub struct Storage {
    pool: SqlitePool,
    test_plans: TestPlanRepository,
    scenarios: TestScenarioRepository,
    cases: TestCaseRepository,
}

impl Storage {
    /// 从 StorageManager 创建 Storage
    pub fn from_manager(manager: &StorageManager) -> Self {
        let pool = manager.pool().clone();
        Self {
            pool: pool.clone(),
            test_plans: TestPlanRepository::new(pool.clone()),
            scenarios: TestScenarioRepository::new(pool.clone()),
            cases: TestCaseRepository::new(pool),
        }
    }

    /// 获取测试计划仓储
    pub fn test_plans(&self) -> &TestPlanRepository {
        &self.test_plans
    }

    /// 获取场景仓储
    pub fn scenarios(&self) -> &TestScenarioRepository {
        &self.scenarios
    }

    /// 获取用例仓储
    pub fn cases(&self) -> &TestCaseRepository {
        &self.cases
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
