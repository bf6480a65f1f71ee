//! Storage 模块集成测试

use std::collections::HashMap;
use std::path::PathBuf;

use testgrid_common::{
    DeploymentConfig, InfrastructureConfig, ScenarioConfig, TestCase, TestCaseStatus, TestPlan,
    TestPlanPhase, TestScenario,
};
use testgrid_storage::{SqliteTestPlanStore, Storage, StorageManager, TestPlanStore};

fn sample_plan() -> TestPlan {
    TestPlan::new(
        InfrastructureConfig {
            provisioners: vec![],
            parameters: HashMap::from([("OS".to_string(), "ubuntu".to_string())]),
        },
        DeploymentConfig { patterns: vec![] },
        ScenarioConfig {
            test_engine: Default::default(),
            dir: "scenarios".to_string(),
            output_dir: "out".to_string(),
            scenarios: vec![],
            scripts: vec![],
            input_parameters: HashMap::new(),
        },
        PathBuf::from("/tmp/tg-it"),
    )
}

#[tokio::test]
async fn test_persist_and_reload_test_plan() {
    let manager = StorageManager::new_in_memory().await.unwrap();
    let storage = Storage::from_manager(&manager);
    let plan_repo_pool = storage.pool().clone();
    let store = SqliteTestPlanStore::new(storage);

    let mut plan = sample_plan();
    store.persist_test_plan(&plan).await.unwrap();

    // 阶段边界再次写入
    plan.set_phase(TestPlanPhase::InfraPhaseStarted);
    store.persist_test_plan(&plan).await.unwrap();

    let repo = testgrid_storage::TestPlanRepository::new(plan_repo_pool);
    let loaded = repo.get_by_id(&plan.id).await.unwrap().unwrap();
    assert_eq!(loaded.phase, "INFRA_PHASE_STARTED");
    assert_eq!(loaded.status, "RUNNING");
    assert!(loaded.infra_parameters.unwrap().contains("ubuntu"));
}

#[tokio::test]
async fn test_persist_scenario_with_cases() {
    let manager = StorageManager::new_in_memory().await.unwrap();
    let storage = Storage::from_manager(&manager);
    let pool = storage.pool().clone();
    let store = SqliteTestPlanStore::new(storage);

    let plan = sample_plan();
    store.persist_test_plan(&plan).await.unwrap();

    let mut scenario = TestScenario::new("login-flow", "scenarios", "out");
    scenario.add_test_case(TestCase::new("tc-ok", TestCaseStatus::Success, None));
    scenario.add_test_case(TestCase::new(
        "tc-bad",
        TestCaseStatus::Fail,
        Some("状态码 500".to_string()),
    ));
    store.persist_test_scenario(&plan.id, &scenario).await.unwrap();

    let scenarios = testgrid_storage::TestScenarioRepository::new(pool.clone())
        .list_by_plan(&plan.id)
        .await
        .unwrap();
    assert_eq!(scenarios.len(), 1);

    let cases = testgrid_storage::TestCaseRepository::new(pool)
        .list_by_scenario(scenarios[0].id)
        .await
        .unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[1].status, "FAIL");
    assert_eq!(cases[1].failure_message.as_deref(), Some("状态码 500"));
}

#[tokio::test]
async fn test_reparse_appends_new_rows() {
    let manager = StorageManager::new_in_memory().await.unwrap();
    let storage = Storage::from_manager(&manager);
    let pool = storage.pool().clone();
    let store = SqliteTestPlanStore::new(storage);

    let plan = sample_plan();
    store.persist_test_plan(&plan).await.unwrap();

    let mut scenario = TestScenario::new("repeat", "scenarios", "out");
    scenario.add_test_case(TestCase::new("tc", TestCaseStatus::Success, None));

    // 同一结果文件重复解析 -> 新行而非合并
    store.persist_test_scenario(&plan.id, &scenario).await.unwrap();
    store.persist_test_scenario(&plan.id, &scenario).await.unwrap();

    let scenarios = testgrid_storage::TestScenarioRepository::new(pool)
        .list_by_plan(&plan.id)
        .await
        .unwrap();
    assert_eq!(scenarios.len(), 2);
}
