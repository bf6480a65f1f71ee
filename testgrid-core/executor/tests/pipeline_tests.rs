//! 执行管线集成测试

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use testgrid_common::{
    DeploymentConfig, DeploymentPattern, InfrastructureConfig, InfrastructureProvisionResult,
    Provisioner, ScenarioConfig, ScenarioDef, Script, ScriptPhase, ScriptType, TestEngineType,
    TestPlan,
};
use testgrid_executor::TestPlanExecutor;
use testgrid_storage::{MemoryTestPlanStore, TestPlanStore};

fn shell_script(name: &str, file: &Path, phase: ScriptPhase, order: u32) -> Script {
    Script {
        name: name.to_string(),
        script_type: ScriptType::Shell,
        phase: Some(phase),
        file: file.display().to_string(),
        order,
        input_parameters: HashMap::new(),
    }
}

fn write_script(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// 构建一个完整的测试计划：基础设施 1 台主机、部署成功、
/// 一个 Shell 场景写出 3 通过 1 失败的 JTL
fn full_plan(workspace: &Path) -> TestPlan {
    let create = write_script(
        workspace,
        "create.sh",
        "echo host.web=127.0.0.1:9443 >> \"$TESTGRID_OUTPUT_PROPS\"\n",
    );
    let deploy = write_script(
        workspace,
        "deploy.sh",
        "echo PRODUCT_URL=https://127.0.0.1:9443 >> \"$TESTGRID_OUTPUT_PROPS\"\n",
    );

    // 场景脚本把 JTL 写入场景输出目录
    let scenario_dir = workspace.join("scenarios").join("login");
    std::fs::create_dir_all(&scenario_dir).unwrap();
    let jtl = r#"<testResults version="1.2">
<httpSample lb="open page" s="true"/>
<httpSample lb="login" s="true"/>
<httpSample lb="logout" s="true"/>
<httpSample lb="checkout" s="false"><failureMessage>HTTP 500</failureMessage></httpSample>
</testResults>"#;
    std::fs::write(scenario_dir.join("results.jtl.tpl"), jtl).unwrap();
    std::fs::write(
        scenario_dir.join("run.sh"),
        "cp results.jtl.tpl \"$TESTGRID_SCENARIO_OUTPUT/results.jtl\"\n",
    )
    .unwrap();

    let mut plan = TestPlan::new(
        InfrastructureConfig {
            provisioners: vec![Provisioner {
                name: "local-vms".to_string(),
                scripts: vec![shell_script("create-vms", &create, ScriptPhase::Create, 1)],
            }],
            parameters: HashMap::from([("OS".to_string(), "ubuntu".to_string())]),
        },
        DeploymentConfig {
            patterns: vec![DeploymentPattern {
                name: "single-node".to_string(),
                scripts: vec![shell_script("deploy-product", &deploy, ScriptPhase::Deploy, 1)],
            }],
        },
        ScenarioConfig {
            test_engine: TestEngineType::Shell,
            dir: String::new(),
            output_dir: "out".to_string(),
            scenarios: vec![ScenarioDef {
                name: "login".to_string(),
                file: Some("run.sh".to_string()),
            }],
            scripts: vec![],
            input_parameters: HashMap::new(),
        },
        workspace.to_path_buf(),
    );
    plan.scenario_repository = workspace.join("scenarios");
    plan
}

#[tokio::test]
async fn test_end_to_end_fail_on_single_failed_case() {
    let workspace = tempfile::tempdir().unwrap();
    let plan = full_plan(workspace.path());
    let plan_id = plan.id.clone();

    let store = Arc::new(MemoryTestPlanStore::new());
    let executor = TestPlanExecutor::with_defaults(Arc::clone(&store) as Arc<dyn TestPlanStore>);

    let success = executor.execute(plan).await.unwrap();
    assert!(!success, "存在失败用例时计划不是 SUCCESS");

    // 阶段推进完整
    let transitions = store.plan_transitions.lock().unwrap().clone();
    let phases: Vec<&str> = transitions.iter().map(|(_, _, p)| p.as_str()).collect();
    assert!(phases.contains(&"INFRA_PHASE_SUCCEEDED"));
    assert!(phases.contains(&"DEPLOY_PHASE_SUCCEEDED"));
    assert!(phases.contains(&"TEST_PHASE_SUCCEEDED"));

    // 最终状态为 FAIL（阶段完成但存在失败用例）
    let final_status = transitions
        .iter()
        .rev()
        .find(|(id, _, _)| *id == plan_id)
        .map(|(_, status, _)| status.clone())
        .unwrap();
    assert_eq!(final_status, "FAIL");

    // 恰好一条失败用例，失败信息保留
    let scenarios = store.scenarios.lock().unwrap();
    assert_eq!(scenarios.len(), 1);
    let scenario = &scenarios[0].1;
    assert_eq!(scenario.test_cases.len(), 4);
    let failed: Vec<_> = scenario
        .test_cases
        .iter()
        .filter(|tc| tc.status == testgrid_common::TestCaseStatus::Fail)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "checkout");
    assert_eq!(failed[0].failure_message.as_deref(), Some("HTTP 500"));
}

#[tokio::test]
async fn test_infra_error_halts_pipeline_monotonically() {
    let workspace = tempfile::tempdir().unwrap();
    let mut plan = full_plan(workspace.path());
    let bad_create = write_script(workspace.path(), "create.sh", "exit 2\n");
    plan.infrastructure_config.provisioners[0].scripts =
        vec![shell_script("create-vms", &bad_create, ScriptPhase::Create, 1)];
    let plan_id = plan.id.clone();

    let store = Arc::new(MemoryTestPlanStore::new());
    let executor = TestPlanExecutor::with_defaults(Arc::clone(&store) as Arc<dyn TestPlanStore>);

    let success = executor.execute(plan).await.unwrap();
    assert!(!success);

    let transitions = store.plan_transitions.lock().unwrap().clone();
    let phases: Vec<&str> = transitions.iter().map(|(_, _, p)| p.as_str()).collect();
    assert!(phases.contains(&"INFRA_PHASE_ERROR"));
    // 一旦 INFRA_PHASE_ERROR，不得出现任何 DEPLOY/TEST 的成功或开始标记
    assert!(!phases.iter().any(|p| p.starts_with("DEPLOY_PHASE_S")));
    assert!(!phases.iter().any(|p| p.starts_with("TEST_PHASE")));

    let final_status = transitions
        .iter()
        .rev()
        .find(|(id, _, _)| *id == plan_id)
        .map(|(_, status, _)| status.clone())
        .unwrap();
    assert_eq!(final_status, "ERROR");
}

#[tokio::test]
async fn test_failing_script_short_circuits_remaining_scripts() {
    let workspace = tempfile::tempdir().unwrap();
    let first = write_script(
        workspace.path(),
        "first.sh",
        "echo vpc_id=vpc-1 >> \"$TESTGRID_OUTPUT_PROPS\"; exit 1\n",
    );
    let marker = workspace.path().join("second-ran");
    let second = write_script(
        workspace.path(),
        "second.sh",
        &format!("touch {}\n", marker.display()),
    );

    let mut plan = full_plan(workspace.path());
    plan.infrastructure_config.provisioners[0].scripts = vec![
        shell_script("first", &first, ScriptPhase::Create, 1),
        shell_script("second", &second, ScriptPhase::Create, 2),
    ];

    let store = Arc::new(MemoryTestPlanStore::new());
    let executor = TestPlanExecutor::with_defaults(Arc::clone(&store) as Arc<dyn TestPlanStore>);
    let success = executor.execute(plan).await.unwrap();

    assert!(!success);
    // 快速失败：第二个脚本不得执行
    assert!(!marker.exists(), "失败脚本之后的脚本不应被执行");
}

#[tokio::test]
async fn test_zero_host_deployment_is_deploy_error() {
    let workspace = tempfile::tempdir().unwrap();
    let mut plan = full_plan(workspace.path());
    let create = write_script(
        workspace.path(),
        "create.sh",
        // 供应成功但不声明任何主机
        "echo vpc_id=vpc-1 >> \"$TESTGRID_OUTPUT_PROPS\"\n",
    );
    let deploy = write_script(workspace.path(), "deploy.sh", "true\n");
    plan.infrastructure_config.provisioners[0].scripts =
        vec![shell_script("create-vms", &create, ScriptPhase::Create, 1)];
    plan.deployment_config.patterns[0].scripts =
        vec![shell_script("deploy-product", &deploy, ScriptPhase::Deploy, 1)];

    let store = Arc::new(MemoryTestPlanStore::new());
    let executor = TestPlanExecutor::with_defaults(Arc::clone(&store) as Arc<dyn TestPlanStore>);
    let success = executor.execute(plan).await.unwrap();

    assert!(!success);
    let transitions = store.plan_transitions.lock().unwrap().clone();
    let phases: Vec<&str> = transitions.iter().map(|(_, _, p)| p.as_str()).collect();
    assert!(phases.contains(&"DEPLOY_PHASE_ERROR"), "空部署必须判为部署错误");
    assert!(!phases.contains(&"TEST_PHASE_STARTED"));
}

#[tokio::test]
async fn test_destroy_skipped_without_successful_create() {
    let workspace = tempfile::tempdir().unwrap();
    let marker = workspace.path().join("destroy-ran");
    let destroy = write_script(
        workspace.path(),
        "destroy.sh",
        &format!("touch {}\n", marker.display()),
    );

    let mut plan = full_plan(workspace.path());
    plan.infrastructure_config.provisioners[0].scripts =
        vec![shell_script("destroy-vms", &destroy, ScriptPhase::Destroy, 9)];
    // 没有任何成功 CREATE 的供应结果
    plan.infrastructure_provision_result = Some(InfrastructureProvisionResult::default());

    let store = Arc::new(MemoryTestPlanStore::new());
    let executor = TestPlanExecutor::with_defaults(Arc::clone(&store) as Arc<dyn TestPlanStore>);
    executor.abort(&plan).await;

    assert!(!marker.exists(), "没有成功 CREATE 时 DESTROY 脚本必须整体跳过");

    // 有成功 CREATE 标记后销毁脚本正常执行
    let mut provision = InfrastructureProvisionResult::succeeded("local-vms");
    provision.properties.insert(
        format!("{}create-vms", testgrid_infrastructure::CREATE_SUCCEEDED_PREFIX),
        "true".to_string(),
    );
    plan.infrastructure_provision_result = Some(provision);
    executor.abort(&plan).await;
    assert!(marker.exists());
}
