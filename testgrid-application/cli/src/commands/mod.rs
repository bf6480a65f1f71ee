//! CLI 子命令实现

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;

use testgrid_common::{TestGridConfig, TestGridSettings, TestPlan};
use testgrid_executor::TestPlanExecutor;
use testgrid_storage::{
    MemoryTestPlanStore, SqliteTestPlanStore, Storage, StorageManager, TestPlanStore,
};
use testgrid_tinkerer::{TinkererClient, TinkererClientConfig};

/// 执行测试计划
pub async fn run_testplan(yaml: &str, workspace: &str, db: Option<&str>) -> Result<()> {
    let yaml_path = expand(yaml);
    let workspace_path = expand(workspace);

    let config = TestGridConfig::load(&yaml_path)
        .with_context(|| format!("加载配置失败: {}", yaml_path.display()))?;

    let mut plan = TestPlan::new(
        config.infrastructure_config,
        config.deployment_config,
        config.scenario_config,
        workspace_path,
    );
    plan.job_properties = config.job_properties;

    info!("创建测试计划 {}", plan.id);

    let store: Arc<dyn TestPlanStore> = match db {
        Some(db_path) => {
            let manager = StorageManager::new(db_path).await?;
            Arc::new(SqliteTestPlanStore::new(Storage::from_manager(&manager)))
        }
        None => Arc::new(MemoryTestPlanStore::new()),
    };

    let executor = TestPlanExecutor::with_defaults(store);
    let success = executor.execute(plan).await?;

    if success {
        println!("{}", "测试计划执行成功".green());
        Ok(())
    } else {
        println!("{}", "测试计划未通过，详见日志摘要".red());
        bail!("测试计划未通过")
    }
}

/// 查询测试计划的 Tinkerer 代理列表
pub async fn list_agents(test_plan_id: &str) -> Result<()> {
    let settings = TestGridSettings::load()?;
    let tinkerer = settings
        .tinkerer
        .as_ref()
        .context("设置文件未配置 Tinkerer 服务")?;

    let client = TinkererClient::new(
        tinkerer,
        TinkererClientConfig {
            stream_dir: settings.shell_stream_dir(),
            ..Default::default()
        },
    )?;

    let agents = client.agents_by_test_plan(test_plan_id).await?;
    if agents.is_empty() {
        println!("测试计划 {} 没有已注册的代理", test_plan_id);
        return Ok(());
    }

    println!("{}", format!("代理列表 ({}):", agents.len()).bold());
    for agent in agents {
        println!(
            "  {} 实例 {} ({})",
            agent.agent_id.cyan(),
            agent.instance_name,
            agent.instance_id
        );
    }
    Ok(())
}

/// 展开 ~ 与相对路径
fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    Path::new(expanded.as_ref()).to_path_buf()
}
