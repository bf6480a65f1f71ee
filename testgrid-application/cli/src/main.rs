//! TestGrid CLI 应用

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "testgrid")]
#[command(about = "TestGrid - 多云测试编排平台", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行测试计划
    RunTestplan {
        /// testgrid.yaml 配置文件路径
        #[arg(long, default_value = "testgrid.yaml")]
        yaml: String,

        /// 运行工作区目录
        #[arg(long, default_value = ".")]
        workspace: String,

        /// SQLite 数据库路径（缺省使用内存库）
        #[arg(long)]
        db: Option<String>,
    },

    /// 查询测试计划的 Tinkerer 代理
    Agents {
        /// 测试计划 ID
        #[arg(long)]
        test_plan: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::RunTestplan {
            yaml,
            workspace,
            db,
        } => commands::run_testplan(&yaml, &workspace, db.as_deref()).await,
        Commands::Agents { test_plan } => commands::list_agents(&test_plan).await,
    }
}
