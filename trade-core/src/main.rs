use trade_core::{Config, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment()?;

    // 打印横幅
    print_banner();

    tracing::info!("Trade core starting...");

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 初始化服务状态 (工作目录、数据库迁移、订单服务)
    let state = ServerState::initialize(&config).await?;

    // 4. 启动后台清扫任务
    let scheduler = state.start_sweepers();

    tracing::info!(
        work_dir = %state.work_dir().display(),
        environment = %state.config.environment,
        "Trade core ready"
    );

    // 等待退出信号，优雅关闭
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    scheduler.shutdown().await;

    Ok(())
}
