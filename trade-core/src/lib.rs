//! Trade Core - 订单生命周期与库存预占引擎
//!
//! # 架构概述
//!
//! 本模块是交易核心的主入口，提供以下核心功能：
//!
//! - **库存台账** (`inventory`): 预占/释放/消耗的守卫更新与审计流水
//! - **订单服务** (`orders`): 下单、支付、取消、发货的事务编排
//! - **促销解析** (`promotion`): 满减/百分比规则的命中与折扣计算
//! - **后台清扫** (`scheduler`): 未支付超时取消、已支付自动完结
//! - **数据库** (`db`): SQLite WAL 读写分离连接池与仓储层
//!
//! # 模块结构
//!
//! ```text
//! trade-core/src/
//! ├── core/          # 配置、状态、错误
//! ├── db/            # 连接池、迁移、仓储
//! ├── inventory/     # 库存台账
//! ├── orders/        # 订单服务、金额计算
//! ├── promotion/     # 促销规则解析
//! ├── scheduler/     # 后台清扫调度
//! └── utils/         # 日志、校验
//! ```

pub mod core;
pub mod db;
pub mod inventory;
pub mod orders;
pub mod promotion;
pub mod scheduler;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, ServerState, TradeError, TradeResult};
pub use db::DbService;
pub use orders::OrderService;
pub use scheduler::{OrderSweeper, SweepOutcome, SweepScheduler};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置进程环境 (dotenv, 日志)
///
/// 在 main 最开始调用一次。`.env` 不存在时静默跳过；
/// `LOG_DIR` 指定时日志同时写入按天滚动的文件。
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)?;
    }
    utils::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  ______ ____  ___    ____  ______
 /_  __// __ \/   |  / __ \/ ____/
  / /  / /_/ / /| | / / / / __/
 / /  / _, _/ ___ |/ /_/ / /___
/_/  /_/ |_/_/  |_/_____/_____/
   ______ ____  ____  ______
  / ____// __ \/ __ \/ ____/
 / /    / / / / /_/ / __/
/ /___ / /_/ / _, _/ /___
\____/ \____/_/ |_/_____/
    "#
    );
}
