use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::error::{TradeError, TradeResult};
use crate::db::DbService;
use crate::db::repository::system_state;
use crate::orders::OrderService;
use crate::scheduler::SweepScheduler;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 连接池内部是 Arc，Clone 成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 读/写连接池 |
/// | orders | OrderService | 订单生命周期服务 |
///
/// # 使用示例
///
/// ```ignore
/// let state = ServerState::initialize(&config).await?;
///
/// // 下单
/// let detail = state.orders.place_order(&req).await?;
///
/// // 启动后台清扫
/// let scheduler = state.start_sweepers();
/// ```
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 数据库服务
    pub db: DbService,
    /// 订单服务
    pub orders: OrderService,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`Self::initialize()`] 方法代替
    pub fn new(config: Config, db: DbService, orders: OrderService) -> Self {
        Self { config, db, orders }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database/trade.db)，应用迁移
    /// 3. 系统状态单例行 (订单序号)
    /// 4. 订单服务
    pub async fn initialize(config: &Config) -> TradeResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| TradeError::Database(format!("failed to create work directory: {e}")))?;

        let db_path = config.database_dir().join("trade.db");
        let db = DbService::new(&db_path.to_string_lossy()).await?;

        // 确保订单序号单例行存在
        system_state::get_or_create(&db.write_pool).await?;

        let orders = OrderService::new(db.clone());

        Ok(Self::new(config.clone(), db, orders))
    }

    /// 启动后台清扫任务
    ///
    /// 返回的调度器负责优雅关闭，调用方持有它直到进程退出。
    pub fn start_sweepers(&self) -> SweepScheduler {
        SweepScheduler::start(self.orders.clone(), self.config.clone())
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
