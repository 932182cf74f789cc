use std::path::PathBuf;

/// 交易核心配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/trade | 工作目录（数据库、日志） |
/// | PAYMENT_TIMEOUT_MINUTES | 10 | 未支付订单超时时长(分钟) |
/// | UNPAID_SWEEP_INTERVAL_SECS | 60 | 未支付订单清理周期(秒) |
/// | COMPLETION_TIMEOUT_HOURS | 12 | 已发货订单自动完结时长(小时) |
/// | COMPLETION_SWEEP_INTERVAL_SECS | 300 | 自动完结扫描周期(秒) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/trade PAYMENT_TIMEOUT_MINUTES=15 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库与日志文件
    pub work_dir: String,
    /// 未支付订单保留时长（分钟），超过即被清理任务取消
    pub payment_timeout_minutes: i64,
    /// 未支付清理任务的执行周期（秒）
    pub unpaid_sweep_interval_secs: u64,
    /// 已支付订单无后续操作多久后自动完结（小时）
    pub completion_timeout_hours: i64,
    /// 自动完结任务的执行周期（秒）
    pub completion_sweep_interval_secs: u64,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/trade".into()),
            payment_timeout_minutes: std::env::var("PAYMENT_TIMEOUT_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            unpaid_sweep_interval_secs: std::env::var("UNPAID_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            completion_timeout_hours: std::env::var("COMPLETION_TIMEOUT_HOURS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(12),
            completion_sweep_interval_secs: std::env::var("COMPLETION_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 未支付超时时长（毫秒）
    pub fn payment_timeout_millis(&self) -> i64 {
        self.payment_timeout_minutes * 60 * 1000
    }

    /// 自动完结时长（毫秒）
    pub fn completion_timeout_millis(&self) -> i64 {
        self.completion_timeout_hours * 60 * 60 * 1000
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
