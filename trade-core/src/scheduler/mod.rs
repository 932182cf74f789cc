//! 后台清扫调度
//!
//! [`SweepScheduler`] 统一启动与停止订单清扫任务：
//!
//! - 未支付超时取消（释放预占库存）
//! - 已支付订单自动完结
//!
//! 任务被包装以捕获 panic，单个任务崩溃只记日志不拖垮进程；
//! 关闭时发送取消信号并逐个 join，记录每个任务的退出方式。

pub mod sweeper;

pub use sweeper::{OrderSweeper, SweepOutcome};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::orders::OrderService;

/// 已注册的清扫任务
struct SweepTask {
    /// 任务名称（用于日志）
    name: &'static str,
    /// 任务句柄
    handle: JoinHandle<()>,
}

/// 清扫任务调度器
///
/// # 使用示例
///
/// ```ignore
/// let scheduler = SweepScheduler::start(orders.clone(), config.clone());
///
/// // ... 进程运行 ...
///
/// // Graceful shutdown
/// scheduler.shutdown().await;
/// ```
pub struct SweepScheduler {
    /// 已注册的任务列表
    tasks: Vec<SweepTask>,
    /// 全局取消令牌
    shutdown: CancellationToken,
}

impl SweepScheduler {
    /// 启动全部清扫循环
    pub fn start(service: OrderService, config: Config) -> Self {
        let mut scheduler = Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        };

        let unpaid = OrderSweeper::new(
            service.clone(),
            config.clone(),
            scheduler.shutdown.clone(),
        );
        scheduler.spawn("unpaid_sweeper", unpaid.run_unpaid_loop());

        let completion = OrderSweeper::new(service, config, scheduler.shutdown.clone());
        scheduler.spawn("completion_sweeper", completion.run_completion_loop());

        tracing::info!(tasks = scheduler.tasks.len(), "Sweep scheduler started");
        scheduler
    }

    /// 获取取消令牌（用于外部联动 shutdown）
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 注册并启动一个清扫任务
    ///
    /// 任务会被包装以捕获 panic。清扫循环只应在收到取消信号后
    /// 返回，其余情况下的退出都会记录告警。
    fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let wrapped_future = async move {
            let result: Result<(), Box<dyn std::any::Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            match result {
                Ok(()) => {
                    if !token.is_cancelled() {
                        tracing::warn!(task = %name, "Sweep task exited without shutdown signal");
                    }
                }
                Err(panic_info) => {
                    let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(
                        task = %name,
                        panic = %panic_msg,
                        "Sweep task panicked! This is a bug that should be reported."
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, "Registered sweep task");
        self.tasks.push(SweepTask { name, handle });
    }

    /// Graceful shutdown - 取消所有任务并等待完成
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} sweep tasks...", self.tasks.len());

        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => {
                    tracing::debug!(task = %task.name, "Task completed");
                }
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(task = %task.name, "Task cancelled");
                }
                Err(e) => {
                    tracing::error!(task = %task.name, error = ?e, "Task panicked");
                }
            }
        }

        tracing::info!("All sweep tasks stopped");
    }
}
