//! 订单清扫器
//!
//! 两条独立的后台清扫线：
//! - 未支付超时：逾期未付的待支付订单自动取消，释放预占库存
//! - 自动完结：已支付且长期无后续操作的订单批量标记完成
//!
//! 两条清扫都以状态守卫条件做前提，重复执行无副作用。
//! interval 的首次 tick 立即触发，停机期间积压的逾期订单
//! 在进程启动后的第一轮就会被补扫。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::error::{TradeError, TradeResult};
use crate::orders::OrderService;
use shared::request::Actor;

// ============================================================================
// SweepOutcome
// ============================================================================

/// 单轮未支付清扫的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// 扫描到的逾期订单数
    pub scanned: usize,
    /// 成功取消的订单数
    pub cancelled: usize,
    /// 状态守卫未命中而跳过的订单数（扫描后被用户支付或取消）
    pub skipped: usize,
    /// 取消失败的订单数（数据库错误等，留到下一轮重试）
    pub failed: usize,
}

impl SweepOutcome {
    /// 本轮是否有值得记录的动作
    pub fn is_noteworthy(&self) -> bool {
        self.cancelled > 0 || self.failed > 0
    }
}

// ============================================================================
// OrderSweeper
// ============================================================================

/// 订单后台清扫器
///
/// 由 [`SweepScheduler`](crate::scheduler::SweepScheduler) 启动，
/// 每条清扫线各持有一个实例独立循环。
pub struct OrderSweeper {
    service: OrderService,
    config: Config,
    shutdown: CancellationToken,
}

impl OrderSweeper {
    pub fn new(service: OrderService, config: Config, shutdown: CancellationToken) -> Self {
        Self {
            service,
            config,
            shutdown,
        }
    }

    // ========================================================================
    // Unpaid Sweep
    // ========================================================================

    /// 未支付超时清扫循环
    pub async fn run_unpaid_loop(self) {
        tracing::info!(
            interval_secs = self.config.unpaid_sweep_interval_secs,
            timeout_minutes = self.config.payment_timeout_minutes,
            "Unpaid order sweeper started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.unpaid_sweep_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_unpaid_sweep().await {
                        Ok(outcome) if outcome.is_noteworthy() => {
                            tracing::info!(
                                scanned = outcome.scanned,
                                cancelled = outcome.cancelled,
                                skipped = outcome.skipped,
                                failed = outcome.failed,
                                "Unpaid sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Unpaid sweep failed");
                        }
                    }
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Unpaid order sweeper stopped");
                    return;
                }
            }
        }
    }

    /// 执行一轮未支付超时清扫
    ///
    /// 逐单取消，每单一个独立事务，单个失败不影响其余订单。
    /// 取消守卫保证与用户的并发支付/取消安全竞争：守卫未命中
    /// 按 skipped 计，不算错误。
    pub async fn run_unpaid_sweep(&self) -> TradeResult<SweepOutcome> {
        let cutoff = shared::util::now_millis() - self.config.payment_timeout_millis();
        let expired = self.service.expired_unpaid(cutoff).await?;

        let mut outcome = SweepOutcome {
            scanned: expired.len(),
            ..Default::default()
        };

        for order_id in expired {
            if self.shutdown.is_cancelled() {
                tracing::info!("Unpaid sweep interrupted by shutdown");
                break;
            }

            match self.service.cancel(order_id, &Actor::System).await {
                Ok(order) => {
                    outcome.cancelled += 1;
                    tracing::info!(
                        order_id,
                        order_no = %order.order_no,
                        "Expired unpaid order auto-cancelled"
                    );
                }
                Err(TradeError::InvalidStateTransition { .. }) => {
                    // 扫描和取消之间被用户支付或取消了，属正常竞争
                    outcome.skipped += 1;
                    tracing::debug!(order_id, "Order state changed before sweep, skipping");
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(order_id, error = %e, "Failed to auto-cancel expired order");
                }
            }
        }

        Ok(outcome)
    }

    // ========================================================================
    // Completion Sweep
    // ========================================================================

    /// 自动完结清扫循环
    pub async fn run_completion_loop(self) {
        tracing::info!(
            interval_secs = self.config.completion_sweep_interval_secs,
            timeout_hours = self.config.completion_timeout_hours,
            "Completion sweeper started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.completion_sweep_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_completion_sweep().await {
                        tracing::error!(error = %e, "Completion sweep failed");
                    }
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Completion sweeper stopped");
                    return;
                }
            }
        }
    }

    /// 执行一轮自动完结清扫
    ///
    /// 单条批量 UPDATE，只改订单状态，无库存副作用。
    pub async fn run_completion_sweep(&self) -> TradeResult<u64> {
        let cutoff = shared::util::now_millis() - self.config.completion_timeout_millis();
        self.service.complete_overdue(cutoff).await
    }
}
