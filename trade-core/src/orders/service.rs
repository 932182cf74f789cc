//! Order Service
//!
//! 订单生命周期的编排层。所有带库存副作用的迁移（下单预占、
//! 支付消耗、取消释放）在单个写事务内完成，订单行的守卫 UPDATE
//! 是迁移的线性化点。

use crate::core::error::{TradeError, TradeResult};
use crate::db::DbService;
use crate::db::repository::{order as order_repo, promotion as promotion_repo, system_state};
use crate::inventory::ledger;
use crate::orders::money;
use crate::promotion::resolver;
use crate::utils::validation::{MAX_REMARK_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_required_text};
use rust_decimal::Decimal;
use shared::models::{Order, OrderDetail, OrderItem, OrderStatus, PaymentStatus};
use shared::request::{Actor, OrderLine, PlaceOrderRequest};
use std::collections::HashSet;

/// 写事务遇到 SQLITE_BUSY 时的最大尝试次数
const MAX_RETRY_COUNT: u32 = 3;
/// 重试基础退避（指数增长：50ms, 100ms, 200ms）
const RETRY_BASE_DELAY_MS: u64 = 50;

#[derive(Clone)]
pub struct OrderService {
    db: DbService,
}

impl OrderService {
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    // ==================== 下单 ====================

    /// 创建订单并预占全部行的库存
    ///
    /// 多行要么全部预占成功，要么整单失败。瞬时写锁冲突自动重试，
    /// 库存不足不重试（再试也不会多出货来）。
    pub async fn place_order(&self, req: &PlaceOrderRequest) -> TradeResult<OrderDetail> {
        let lines = validate_place_request(req)?;

        // 促销规则在事务外取快照，命中计算是纯函数
        let now = shared::util::now_millis();
        let rules = promotion_repo::find_active(&self.db.read_pool, now).await?;

        let mut attempt: u32 = 0;
        loop {
            match self.try_place(req, &lines, &rules).await {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_RETRY_COUNT => {
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        delay_ms = delay,
                        error = %e,
                        "Place order hit storage contention, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
                other => return other,
            }
        }
    }

    async fn try_place(
        &self,
        req: &PlaceOrderRequest,
        lines: &[OrderLine],
        rules: &[shared::models::PromotionRule],
    ) -> TradeResult<OrderDetail> {
        let now = shared::util::now_millis();
        let actor = Actor::User { id: req.user_id };

        let mut tx = self.db.write_pool.begin().await?;

        let seq = system_state::next_order_seq(&mut tx).await?;
        let order_id = shared::util::snowflake_id();
        let order_no = format!("ORD{}{}", shared::util::date_stamp(), 100_000 + seq);

        // 逐行预占。任何一行失败整个事务回滚，已预占的行一并回退。
        let mut subtotal = Decimal::ZERO;
        let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
        for line in lines {
            let sku =
                ledger::reserve(&mut tx, line.sku_id, line.quantity, order_id, &order_no, &actor)
                    .await?;
            let unit_price = sku.selling_price();
            let line_total = money::line_total(unit_price, line.quantity);
            subtotal += line_total;
            items.push(OrderItem {
                id: shared::util::snowflake_id(),
                order_id,
                sku_id: line.sku_id,
                sku_name: sku.name,
                quantity: line.quantity,
                unit_price,
                line_total: money::to_f64(line_total),
                created_at: now,
            });
        }

        let subtotal_f = money::to_f64(subtotal);
        let (promotion_id, discount) = match resolver::resolve(subtotal_f, rules, now) {
            Some((rule, amount)) => (Some(rule.id), amount),
            None => (None, Decimal::ZERO),
        };
        let pay_amount = (subtotal - discount).max(Decimal::ZERO);

        let order = Order {
            id: order_id,
            order_no,
            user_id: req.user_id,
            address_id: req.address_id,
            subtotal: subtotal_f,
            promotion_id,
            discount_amount: money::to_f64(discount),
            pay_amount: money::to_f64(pay_amount),
            status: OrderStatus::PendingPayment,
            payment_status: PaymentStatus::Unpaid,
            payment_ref: None,
            tracking_no: None,
            remark: req.remark.clone(),
            pay_time: None,
            created_at: now,
            updated_at: now,
        };
        order_repo::insert_order(&mut tx, &order).await?;
        for item in &items {
            order_repo::insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_no = %order.order_no,
            user_id = order.user_id,
            lines = items.len(),
            subtotal = order.subtotal,
            discount = order.discount_amount,
            pay_amount = order.pay_amount,
            "Order placed"
        );
        Ok(OrderDetail { order, items })
    }

    // ==================== 支付 ====================

    /// 确认支付：订单转入待发货，预占库存转为永久扣减
    pub async fn mark_paid(&self, order_id: i64, payment_ref: &str) -> TradeResult<Order> {
        validate_required_text(payment_ref, "payment_ref", MAX_SHORT_TEXT_LEN)
            .map_err(TradeError::Validation)?;

        let now = shared::util::now_millis();
        let mut tx = self.db.write_pool.begin().await?;

        let order = order_repo::find_by_id_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("order {order_id}")))?;

        let rows = order_repo::mark_paid_guarded(&mut tx, order_id, payment_ref, now).await?;
        if rows == 0 {
            return Err(TradeError::InvalidStateTransition {
                order_id,
                status: order.status,
                payment_status: order.payment_status,
                action: "confirm payment",
            });
        }

        let actor = Actor::User { id: order.user_id };
        let items = order_repo::items_for_order_tx(&mut tx, order_id).await?;
        for item in &items {
            ledger::consume(
                &mut tx,
                item.sku_id,
                item.quantity,
                order_id,
                &order.order_no,
                &actor,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_no = %order.order_no,
            pay_amount = order.pay_amount,
            payment_ref,
            "Order paid, stock consumed"
        );
        self.reload(order_id).await
    }

    // ==================== 取消 ====================

    /// 取消订单并释放全部预占
    ///
    /// 用户取消与超时清理走同一条路径，守卫 UPDATE 保证
    /// 两者竞争同一订单时只有一方成立。
    pub async fn cancel(&self, order_id: i64, actor: &Actor) -> TradeResult<Order> {
        let now = shared::util::now_millis();
        let mut tx = self.db.write_pool.begin().await?;

        let order = order_repo::find_by_id_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("order {order_id}")))?;

        let rows = order_repo::cancel_guarded(&mut tx, order_id, now).await?;
        if rows == 0 {
            return Err(TradeError::InvalidStateTransition {
                order_id,
                status: order.status,
                payment_status: order.payment_status,
                action: "cancel",
            });
        }

        let remark = match actor {
            Actor::System => format!("auto-cancel: payment timeout for order {}", order.order_no),
            _ => format!("cancel order {}", order.order_no),
        };
        let items = order_repo::items_for_order_tx(&mut tx, order_id).await?;
        for item in &items {
            ledger::release(&mut tx, item.sku_id, item.quantity, order_id, actor, &remark).await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_no = %order.order_no,
            actor = %actor,
            released_lines = items.len(),
            "Order cancelled, reservations released"
        );
        self.reload(order_id).await
    }

    // ==================== 发货 ====================

    /// 发货：已付款的待发货订单记录运单号并转入已发货
    pub async fn ship(&self, order_id: i64, tracking_no: &str) -> TradeResult<Order> {
        validate_required_text(tracking_no, "tracking_no", MAX_SHORT_TEXT_LEN)
            .map_err(TradeError::Validation)?;

        let now = shared::util::now_millis();
        let rows =
            order_repo::ship_guarded(&self.db.write_pool, order_id, tracking_no, now).await?;
        if rows == 0 {
            let order = order_repo::find_by_id(&self.db.read_pool, order_id)
                .await?
                .ok_or_else(|| TradeError::NotFound(format!("order {order_id}")))?;
            return Err(TradeError::InvalidStateTransition {
                order_id,
                status: order.status,
                payment_status: order.payment_status,
                action: "ship",
            });
        }

        tracing::info!(order_id, tracking_no, "Order shipped");
        self.reload(order_id).await
    }

    // ==================== 查询 ====================

    pub async fn detail(&self, order_id: i64) -> TradeResult<OrderDetail> {
        let order = order_repo::find_by_id(&self.db.read_pool, order_id)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("order {order_id}")))?;
        let items = order_repo::items_for_order(&self.db.read_pool, order_id).await?;
        Ok(OrderDetail { order, items })
    }

    pub async fn find_by_order_no(&self, order_no: &str) -> TradeResult<Option<Order>> {
        Ok(order_repo::find_by_order_no(&self.db.read_pool, order_no).await?)
    }

    pub async fn orders_for_user(&self, user_id: i64) -> TradeResult<Vec<Order>> {
        Ok(order_repo::find_by_user(&self.db.read_pool, user_id).await?)
    }

    async fn reload(&self, order_id: i64) -> TradeResult<Order> {
        order_repo::find_by_id(&self.db.read_pool, order_id)
            .await?
            .ok_or_else(|| TradeError::Database(format!("order {order_id} vanished after update")))
    }

    // ==================== 清理原语（供调度器组合） ====================

    /// 创建时间早于 cutoff 且仍未支付的订单 ID
    pub async fn expired_unpaid(&self, cutoff_ms: i64) -> TradeResult<Vec<i64>> {
        Ok(order_repo::expired_unpaid_ids(&self.db.read_pool, cutoff_ms).await?)
    }

    /// 批量完结已付款且长时间无更新的订单，返回完结数量
    pub async fn complete_overdue(&self, cutoff_ms: i64) -> TradeResult<u64> {
        let now = shared::util::now_millis();
        let count = order_repo::complete_overdue(&self.db.write_pool, cutoff_ms, now).await?;
        if count > 0 {
            tracing::info!(count, "Orders auto-completed");
        }
        Ok(count)
    }
}

// ==================== 请求校验 ====================

/// 校验下单请求，返回按 sku_id 排序的行（预占顺序确定化）
fn validate_place_request(req: &PlaceOrderRequest) -> TradeResult<Vec<OrderLine>> {
    if req.user_id <= 0 {
        return Err(TradeError::Validation("user_id must be positive".into()));
    }
    if req.address_id <= 0 {
        return Err(TradeError::Validation("address_id must be positive".into()));
    }
    if req.lines.is_empty() {
        return Err(TradeError::Validation("order must contain at least one line".into()));
    }
    validate_optional_text(&req.remark, "remark", MAX_REMARK_LEN)
        .map_err(TradeError::Validation)?;

    let mut seen = HashSet::new();
    for line in &req.lines {
        money::require_valid_quantity(line.quantity).map_err(TradeError::Validation)?;
        if !seen.insert(line.sku_id) {
            return Err(TradeError::Validation(format!(
                "duplicate sku {} in order lines",
                line.sku_id
            )));
        }
    }

    let mut lines = req.lines.clone();
    lines.sort_by_key(|l| l.sku_id);
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lines: Vec<OrderLine>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            user_id: 1,
            address_id: 1,
            lines,
            remark: None,
        }
    }

    #[test]
    fn test_validate_rejects_empty_lines() {
        let req = request(vec![]);
        assert!(matches!(
            validate_place_request(&req),
            Err(TradeError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_quantity() {
        let req = request(vec![OrderLine { sku_id: 1, quantity: 0 }]);
        assert!(validate_place_request(&req).is_err());

        let req = request(vec![OrderLine { sku_id: 1, quantity: -2 }]);
        assert!(validate_place_request(&req).is_err());

        let req = request(vec![OrderLine {
            sku_id: 1,
            quantity: money::MAX_QUANTITY + 1,
        }]);
        assert!(validate_place_request(&req).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_sku() {
        let req = request(vec![
            OrderLine { sku_id: 7, quantity: 1 },
            OrderLine { sku_id: 7, quantity: 2 },
        ]);
        assert!(validate_place_request(&req).is_err());
    }

    #[test]
    fn test_validate_sorts_lines_by_sku() {
        let req = request(vec![
            OrderLine { sku_id: 9, quantity: 1 },
            OrderLine { sku_id: 3, quantity: 2 },
            OrderLine { sku_id: 5, quantity: 1 },
        ]);
        let lines = validate_place_request(&req).unwrap();
        let ids: Vec<i64> = lines.iter().map(|l| l.sku_id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn test_validate_rejects_nonpositive_ids() {
        let mut req = request(vec![OrderLine { sku_id: 1, quantity: 1 }]);
        req.user_id = 0;
        assert!(validate_place_request(&req).is_err());

        let mut req = request(vec![OrderLine { sku_id: 1, quantity: 1 }]);
        req.address_id = -5;
        assert!(validate_place_request(&req).is_err());
    }
}
