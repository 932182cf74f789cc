//! 库存台账集成测试
//!
//! 覆盖运营校正的守卫条件、流水的完整性，以及
//! 「按流水重放可以还原计数器」这一审计不变量。

use shared::models::{Sku, SkuCreate, StockChangeType};
use shared::request::{Actor, OrderLine, PlaceOrderRequest};
use std::time::Duration;
use trade_core::db::repository::sku as sku_repo;
use trade_core::inventory::ledger;
use trade_core::{Config, ServerState, TradeError};

async fn setup() -> (tempfile::TempDir, ServerState) {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(tmp.path().to_string_lossy());
    let state = ServerState::initialize(&config).await.unwrap();
    (tmp, state)
}

async fn seed_sku(state: &ServerState, stock: i64) -> Sku {
    sku_repo::create(
        &state.db.write_pool,
        SkuCreate {
            sku_code: "SKU-001".to_string(),
            name: "测试商品".to_string(),
            price: 25.0,
            promotion_price: None,
            stock,
        },
    )
    .await
    .unwrap()
}

async fn place(state: &ServerState, user_id: i64, sku_id: i64, quantity: i64) -> i64 {
    let detail = state
        .orders
        .place_order(&PlaceOrderRequest {
            user_id,
            address_id: 1,
            lines: vec![OrderLine { sku_id, quantity }],
            remark: None,
        })
        .await
        .unwrap();
    detail.order.id
}

fn operator() -> Actor {
    Actor::Operator {
        name: "ops".to_string(),
    }
}

// ==================== 运营校正 ====================

#[tokio::test]
async fn test_adjust_stock_updates_and_logs() {
    let (_tmp, state) = setup().await;
    let sku = seed_sku(&state, 10).await;

    let after = ledger::adjust_stock(&state.db.write_pool, sku.id, 5, &operator(), "盘盈入库")
        .await
        .unwrap();
    assert_eq!(after.stock, 15);
    assert_eq!(after.locked_stock, 0);

    tokio::time::sleep(Duration::from_millis(5)).await;
    let after = ledger::adjust_stock(&state.db.write_pool, sku.id, -3, &operator(), "破损报废")
        .await
        .unwrap();
    assert_eq!(after.stock, 12);

    // 流水倒序：最近一条在前，delta 带符号，不关联订单
    let logs = ledger::logs_for_sku(&state.db.read_pool, sku.id, 10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].change_type, StockChangeType::Adjust);
    assert_eq!(logs[0].quantity, -3);
    assert_eq!(logs[0].stock_after, 12);
    assert_eq!(logs[0].remark, "破损报废");
    assert_eq!(logs[1].quantity, 5);
    assert_eq!(logs[1].stock_after, 15);
    assert!(logs[0].order_id.is_none());
    assert_eq!(logs[0].actor, "operator:ops");

    // LIMIT 生效
    let logs = ledger::logs_for_sku(&state.db.read_pool, sku.id, 1).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].quantity, -3);
}

#[tokio::test]
async fn test_adjust_guard_protects_reservations() {
    let (_tmp, state) = setup().await;
    let sku = seed_sku(&state, 10).await;
    place(&state, 1, sku.id, 3).await;

    // 校正后 stock 会低于预占量（2 < 3），拒绝
    let err = ledger::adjust_stock(&state.db.write_pool, sku.id, -8, &operator(), "盘亏")
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));

    // 恰好降到预占量则允许（可售归零）
    let after = ledger::adjust_stock(&state.db.write_pool, sku.id, -7, &operator(), "盘亏")
        .await
        .unwrap();
    assert_eq!(after.stock, 3);
    assert_eq!(after.locked_stock, 3);
    assert_eq!(after.available(), 0);

    // 此后任何减量都越过预占线
    let err = ledger::adjust_stock(&state.db.write_pool, sku.id, -1, &operator(), "盘亏")
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));
}

#[tokio::test]
async fn test_adjust_rejects_zero_and_missing_sku() {
    let (_tmp, state) = setup().await;
    let sku = seed_sku(&state, 5).await;

    let err = ledger::adjust_stock(&state.db.write_pool, sku.id, 0, &operator(), "noop")
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));

    let err = ledger::adjust_stock(&state.db.write_pool, 999_999, 1, &operator(), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::NotFound(_)));

    // 无预占时也不允许把 stock 调成负数
    let err = ledger::adjust_stock(&state.db.write_pool, sku.id, -6, &operator(), "盘亏")
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));

    // 以上失败都不得留下流水
    let logs = ledger::logs_for_sku(&state.db.read_pool, sku.id, 10).await.unwrap();
    assert!(logs.is_empty());
}

// ==================== 流水重放 ====================

/// 从初始计数器出发，按时间顺序重放流水，每一步的结果
/// 必须与该条流水记录的快照一致，终态必须与 sku 行一致。
#[tokio::test]
async fn test_ledger_replay_reconstructs_counters() {
    let (_tmp, state) = setup().await;
    let sku = seed_sku(&state, 10).await;

    // 操作间隔几毫秒，保证流水时间戳严格递增
    let order_a = place(&state, 1, sku.id, 3).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let order_b = place(&state, 2, sku.id, 2).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    state.orders.mark_paid(order_a, "PAY-A").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    state
        .orders
        .cancel(order_b, &Actor::User { id: 2 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    ledger::adjust_stock(&state.db.write_pool, sku.id, 4, &operator(), "补货")
        .await
        .unwrap();

    let mut logs = ledger::logs_for_sku(&state.db.read_pool, sku.id, 50).await.unwrap();
    logs.reverse(); // 倒序转时间正序
    assert_eq!(logs.len(), 5);

    let (mut stock, mut locked) = (10_i64, 0_i64);
    for entry in &logs {
        match entry.change_type {
            StockChangeType::Reserve => locked += entry.quantity,
            StockChangeType::Release => locked -= entry.quantity,
            StockChangeType::Consume => {
                stock -= entry.quantity;
                locked -= entry.quantity;
            }
            StockChangeType::Adjust => stock += entry.quantity,
        }
        assert_eq!(stock, entry.stock_after, "stock mismatch at {:?}", entry.change_type);
        assert_eq!(locked, entry.locked_after, "locked mismatch at {:?}", entry.change_type);
    }

    // 重放终态与当前计数器一致
    let current = sku_repo::find_by_id(&state.db.read_pool, sku.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock, current.stock);
    assert_eq!(locked, current.locked_stock);
    assert_eq!(current.stock, 11);
    assert_eq!(current.locked_stock, 0);
}

#[tokio::test]
async fn test_logs_scoped_by_order() {
    let (_tmp, state) = setup().await;
    let sku = seed_sku(&state, 10).await;

    let order_a = place(&state, 1, sku.id, 2).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let order_b = place(&state, 2, sku.id, 1).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    state
        .orders
        .cancel(order_a, &Actor::User { id: 1 })
        .await
        .unwrap();

    // 订单维度正序：先占后放
    let logs_a = ledger::logs_for_order(&state.db.read_pool, order_a).await.unwrap();
    assert_eq!(logs_a.len(), 2);
    assert_eq!(logs_a[0].change_type, StockChangeType::Reserve);
    assert_eq!(logs_a[1].change_type, StockChangeType::Release);

    // 互不串单
    let logs_b = ledger::logs_for_order(&state.db.read_pool, order_b).await.unwrap();
    assert_eq!(logs_b.len(), 1);
    assert_eq!(logs_b[0].change_type, StockChangeType::Reserve);
}
