//! 库存预占压力测试 - 并发抢购不超卖
//!
//! 多任务并发抢同一 SKU 的有限库存，验证：
//! - 成功预占的总量恰好等于 locked_stock，绝不超卖
//! - 失败的请求只会是「库存不足」，不会出现其他错误
//! - 订单号在并发下不重复、序列无空洞
//! - 全部回滚后计数器与流水完全对账

use rand::Rng;
use shared::models::{SkuCreate, StockChangeType};
use shared::request::{Actor, OrderLine, PlaceOrderRequest};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Instant;
use trade_core::db::repository::{sku as sku_repo, system_state};
use trade_core::inventory::ledger;
use trade_core::{Config, ServerState, TradeError};

const TASKS: usize = 200;
const STOCK: i64 = 100;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_never_oversell() {
    let tmp = tempfile::tempdir().unwrap();

    println!();
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║        库存预占压力测试 - {} 任务抢 {} 件库存           ║", TASKS, STOCK);
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();

    // 1. 初始化
    println!("[1/4] 初始化 ServerState...");
    let config = Config::with_overrides(tmp.path().to_string_lossy());
    let state = ServerState::initialize(&config).await.unwrap();
    println!("      ✓ 数据库就绪");

    // 2. 上架商品
    println!("[2/4] 上架商品 (库存 {})...", STOCK);
    let sku = sku_repo::create(
        &state.db.write_pool,
        SkuCreate {
            sku_code: "HOT-001".to_string(),
            name: "秒杀商品".to_string(),
            price: 19.9,
            promotion_price: None,
            stock: STOCK,
        },
    )
    .await
    .unwrap();
    println!("      ✓ SKU {} 就绪", sku.sku_code);

    // 3. 并发下单
    println!("[3/4] {} 个任务并发下单 (每单 1~3 件)...", TASKS);
    let success = Arc::new(AtomicUsize::new(0));
    let sold_out = Arc::new(AtomicUsize::new(0));
    let other_errors = Arc::new(AtomicUsize::new(0));
    let reserved_total = Arc::new(AtomicI64::new(0));
    let placed: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let order_nos: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let start = Instant::now();
    let mut handles = Vec::with_capacity(TASKS);
    for i in 0..TASKS {
        let state = state.clone();
        let success = success.clone();
        let sold_out = sold_out.clone();
        let other_errors = other_errors.clone();
        let reserved_total = reserved_total.clone();
        let placed = placed.clone();
        let order_nos = order_nos.clone();
        let sku_id = sku.id;

        handles.push(tokio::spawn(async move {
            let quantity = rand::thread_rng().gen_range(1..=3);
            let req = PlaceOrderRequest {
                user_id: i as i64 + 1,
                address_id: 1,
                lines: vec![OrderLine { sku_id, quantity }],
                remark: None,
            };

            match state.orders.place_order(&req).await {
                Ok(detail) => {
                    success.fetch_add(1, Ordering::Relaxed);
                    reserved_total.fetch_add(quantity, Ordering::Relaxed);
                    placed.lock().unwrap().push(detail.order.id);
                    order_nos.lock().unwrap().push(detail.order.order_no);
                }
                Err(TradeError::InsufficientStock { .. }) => {
                    sold_out.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    let n = other_errors.fetch_add(1, Ordering::Relaxed) + 1;
                    if n <= 3 {
                        eprintln!("      [ERR] 任务 {} 意外失败: {}", i, e);
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    let full = sold_out.load(Ordering::Relaxed);
    let bad = other_errors.load(Ordering::Relaxed);
    let reserved = reserved_total.load(Ordering::Relaxed);

    println!(
        "      完成: {} 成功, {} 库存不足, {} 异常, 耗时 {:.2?} ({:.0} 单/秒)",
        ok,
        full,
        bad,
        elapsed,
        TASKS as f64 / elapsed.as_secs_f64()
    );

    // 出错类别与总量守恒
    assert_eq!(bad, 0, "并发下单不应出现库存不足之外的错误");
    assert_eq!(ok + full, TASKS);
    assert!(full > 0, "需求远超库存，必须有请求被拒绝");

    // 计数器与成功预占的总量严格一致，绝不超卖
    let after = sku_repo::find_by_id(&state.db.read_pool, sku.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, STOCK);
    assert_eq!(after.locked_stock, reserved);
    assert!(after.locked_stock <= STOCK, "locked_stock 超过物理库存");
    // 失败请求最多要 3 件，可售余量若 >= 3 说明拒绝错了人
    assert!(after.available() < 3);

    // 流水与计数器对账
    let logs = ledger::logs_for_sku(&state.db.read_pool, sku.id, 1000).await.unwrap();
    let reserve_entries: Vec<_> = logs
        .iter()
        .filter(|l| l.change_type == StockChangeType::Reserve)
        .collect();
    assert_eq!(reserve_entries.len(), ok);
    let reserve_sum: i64 = reserve_entries.iter().map(|l| l.quantity).sum();
    assert_eq!(reserve_sum, after.locked_stock);

    // 订单号不重复，序列无空洞（失败的事务回滚了序号）
    let nos = order_nos.lock().unwrap();
    let unique: HashSet<&String> = nos.iter().collect();
    assert_eq!(unique.len(), ok);
    let seq = system_state::get(&state.db.read_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seq.next_order_seq, ok as i64);
    drop(nos);

    // 4. 并发回滚全部订单
    println!("[4/4] 并发取消全部 {} 个订单...", ok);
    let order_ids: Vec<i64> = placed.lock().unwrap().clone();
    let mut handles = Vec::with_capacity(order_ids.len());
    for order_id in order_ids {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state.orders.cancel(order_id, &Actor::System).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let after = sku_repo::find_by_id(&state.db.read_pool, sku.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, STOCK);
    assert_eq!(after.locked_stock, 0);

    let logs = ledger::logs_for_sku(&state.db.read_pool, sku.id, 1000).await.unwrap();
    let release_sum: i64 = logs
        .iter()
        .filter(|l| l.change_type == StockChangeType::Release)
        .map(|l| l.quantity)
        .sum();
    assert_eq!(release_sum, reserve_sum, "释放总量必须等于预占总量");

    println!();
    println!("═══════════════════════════════════════════════════════════");
    println!("  成功订单:   {}", ok);
    println!("  拒绝请求:   {}", full);
    println!("  预占峰值:   {} / {}", reserved, STOCK);
    println!("  回滚后库存: {} (锁定 {})", after.stock, after.locked_stock);
    println!("═══════════════════════════════════════════════════════════");
    println!("✅ 测试通过!");
}
