//! 占用引擎端到端测试 (内存数据库)
//!
//! 桌台走 repository 写入，订单/餐厅/顾客按订单服务的存储形态直接种进
//! 存储层 (本服务对它们只读)。

use mesa_server::db::models::{DiningTableCreate, Position};
use mesa_server::db::repository::RepoError;
use mesa_server::{Config, ServerState, TableStatus};
use surrealdb::RecordId;

const SLOT: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

async fn test_state() -> ServerState {
    let config = Config::with_overrides("/tmp/mesa-test", 0, 0);
    ServerState::initialize_in_memory(&config)
        .await
        .expect("in-memory state")
}

fn restaurant_id(key: &str) -> RecordId {
    RecordId::from_table_key("restaurant", key)
}

async fn seed_restaurant(state: &ServerState, key: &str, seating: Option<serde_json::Value>) {
    state
        .db
        .query("CREATE $id SET name = $name, seating_preference = $seating")
        .bind(("id", restaurant_id(key)))
        .bind(("name", format!("Restaurant {key}")))
        .bind(("seating", seating))
        .await
        .expect("seed restaurant")
        .check()
        .expect("seed restaurant");
}

async fn seed_customer(state: &ServerState, key: &str, name: &str) -> RecordId {
    let id = RecordId::from_table_key("customer", key);
    state
        .db
        .query("CREATE $id SET name = $name")
        .bind(("id", id.clone()))
        .bind(("name", name.to_string()))
        .await
        .expect("seed customer")
        .check()
        .expect("seed customer");
    id
}

async fn seed_order(
    state: &ServerState,
    restaurant: &RecordId,
    tables: Vec<RecordId>,
    delivery_time: i64,
    customer: Option<RecordId>,
) {
    state
        .db
        .query(
            "CREATE order SET restaurant = $restaurant, tables = $tables, \
             delivery_time = $delivery_time, customer = $customer",
        )
        .bind(("restaurant", restaurant.clone()))
        .bind(("tables", tables))
        .bind(("delivery_time", delivery_time))
        .bind(("customer", customer))
        .await
        .expect("seed order")
        .check()
        .expect("seed order");
}

async fn create_table(
    state: &ServerState,
    restaurant: &RecordId,
    table_no: u32,
    floor_type: &str,
    booking_status: bool,
) -> RecordId {
    let table = state
        .table_repo()
        .create(DiningTableCreate {
            table_no,
            capacity: 4,
            cost_person: 100,
            restaurant: restaurant.clone(),
            booking_status,
            floor_type: floor_type.to_string(),
            position: Position::default(),
        })
        .await
        .expect("create table");
    table.id.expect("created table id")
}

#[tokio::test]
async fn booked_table_is_occupied_at_any_instant() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    let t5 = create_table(&state, &restaurant, 5, "indoor", true).await;
    seed_order(&state, &restaurant, vec![t5], SLOT, None).await;

    for at in [SLOT, SLOT + HOUR, 0] {
        let (views, _) = state
            .resolver()
            .resolve(&restaurant, None, Some(at), false)
            .await
            .unwrap();
        assert_eq!(views[0].table_status, Some(TableStatus::Occupied));
    }
}

#[tokio::test]
async fn order_slot_marks_reserved_then_frees_up() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    let t6 = create_table(&state, &restaurant, 6, "indoor", false).await;
    seed_order(&state, &restaurant, vec![t6], SLOT, None).await;

    // 时段命中 → reserved
    let (views, counts) = state
        .resolver()
        .resolve(&restaurant, None, Some(SLOT), false)
        .await
        .unwrap();
    assert_eq!(views[0].table_status, Some(TableStatus::Reserved));
    let counts = counts.unwrap();
    assert_eq!(counts.occupied, 1);
    assert_eq!(counts.available, 0);

    // 一小时后没有订单 → available
    let (views, counts) = state
        .resolver()
        .resolve(&restaurant, None, Some(SLOT + HOUR), false)
        .await
        .unwrap();
    assert_eq!(views[0].table_status, Some(TableStatus::Available));
    assert_eq!(counts.unwrap().available, 1);
}

#[tokio::test]
async fn legacy_counters_only_count_order_matches() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    create_table(&state, &restaurant, 1, "indoor", true).await;
    let t2 = create_table(&state, &restaurant, 2, "indoor", false).await;
    seed_order(&state, &restaurant, vec![t2], SLOT, None).await;

    let (views, counts) = state
        .resolver()
        .resolve(&restaurant, None, Some(SLOT), false)
        .await
        .unwrap();
    let counts = counts.unwrap();

    // 桌 1 状态是 occupied，但历史口径的计数只数订单占位
    assert_eq!(counts.occupied, 1);
    assert_eq!(counts.available, 1);
    assert_eq!(counts.available + counts.occupied, views.len());
}

#[tokio::test]
async fn floor_filter_all_is_a_sentinel() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    create_table(&state, &restaurant, 1, "indoor", false).await;
    create_table(&state, &restaurant, 2, "outdoor", false).await;

    let resolver = state.resolver();

    let (all, _) = resolver
        .resolve(&restaurant, Some("all"), None, false)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let (indoor, _) = resolver
        .resolve(&restaurant, Some("indoor"), None, false)
        .await
        .unwrap();
    assert_eq!(indoor.len(), 1);
    assert_eq!(indoor[0].table.floor_type, "indoor");

    let (none, _) = resolver
        .resolve(&restaurant, Some("patio"), None, false)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn listing_without_instant_skips_status_and_counts() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    create_table(&state, &restaurant, 1, "indoor", true).await;

    let (views, counts) = state
        .resolver()
        .resolve(&restaurant, None, None, false)
        .await
        .unwrap();
    assert!(counts.is_none());
    assert_eq!(views[0].table_status, None);
}

#[tokio::test]
async fn listing_is_idempotent_and_newest_first() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    create_table(&state, &restaurant, 1, "indoor", false).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    create_table(&state, &restaurant, 2, "indoor", false).await;

    let resolver = state.resolver();
    let (first, _) = resolver.resolve(&restaurant, None, None, false).await.unwrap();
    let (second, _) = resolver.resolve(&restaurant, None, None, false).await.unwrap();

    let ids = |views: &[mesa_server::availability::TableAvailability]| {
        views
            .iter()
            .map(|v| v.table.id.clone().unwrap().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));

    // 默认按创建时间倒序
    assert_eq!(first[0].table.table_no, 2);
    assert_eq!(first[1].table.table_no, 1);

    let (ascending, _) = resolver.resolve(&restaurant, None, None, true).await.unwrap();
    assert_eq!(ascending[0].table.table_no, 1);
}

#[tokio::test]
async fn unknown_restaurant_resolves_to_empty_not_error() {
    let state = test_state().await;
    let (views, _) = state
        .resolver()
        .resolve(&restaurant_id("ghost"), None, None, false)
        .await
        .unwrap();
    assert!(views.is_empty());
}

#[tokio::test]
async fn customer_name_is_joined_into_available_view() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    seed_restaurant(&state, "r1", None).await;
    let walter = seed_customer(&state, "c1", "Walter").await;

    let t1 = create_table(&state, &restaurant, 1, "indoor", false).await;
    create_table(&state, &restaurant, 2, "indoor", false).await;
    seed_order(&state, &restaurant, vec![t1.clone()], SLOT, Some(walter)).await;

    let views = state
        .resolver()
        .resolve_available(&restaurant, SLOT)
        .await
        .unwrap();

    let reserved = views
        .iter()
        .find(|v| v.table.id.as_ref() == Some(&t1))
        .unwrap();
    assert_eq!(reserved.available_status, TableStatus::Reserved);
    assert_eq!(reserved.customer.as_deref(), Some("Walter"));

    let free = views
        .iter()
        .find(|v| v.table.id.as_ref() != Some(&t1))
        .unwrap();
    assert_eq!(free.available_status, TableStatus::Available);
    assert_eq!(free.customer, None);
}

#[tokio::test]
async fn customer_view_ignores_booking_status() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    create_table(&state, &restaurant, 1, "indoor", true).await;

    let views = state
        .resolver()
        .resolve_available(&restaurant, SLOT)
        .await
        .unwrap();

    // booking_status 不参与顾客路径的判定
    assert_eq!(views[0].available_status, TableStatus::Available);
}

#[tokio::test]
async fn assignment_guard_rejects_double_binding() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");
    let t1 = create_table(&state, &restaurant, 1, "indoor", false).await;
    let t2 = create_table(&state, &restaurant, 2, "indoor", false).await;
    seed_order(&state, &restaurant, vec![t1.clone()], SLOT, None).await;

    let guard = state.conflict_guard();

    // 同一时段同一桌台 → 冲突
    let err = guard
        .ensure_assignable(&restaurant, &[t1.clone()], SLOT)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    // 另一张桌台或另一个时段都没问题
    guard
        .ensure_assignable(&restaurant, &[t2], SLOT)
        .await
        .unwrap();
    guard
        .ensure_assignable(&restaurant, &[t1], SLOT + HOUR)
        .await
        .unwrap();
}
