//! 桌台 CRUD 与唯一性测试 (内存数据库)

use mesa_server::db::DbService;
use mesa_server::db::models::{DiningTableCreate, DiningTableUpdate, Position};
use mesa_server::db::repository::{DiningTableRepository, RepoError};
use mesa_server::{Config, ServerState};
use shared::PageQuery;
use surrealdb::RecordId;

async fn test_state() -> ServerState {
    let config = Config::with_overrides("/tmp/mesa-test", 0, 0);
    ServerState::initialize_in_memory(&config)
        .await
        .expect("in-memory state")
}

fn restaurant_id(key: &str) -> RecordId {
    RecordId::from_table_key("restaurant", key)
}

fn table_payload(table_no: u32, restaurant: &RecordId) -> DiningTableCreate {
    DiningTableCreate {
        table_no,
        capacity: 4,
        cost_person: 100,
        restaurant: restaurant.clone(),
        booking_status: false,
        floor_type: "indoor".to_string(),
        position: Position::default(),
    }
}

#[tokio::test]
async fn create_table_returns_generated_id() {
    let state = test_state().await;
    let repo = state.table_repo();
    let restaurant = restaurant_id("r1");

    let table = repo.create(table_payload(5, &restaurant)).await.unwrap();

    assert!(table.id.is_some());
    assert_eq!(table.table_no, 5);
    assert_eq!(table.capacity, 4);
    assert_eq!(table.cost_person, 100);
    assert_eq!(table.restaurant, restaurant);
    assert_eq!(table.floor_type, "indoor");
    assert!(!table.booking_status);
    assert!(table.created_at > 0);
}

#[tokio::test]
async fn duplicate_table_no_rejected_by_guard() {
    let state = test_state().await;
    let restaurant = restaurant_id("r1");

    state
        .table_repo()
        .create(table_payload(5, &restaurant))
        .await
        .unwrap();

    let err = state
        .conflict_guard()
        .ensure_unique_table_no(&restaurant, 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));

    // 其他餐厅的同桌号不冲突
    state
        .conflict_guard()
        .ensure_unique_table_no(&restaurant_id("r2"), 5, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn unique_index_is_authoritative_without_the_guard() {
    let state = test_state().await;
    let repo = state.table_repo();
    let restaurant = restaurant_id("r1");

    repo.create(table_payload(7, &restaurant)).await.unwrap();

    // 绕过快路径预检查直接写，存储层唯一索引必须拒绝
    let err = repo
        .create(table_payload(7, &restaurant))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));
}

#[tokio::test]
async fn update_merges_fields_and_checks_duplicates() {
    let state = test_state().await;
    let repo = state.table_repo();
    let restaurant = restaurant_id("r1");

    let table = repo.create(table_payload(5, &restaurant)).await.unwrap();
    let id = table.id.as_ref().unwrap().to_string();

    let updated = repo
        .update(
            &id,
            DiningTableUpdate {
                capacity: Some(6),
                floor_type: Some("outdoor".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.table_no, 5);
    assert_eq!(updated.capacity, 6);
    assert_eq!(updated.floor_type, "outdoor");

    // 改到被占用的桌号：guard 用 exclude 排除自身后应报 Duplicate
    repo.create(table_payload(6, &restaurant)).await.unwrap();
    let err = state
        .conflict_guard()
        .ensure_unique_table_no(&restaurant, 6, updated.id.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));

    // 改回自己的桌号不算冲突
    state
        .conflict_guard()
        .ensure_unique_table_no(&restaurant, 5, updated.id.as_ref())
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_returns_record_then_not_found() {
    let state = test_state().await;
    let repo = state.table_repo();
    let restaurant = restaurant_id("r1");

    let table = repo.create(table_payload(9, &restaurant)).await.unwrap();
    let id = table.id.as_ref().unwrap().to_string();

    let deleted = repo.delete(&id).await.unwrap();
    assert_eq!(deleted.table_no, 9);
    assert!(repo.find_by_id(&id).await.unwrap().is_none());

    // 再删一次：NotFound
    let err = repo.delete(&id).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn delete_unknown_id_is_not_found() {
    let state = test_state().await;
    let err = state
        .table_repo()
        .delete("dining_table:missing")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn malformed_id_is_a_validation_error() {
    let state = test_state().await;
    let err = state.table_repo().find_by_id("not a record id").await;
    assert!(matches!(err, Err(RepoError::Validation(_))));
}

#[tokio::test]
async fn pagination_metadata_is_consistent() {
    let state = test_state().await;
    let repo = state.table_repo();
    let restaurant = restaurant_id("r1");

    for no in 1..=3 {
        repo.create(table_payload(no, &restaurant)).await.unwrap();
    }

    let page = repo
        .find_all_paged(&PageQuery {
            page: Some(1),
            limit: Some(2),
            sort: None,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data.len(), 2);

    let rest = repo
        .find_all_paged(&PageQuery {
            page: Some(2),
            limit: Some(2),
            sort: None,
        })
        .await
        .unwrap();
    assert_eq!(rest.data.len(), 1);
}

#[tokio::test]
async fn on_disk_database_bootstraps_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("mesa.db");
    let service = DbService::new(&db_path.to_string_lossy()).await.unwrap();

    let repo = DiningTableRepository::new(service.db.clone());
    let restaurant = restaurant_id("r1");
    repo.create(table_payload(1, &restaurant)).await.unwrap();

    // 唯一索引在磁盘库上同样生效
    let err = repo
        .create(table_payload(1, &restaurant))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));
}
