//! Dining Table API Handlers
//!
//! 每个接口处理完请求后都会把与响应体一致的载荷广播到消息总线
//! (见 `ServerState::broadcast_table_event`)；广播是纯附加的观测通道，
//! 去掉它不改变任何 HTTP 响应。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

use shared::message::TableAction;
use shared::{PageQuery, PaginatedResponse};

use crate::auth::Identity;
use crate::availability::{AvailableTableView, TableAvailability};
use crate::core::ServerState;
use crate::db::models::{DiningTable, DiningTableCreate, DiningTableUpdate};
use crate::utils::time::parse_instant;
use crate::utils::{AppError, AppResult};

/// GET /api/tables 的查询参数即 [`PageQuery`]

/// GET /api/tables/restaurant/:id 查询参数
#[derive(Debug, Deserialize)]
pub struct RestaurantTablesQuery {
    /// 区域过滤，"all" 或缺省表示不过滤
    pub floor_type: Option<String>,
    /// 占用判定时刻 (毫秒时间戳或 RFC 3339)；缺省只做列表
    pub at: Option<String>,
    /// 排序方向 ("asc" | "desc"，默认 desc)
    pub sort: Option<String>,
}

/// GET /api/tables/restaurant/:id/available 查询参数
#[derive(Debug, Deserialize)]
pub struct AvailableTablesQuery {
    /// 占用判定时刻 (毫秒时间戳或 RFC 3339)
    pub at: String,
}

/// ListTablesByRestaurant 响应体
#[derive(Debug, Serialize)]
pub struct TablesByRestaurantResponse {
    pub tables: Vec<TableAvailability>,
    /// 计数只在带时刻的查询里产出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupied_count: Option<usize>,
    /// 餐厅座位偏好配置，原样透传
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seating_preference: Option<serde_json::Value>,
}

fn parse_record_id(raw: &str) -> AppResult<RecordId> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("Invalid ID: {}", raw)))
}

/// GET /api/tables - 分页获取所有桌台
pub async fn list(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<DiningTable>>> {
    let page = state.table_repo().find_all_paged(&query).await?;

    state.broadcast_table_event(identity.actor(), TableAction::GetAll, None, Some(&page));

    Ok(Json(page))
}

/// GET /api/tables/:id - 获取单个桌台
pub async fn get_by_id(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<DiningTable>> {
    let table = state
        .table_repo()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {} not found", id)))?;

    state.broadcast_table_event(identity.actor(), TableAction::Get, Some(id), Some(&table));

    Ok(Json(table))
}

/// POST /api/tables - 创建桌台
pub async fn create(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<DiningTableCreate>,
) -> AppResult<Json<DiningTable>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    // 快路径重复检查；并发竞争由存储层唯一索引兜底
    state
        .conflict_guard()
        .ensure_unique_table_no(&payload.restaurant, payload.table_no, None)
        .await?;

    let table = state.table_repo().create(payload).await?;

    let id = table.id.as_ref().map(|t| t.to_string());
    state.broadcast_table_event(identity.actor(), TableAction::Add, id, Some(&table));

    Ok(Json(table))
}

/// PUT /api/tables/:id - 更新桌台
pub async fn update(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(payload): Json<DiningTableUpdate>,
) -> AppResult<Json<DiningTable>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let repo = state.table_repo();
    let existing = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {} not found", id)))?;

    // 桌号或所属餐厅变化时重查唯一性 (排除自身)
    if payload.table_no.is_some() || payload.restaurant.is_some() {
        let table_no = payload.table_no.unwrap_or(existing.table_no);
        let restaurant = payload
            .restaurant
            .clone()
            .unwrap_or_else(|| existing.restaurant.clone());
        state
            .conflict_guard()
            .ensure_unique_table_no(&restaurant, table_no, existing.id.as_ref())
            .await?;
    }

    let table = repo.update(&id, payload).await?;

    state.broadcast_table_event(identity.actor(), TableAction::Update, Some(id), Some(&table));

    Ok(Json(table))
}

/// DELETE /api/tables/:id - 删除桌台
///
/// 删除不会级联到历史订单，订单里留着的桌台引用就此悬空。
pub async fn delete(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<DiningTable>> {
    let deleted = state.table_repo().delete(&id).await?;

    state.broadcast_table_event(
        identity.actor(),
        TableAction::Delete,
        Some(id),
        Some(&deleted),
    );

    Ok(Json(deleted))
}

/// GET /api/tables/restaurant/:id - 获取餐厅的桌台
///
/// 带 `at` 时附带每张桌台的占用状态和可用/占用计数。
pub async fn list_by_restaurant(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(restaurant_id): Path<String>,
    Query(query): Query<RestaurantTablesQuery>,
) -> AppResult<Json<TablesByRestaurantResponse>> {
    let restaurant = parse_record_id(&restaurant_id)?;
    let at = query.at.as_deref().map(parse_instant).transpose()?;
    let ascending = query.sort.as_deref() == Some("asc");

    let (tables, counts) = state
        .resolver()
        .resolve(&restaurant, query.floor_type.as_deref(), at, ascending)
        .await?;

    if tables.is_empty() {
        return Err(AppError::not_found(format!(
            "No tables found for restaurant {}",
            restaurant_id
        )));
    }

    // 未知餐厅不报错，座位偏好留空即可
    let seating_preference = state
        .restaurant_repo()
        .find_by_id(&restaurant_id)
        .await?
        .and_then(|r| r.seating_preference);

    let response = TablesByRestaurantResponse {
        tables,
        available_count: counts.map(|c| c.available),
        occupied_count: counts.map(|c| c.occupied),
        seating_preference,
    };

    state.broadcast_table_event(
        identity.actor(),
        TableAction::GetByRestaurant,
        None,
        Some(&response),
    );

    Ok(Json(response))
}

/// GET /api/tables/restaurant/:id/available - 顾客侧可订桌台
pub async fn available_by_restaurant(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(restaurant_id): Path<String>,
    Query(query): Query<AvailableTablesQuery>,
) -> AppResult<Json<PaginatedResponse<AvailableTableView>>> {
    let restaurant = parse_record_id(&restaurant_id)?;
    let at = parse_instant(&query.at)?;

    let views = state.resolver().resolve_available(&restaurant, at).await?;

    if views.is_empty() {
        return Err(AppError::not_found(format!(
            "No tables found for restaurant {}",
            restaurant_id
        )));
    }

    let page = PaginatedResponse::single_page(views);

    state.broadcast_table_event(
        identity.actor(),
        TableAction::GetAvailableByRestaurant,
        None,
        Some(&page),
    );

    Ok(Json(page))
}
