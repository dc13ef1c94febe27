//! Availability Resolver
//!
//! 给定餐厅和可选时刻，推导每张桌台是 available / reserved / occupied。
//!
//! 判定优先级 (每张桌台)：
//! 1. `booking_status == true` → occupied (人工标记压过一切)
//! 2. 该时刻有订单落在这张桌台 → reserved
//! 3. 其余 → available

use serde::{Deserialize, Serialize};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use crate::db::models::{DiningTable, OrderSlot};
use crate::db::repository::{DiningTableRepository, OrderRepository, RepoResult};

/// 桌台占用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Occupied,
    Reserved,
    Available,
}

/// Per-request derived view of one table (never persisted)
#[derive(Debug, Clone, Serialize)]
pub struct TableAvailability {
    #[serde(flatten)]
    pub table: DiningTable,
    /// 只有带时刻的查询才有状态；纯列表查询为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_status: Option<TableStatus>,
}

/// Customer-facing view returned by the "available tables" query
///
/// 这条路径上的状态字段历史上叫 `available_status`，且只区分
/// available / reserved —— `booking_status` 不参与判定。
#[derive(Debug, Clone, Serialize)]
pub struct AvailableTableView {
    #[serde(flatten)]
    pub table: DiningTable,
    pub available_status: TableStatus,
    /// 持有预定的顾客姓名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

/// Aggregate occupancy counters, `available + occupied == total` always
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancyCounts {
    pub available: usize,
    pub occupied: usize,
}

/// Availability Resolver
#[derive(Clone)]
pub struct AvailabilityResolver {
    tables: DiningTableRepository,
    orders: OrderRepository,
    unified_counts: bool,
}

impl AvailabilityResolver {
    pub fn new(db: Surreal<Db>, unified_counts: bool) -> Self {
        Self {
            tables: DiningTableRepository::new(db.clone()),
            orders: OrderRepository::new(db),
            unified_counts,
        }
    }

    /// Resolve the occupancy view of a restaurant's tables
    ///
    /// 不带 `at` 时只做列表：状态字段与计数都不产出。未知餐厅得到空结果
    /// 而不是错误，由调用方决定空结果怎么呈现。
    pub async fn resolve(
        &self,
        restaurant: &RecordId,
        floor_type: Option<&str>,
        at: Option<i64>,
        ascending: bool,
    ) -> RepoResult<(Vec<TableAvailability>, Option<OccupancyCounts>)> {
        let Some(at) = at else {
            let tables = self
                .tables
                .find_by_restaurant(restaurant, floor_type, ascending)
                .await?;
            let views = tables
                .into_iter()
                .map(|table| TableAvailability {
                    table,
                    table_status: None,
                })
                .collect();
            return Ok((views, None));
        };

        // 桌台和订单两次取数没有数据依赖，并发发出，合并前等齐两边
        let (tables, slots) = tokio::join!(
            self.tables
                .find_by_restaurant(restaurant, floor_type, ascending),
            self.orders.find_by_delivery_slot(restaurant, at),
        );
        let (tables, slots) = (tables?, slots?);

        let (views, counts) = derive_views(tables, &slots, self.unified_counts);
        Ok((views, Some(counts)))
    }

    /// Customer-facing "available tables" view at a delivery slot
    pub async fn resolve_available(
        &self,
        restaurant: &RecordId,
        at: i64,
    ) -> RepoResult<Vec<AvailableTableView>> {
        let (tables, slots) = tokio::join!(
            self.tables.find_by_restaurant(restaurant, None, false),
            self.orders.find_by_delivery_slot(restaurant, at),
        );
        let (tables, slots) = (tables?, slots?);
        Ok(derive_available_views(tables, &slots))
    }
}

/// Ids of every table bound to some order in the slot
fn reserved_ids(slots: &[OrderSlot]) -> Vec<RecordId> {
    slots
        .iter()
        .flat_map(|slot| slot.tables.iter().cloned())
        .collect()
}

/// Status of a single table, by precedence
fn classify(table: &DiningTable, reserved: &[RecordId]) -> TableStatus {
    if table.booking_status {
        return TableStatus::Occupied;
    }
    match &table.id {
        Some(id) if reserved.contains(id) => TableStatus::Reserved,
        _ => TableStatus::Available,
    }
}

/// Derive per-table views and aggregate counters
///
/// 计数有两套口径：per-table 的 `table_status` 考虑 `booking_status`，而
/// 聚合计数历史上只数订单占位 (available = 总数 - 被订单占的数量)。这是
/// 沿袭下来的不一致，下游展示依赖这个口径，默认原样保留；
/// `unified_counts` 打开后计数改为与 per-table 状态同口径。
fn derive_views(
    tables: Vec<DiningTable>,
    slots: &[OrderSlot],
    unified_counts: bool,
) -> (Vec<TableAvailability>, OccupancyCounts) {
    let reserved = reserved_ids(slots);
    let total = tables.len();
    let mut order_matched = 0usize;
    let mut non_available = 0usize;

    let views: Vec<TableAvailability> = tables
        .into_iter()
        .map(|table| {
            let status = classify(&table, &reserved);
            if table.id.as_ref().is_some_and(|id| reserved.contains(id)) {
                order_matched += 1;
            }
            if status != TableStatus::Available {
                non_available += 1;
            }
            TableAvailability {
                table,
                table_status: Some(status),
            }
        })
        .collect();

    let occupied = if unified_counts {
        non_available
    } else {
        order_matched
    };
    let counts = OccupancyCounts {
        available: total - occupied,
        occupied,
    };
    (views, counts)
}

/// Derive the customer-facing view: available / reserved only
fn derive_available_views(tables: Vec<DiningTable>, slots: &[OrderSlot]) -> Vec<AvailableTableView> {
    tables
        .into_iter()
        .map(|table| {
            // 持有这张桌台的订单 (如果有)，顾客姓名从它上面取
            let holding_slot = table
                .id
                .as_ref()
                .and_then(|id| slots.iter().find(|slot| slot.tables.contains(id)));
            match holding_slot {
                Some(slot) => AvailableTableView {
                    table,
                    available_status: TableStatus::Reserved,
                    customer: slot.customer_name.clone(),
                },
                None => AvailableTableView {
                    table,
                    available_status: TableStatus::Available,
                    customer: None,
                },
            }
        })
        .collect()
}
