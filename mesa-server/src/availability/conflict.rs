//! Reservation Conflict Guard
//!
//! 写入前的冲突检查：桌号唯一性 (建桌/改桌) 和落桌占位冲突 (订单侧)。

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use crate::db::repository::{DiningTableRepository, OrderRepository, RepoError, RepoResult};

#[derive(Clone)]
pub struct ReservationConflictGuard {
    tables: DiningTableRepository,
    orders: OrderRepository,
}

impl ReservationConflictGuard {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            tables: DiningTableRepository::new(db.clone()),
            orders: OrderRepository::new(db),
        }
    }

    /// Advisory duplicate check for `(restaurant, table_no)`
    ///
    /// 先查后写不是原子的：并发创建同一桌号时，最终由存储层的唯一索引
    /// 裁决 (见 `db::bootstrap_schema`)，这里只是快路径，让正常请求不用
    /// 等到写入才失败。`exclude` 用于更新场景排除自身。
    pub async fn ensure_unique_table_no(
        &self,
        restaurant: &RecordId,
        table_no: u32,
        exclude: Option<&RecordId>,
    ) -> RepoResult<()> {
        if let Some(found) = self
            .tables
            .find_by_no_in_restaurant(restaurant, table_no)
            .await?
            && found.id.as_ref() != exclude
        {
            return Err(RepoError::Duplicate(format!(
                "Table {} already exists in this restaurant",
                table_no
            )));
        }
        Ok(())
    }

    /// Assignment-time occupancy check, offered to the order collaborator
    ///
    /// 拒绝把订单落到同一配送时段已被其他订单占用的桌台上。桌台接口
    /// 本身不调用它 —— 订单归订单服务管，这里只提供判定。
    pub async fn ensure_assignable(
        &self,
        restaurant: &RecordId,
        table_ids: &[RecordId],
        delivery_time: i64,
    ) -> RepoResult<()> {
        let slots = self
            .orders
            .find_by_delivery_slot(restaurant, delivery_time)
            .await?;

        if let Some(conflicting) = table_ids
            .iter()
            .find(|id| slots.iter().any(|slot| slot.tables.contains(id)))
        {
            return Err(RepoError::Conflict(format!(
                "Table {} is already reserved at {}",
                conflicting, delivery_time
            )));
        }
        Ok(())
    }
}
