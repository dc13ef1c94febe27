//! Order Model (read-only projection)
//!
//! Orders are owned by the external order-management collaborator; this
//! service only reads the fields that drive table occupancy.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Order as stored by the order-management collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant: RecordId,
    /// 一个订单可以占用多张桌台
    #[serde(default, with = "serde_helpers::vec_record_id")]
    pub tables: Vec<RecordId>,
    /// 预定的占用时刻 (Unix millis)
    pub delivery_time: i64,
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub customer: Option<RecordId>,
}

/// Order slot joined with the holding customer's display name
///
/// Projection returned by `OrderRepository::find_by_delivery_slot`; the
/// customer name comes from a store-level record-link traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSlot {
    #[serde(default, with = "serde_helpers::vec_record_id")]
    pub tables: Vec<RecordId>,
    pub delivery_time: i64,
    #[serde(default)]
    pub customer_name: Option<String>,
}
