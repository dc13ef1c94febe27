//! Restaurant Model
//!
//! Read-only from this service's perspective: restaurants are managed by the
//! upstream admin collaborator, this backend only consumes them.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Restaurant entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    /// 座位偏好配置，本服务不解释其内容，原样透传给前端
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seating_preference: Option<serde_json::Value>,
}
