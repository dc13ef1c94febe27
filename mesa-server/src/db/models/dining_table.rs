//! Dining Table Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

/// 桌台摆放方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Horizontal,
    Vertical,
}

/// 桌台在平面图上的位置 (纯展示用途，无业务约束)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub align: Align,
}

/// Dining table entity (桌台)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// 桌号，(restaurant, table_no) 全局唯一
    pub table_no: u32,
    pub capacity: u32,
    /// 人均消费
    pub cost_person: u32,
    /// Restaurant reference
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant: RecordId,
    /// 人工占用标记：不管有没有订单，桌台被现场标记为占用
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub booking_status: bool,
    /// 区域标签 (室内/室外等自由文本)
    pub floor_type: String,
    #[serde(default)]
    pub position: Position,
    /// 创建时间 (Unix millis)，默认排序键
    pub created_at: i64,
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiningTableCreate {
    #[validate(range(min = 1))]
    pub table_no: u32,
    #[validate(range(min = 1))]
    pub capacity: u32,
    #[validate(range(min = 1))]
    pub cost_person: u32,
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant: RecordId,
    #[serde(default)]
    pub booking_status: bool,
    #[validate(length(min = 1))]
    pub floor_type: String,
    #[serde(default)]
    pub position: Position,
}

/// Update dining table payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DiningTableUpdate {
    #[validate(range(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_no: Option<u32>,
    #[validate(range(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[validate(range(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_person: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub restaurant: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_status: Option<bool>,
    #[validate(length(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}
