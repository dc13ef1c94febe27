//! 桌台占用引擎
//!
//! 把三路独立信号 (人工占用标记、订单落桌、时段匹配) 合成一份一致的
//! 占用视图：
//!
//! - [`AvailabilityResolver`] - 按餐厅 + 时刻推导每张桌台的占用状态
//! - [`ReservationConflictGuard`] - 桌号唯一性与落桌冲突检查
//!
//! 每次请求都从存储层现算，不缓存占用状态：数据新旧只受请求延迟影响，
//! 没有失效逻辑可言。

pub mod conflict;
pub mod resolver;

pub use conflict::ReservationConflictGuard;
pub use resolver::{
    AvailabilityResolver, AvailableTableView, OccupancyCounts, TableAvailability, TableStatus,
};
