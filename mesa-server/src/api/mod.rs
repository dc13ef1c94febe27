//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`tables`] - 桌台管理接口 (含占用视图)

pub mod health;
pub mod tables;
