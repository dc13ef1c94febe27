//! Mesa Admin Server - 餐厅运营管理后端
//!
//! # 架构概述
//!
//! 本模块是 Mesa 后端的主入口，提供以下核心功能：
//!
//! - **桌台占用引擎** (`availability`): 人工占用标记 + 订单落桌 + 时段
//!   匹配合成一份占用视图
//! - **消息总线** (`message`): 支持 TCP/Memory 传输的实时事件广播
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! mesa-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── availability/  # 占用状态推导、冲突检查
//! ├── api/           # HTTP 路由和处理器
//! ├── auth/          # 网关身份解析
//! ├── db/            # 数据库层
//! ├── message/       # 消息总线
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod availability;
pub mod core;
pub mod db;
pub mod message;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, Identity};
pub use availability::{AvailabilityResolver, ReservationConflictGuard, TableStatus};
pub use core::{Config, Server, ServerState};
pub use message::{BusMessage, EventType, MessageBus};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(None, config.log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
    __  ___
   /  |/  /__  _________ _
  / /|_/ / _ \/ ___/ __ `/
 / /  / /  __(__  ) /_/ /
/_/  /_/\___/____/\__,_/
    "#
    );
}
