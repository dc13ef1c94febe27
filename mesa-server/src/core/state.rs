use std::sync::Arc;

use dashmap::DashMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::message::{BusMessage, TableAction, TableEventPayload};

use crate::availability::{AvailabilityResolver, ReservationConflictGuard};
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{DiningTableRepository, OrderRepository, RestaurantRepository};
use crate::message::MessageBus;
use crate::utils::{AppError, AppResult};

/// 桌台事件的资源名 (固定的广播主题)
const TABLE_RESOURCE: &str = "dining_table";

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每种资源类型维护独立的版本号，支持原子递增。
///
/// # 使用场景
///
/// 用于 broadcast_table_event 时自动生成递增的版本号，
/// 确保观察端可以通过版本号判断数据新旧。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    /// 创建空的版本管理器
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值
    ///
    /// 如果资源不存在，从 0 开始递增（返回 1）
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定资源的当前版本号
    ///
    /// 如果资源不存在，返回 0
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | message_bus | Arc<MessageBus> | 消息总线 |
/// | resource_versions | Arc<ResourceVersions> | 资源版本管理 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 消息总线
    pub message_bus: Arc<MessageBus>,
    /// 资源版本管理器 (用于 broadcast_table_event 自动递增版本号)
    pub resource_versions: Arc<ResourceVersions>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database/mesa.db)
    /// 3. 消息总线
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {e}")))?;

        let db_path = config.database_dir().join("mesa.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        Ok(Self::with_db(config.clone(), db_service.db))
    }

    /// 以内存数据库初始化 (测试)
    pub async fn initialize_in_memory(config: &Config) -> AppResult<Self> {
        let db_service = DbService::new_in_memory().await?;
        Ok(Self::with_db(config.clone(), db_service.db))
    }

    fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let message_bus = Arc::new(MessageBus::from_config(config.transport_config()));
        Self {
            config,
            db,
            message_bus,
            resource_versions: Arc::new(ResourceVersions::new()),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 消息总线 TCP 服务器 (网络观察端接入)
    pub fn start_background_tasks(&self) {
        let bus = self.message_bus.clone();
        tokio::spawn(async move {
            if let Err(e) = bus.start_tcp_server().await {
                tracing::error!("Message bus TCP server failed: {}", e);
            }
        });
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取消息总线
    pub fn message_bus(&self) -> &Arc<MessageBus> {
        &self.message_bus
    }

    /// 桌台 repository
    pub fn table_repo(&self) -> DiningTableRepository {
        DiningTableRepository::new(self.db.clone())
    }

    /// 订单 repository (只读投影)
    pub fn order_repo(&self) -> OrderRepository {
        OrderRepository::new(self.db.clone())
    }

    /// 餐厅 repository (只读)
    pub fn restaurant_repo(&self) -> RestaurantRepository {
        RestaurantRepository::new(self.db.clone())
    }

    /// 占用状态解析器
    pub fn resolver(&self) -> AvailabilityResolver {
        AvailabilityResolver::new(self.db.clone(), self.config.unified_occupancy_counts)
    }

    /// 冲突检查
    pub fn conflict_guard(&self) -> ReservationConflictGuard {
        ReservationConflictGuard::new(self.db.clone())
    }

    /// 广播桌台事件
    ///
    /// 向所有已连接观察端广播一次桌台操作的结果，载荷与 HTTP 响应体
    /// 一致。发完即忘：发布不阻塞响应路径，失败 (通常是没有观察端)
    /// 只记 debug 日志，绝不影响请求结果。
    ///
    /// # 参数
    /// - `actor`: 触发操作的用户显示名 (匿名为空字符串)
    /// - `action`: 操作标签
    /// - `id`: 资源 ID (列表类操作为 None)
    /// - `data`: 响应数据
    pub fn broadcast_table_event<T: serde::Serialize>(
        &self,
        actor: String,
        action: TableAction,
        id: Option<String>,
        data: Option<&T>,
    ) {
        let version = self.resource_versions.increment(TABLE_RESOURCE);
        let payload = TableEventPayload {
            resource: TABLE_RESOURCE.to_string(),
            action,
            actor,
            version,
            id,
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        if let Err(e) = self.message_bus.publish(BusMessage::table_event(&payload)) {
            tracing::debug!("Table event dropped (no observers connected): {}", e);
        }
    }
}
