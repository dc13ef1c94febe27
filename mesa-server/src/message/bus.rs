//! 消息总线核心实现
//!
//! 职责：
//! - 事件发布 (publish, 发完即忘)
//! - 观察端管理 (注册、注销、列表)
//! - 传输层抽象 (TCP / Memory)

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::transport::{MemoryTransport, Transport};
use crate::utils::AppError;

/// Configuration for the transport layer
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channel (default: 1024)
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8091".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// 已连接观察端的描述 (健康检查/诊断用)
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedClient {
    pub id: String,
    pub addr: Option<String>,
}

/// 消息总线 - 桌台事件广播给所有已连接观察端
///
/// 发布路径上不做任何阻塞等待：`broadcast::Sender::send` 是同步非阻塞的，
/// 没有订阅者时发布就是空操作。
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 服务器到观察端的广播通道
    tx: broadcast::Sender<BusMessage>,
    /// 传输层配置
    pub(crate) config: TransportConfig,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 已连接的观察端 (Client ID -> Transport)
    pub(crate) clients: Arc<DashMap<String, Arc<dyn Transport>>>,
}

impl MessageBus {
    /// 创建默认配置的消息总线
    pub fn new() -> Self {
        Self::from_config(TransportConfig::default())
    }

    /// 从配置创建消息总线
    pub fn from_config(config: TransportConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity);
        Self {
            tx,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    /// 创建指定容量的消息总线
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(TransportConfig {
            channel_capacity: capacity,
            ..Default::default()
        })
    }

    /// 发布消息 (服务器 -> 所有观察端)
    ///
    /// 没有观察端时返回 Err(no receivers)，调用方按空操作忽略即可。
    pub fn publish(&self, msg: BusMessage) -> Result<(), AppError> {
        self.tx
            .send(msg)
            .map(|_| ())
            .map_err(|e| AppError::internal(e.to_string()))
    }

    /// 订阅服务器广播 (进程内观察端)
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    /// 获取内存传输层 (同进程通信/测试)
    pub fn memory_transport(&self) -> MemoryTransport {
        MemoryTransport::new(&self.tx)
    }

    /// 获取广播发送端 (高级用法)
    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.tx
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 获取已连接观察端列表
    pub fn get_connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients
            .iter()
            .map(|entry| ConnectedClient {
                id: entry.key().clone(),
                addr: entry.value().peer_addr(),
            })
            .collect()
    }

    /// 优雅关闭消息总线
    ///
    /// 取消所有运行中的任务，包括 TCP 服务器
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
