//! 消息总线 - 桌台事件的实时广播
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                           │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<BusMessage>                    │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               │    Transport Trait  │  ◄── 可插拔实现
//!               └──────────┬──────────┘
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!         TcpTransport          MemoryTransport
//!         (网络观察端)           (同进程/测试)
//!
//! Server ──▶ publish() ──▶ tx ──▶ Connected Observers
//! ```
//!
//! 广播是单向的：观察端只收不发，发布端发完即忘。没有确认、没有重试、
//! 没有跨请求的顺序保证；没有观察端连接时 publish 是空操作。

pub mod bus;
pub mod tcp_server;
pub mod transport;

pub use bus::{ConnectedClient, MessageBus, TransportConfig};
pub use transport::{MemoryTransport, TcpTransport, Transport};

pub use shared::message::{BusMessage, EventType, TableAction, TableEventPayload};
