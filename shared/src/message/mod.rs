//! 消息总线消息类型定义
//!
//! 这些类型在 mesa-server 和观察端之间共享，用于
//! 进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 消息总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息
    Handshake = 0,
    /// 系统通知
    Notification = 1,
    /// 桌台事件 (增删改查后的广播)
    TableEvent = 2,
    /// 请求响应
    Response = 3,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Notification),
            2 => Ok(EventType::TableEvent),
            3 => Ok(EventType::Response),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Notification => write!(f, "notification"),
            EventType::TableEvent => write!(f, "table_event"),
            EventType::Response => write!(f, "response"),
        }
    }
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub source: Option<String>,
    pub correlation_id: Option<Uuid>,
    pub target: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            source: None,
            correlation_id: None,
            target: None,
            payload,
        }
    }

    /// 设置目标客户端 (单播)
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// 设置关联 ID (用于 RPC 响应)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 创建握手消息
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            EventType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize handshake payload"),
        )
    }

    /// 创建通知消息
    pub fn notification(payload: &NotificationPayload) -> Self {
        Self::new(
            EventType::Notification,
            serde_json::to_vec(payload).expect("Failed to serialize notification"),
        )
    }

    /// 创建桌台事件消息
    pub fn table_event(payload: &TableEventPayload) -> Self {
        Self::new(
            EventType::TableEvent,
            serde_json::to_vec(payload).expect("Failed to serialize table event"),
        )
    }

    /// 创建响应消息
    pub fn response(payload: &ResponsePayload) -> Self {
        Self::new(
            EventType::Response,
            serde_json::to_vec(payload).expect("Failed to serialize response"),
        )
    }

    /// 解析消息载荷
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// 序列化为二进制 (用于网络传输)
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// 从二进制解析
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_roundtrip() {
        for raw in 0u8..=3 {
            let et = EventType::try_from(raw).unwrap();
            assert_eq!(et as u8, raw);
        }
        assert!(EventType::try_from(42).is_err());
    }

    #[test]
    fn test_bus_message_payload_roundtrip() {
        let payload = TableEventPayload {
            resource: "dining_table".to_string(),
            action: TableAction::Add,
            actor: "admin".to_string(),
            version: 7,
            id: Some("dining_table:t1".to_string()),
            data: Some(serde_json::json!({"table_no": 5})),
        };
        let msg = BusMessage::table_event(&payload);
        assert_eq!(msg.event_type, EventType::TableEvent);

        let bytes = msg.to_bytes().unwrap();
        let decoded = BusMessage::from_bytes(&bytes).unwrap();
        let parsed: TableEventPayload = decoded.parse_payload().unwrap();
        assert_eq!(parsed, payload);
    }
}
