use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// 普通信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ==================== Table Actions ====================

/// 桌台操作标签
///
/// 每个桌台接口处理完请求后都会带着对应的标签广播一次事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableAction {
    GetAll,
    GetByRestaurant,
    Get,
    Add,
    Update,
    Delete,
    GetAvailableByRestaurant,
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAll => write!(f, "GET_ALL"),
            Self::GetByRestaurant => write!(f, "GET_BY_RESTAURANT"),
            Self::Get => write!(f, "GET"),
            Self::Add => write!(f, "ADD"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::GetAvailableByRestaurant => write!(f, "GET_AVAILABLE_BY_RESTAURANT"),
        }
    }
}

// ==================== Payloads ====================

/// 握手载荷 (观察端 -> 服务端)
///
/// 包含客户端的协议版本信息，用于服务端进行版本校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称/标识
    pub client_name: Option<String>,
    /// 客户端唯一标识 (UUID)
    pub client_id: Option<String>,
}

/// 通知载荷 (服务端 -> 观察端)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 标题
    pub title: String,
    /// 消息内容
    pub message: String,
    /// 通知级别
    pub level: NotificationLevel,
    /// 附加数据 (JSON)
    pub data: Option<serde_json::Value>,
}

impl NotificationPayload {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Info,
            data: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Warning,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// 桌台事件载荷 (服务端 -> 所有观察端)
///
/// 每次桌台接口处理完一个请求后广播。`data` 与 HTTP 响应体一致，
/// 观察端可以直接用它刷新本地视图而不必再拉一次接口。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEventPayload {
    /// 资源类型 (固定为 "dining_table")
    pub resource: String,
    /// 操作标签
    pub action: TableAction,
    /// 触发操作的用户 (匿名请求为空字符串)
    pub actor: String,
    /// 版本号 (单调递增，观察端据此判断数据新旧)
    pub version: u64,
    /// 资源 ID (列表类操作为 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 资源数据 (与 HTTP 响应体一致)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// 通用响应载荷 (服务端 -> 观察端)
///
/// 用于响应握手等请求。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// 是否成功
    pub success: bool,
    /// 响应消息/错误描述
    pub message: String,
    /// 错误代码 (可选, 仅在失败时有用)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ResponsePayload {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code,
        }
    }
}
