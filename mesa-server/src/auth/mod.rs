//! 请求身份层
//!
//! 认证和授权由上游网关完成；这里只读取网关注入的身份头，
//! 把 [`Identity`] 挂到请求扩展上供 handler 使用。
//!
//! 身份缺失不是错误：事件广播的 actor 字段留空并在本地记一条诊断日志，
//! 请求照常处理。

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// 网关注入的用户 ID 头
pub const USER_ID_HEADER: &str = "x-user-id";
/// 网关注入的用户显示名头
pub const USER_NAME_HEADER: &str = "x-user-name";

/// 已认证用户 (由上游网关验证)
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// 用户 ID
    pub id: String,
    /// 显示名
    pub name: String,
}

/// 请求身份，总是存在于请求扩展中 (用户可能缺失)
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user: Option<CurrentUser>,
}

impl Identity {
    /// 事件广播用的 actor 字段
    ///
    /// 匿名请求返回空字符串，只记日志，绝不让请求失败。
    pub fn actor(&self) -> String {
        match &self.user {
            Some(user) => user.name.clone(),
            None => {
                tracing::debug!("request carries no authenticated user, event actor left empty");
                String::new()
            }
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 身份中间件：从网关头解析用户并注入请求扩展
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers();
    let user = match (
        header_value(headers, USER_ID_HEADER),
        header_value(headers, USER_NAME_HEADER),
    ) {
        (Some(id), name) => Some(CurrentUser {
            name: name.unwrap_or_else(|| id.clone()),
            id,
        }),
        _ => None,
    };

    request.extensions_mut().insert(Identity { user });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_identity_yields_empty_actor() {
        let identity = Identity::default();
        assert_eq!(identity.actor(), "");
    }

    #[test]
    fn named_identity_yields_display_name() {
        let identity = Identity {
            user: Some(CurrentUser {
                id: "u1".to_string(),
                name: "Ada".to_string(),
            }),
        };
        assert_eq!(identity.actor(), "Ada");
    }
}
