//! 列表查询类型
//!
//! 提供统一的分页请求和分页响应结构。

use serde::{Deserialize, Serialize};

/// 分页查询参数 (query string)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    /// 页码 (从 1 开始)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// 每页数量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// 排序方向 ("asc" | "desc"，默认 desc)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl PageQuery {
    /// 页码，缺省为第 1 页
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// 每页数量，缺省 10
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(10).max(1)
    }

    /// 结果偏移量
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }

    /// 是否升序排序 (默认降序)
    pub fn ascending(&self) -> bool {
        self.sort.as_deref() == Some("asc")
    }
}

/// 分页响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// 数据列表
    pub data: Vec<T>,
    /// 总记录数
    pub total: u64,
    /// 当前页码
    pub page: u32,
    /// 每页数量
    pub limit: u32,
    /// 总页数
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit > 0 {
            ((total as f64) / (limit as f64)).ceil() as u32
        } else {
            1
        };

        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// 创建单页响应 (不分页时使用)
    pub fn single_page(data: Vec<T>) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            total,
            page: 1,
            limit: total as u32,
            total_pages: 1,
        }
    }
}
