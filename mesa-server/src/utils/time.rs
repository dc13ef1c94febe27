//! 时间工具函数
//!
//! 所有时刻→时间戳转换统一在 API handler 层完成，
//! repository 层只接收 `i64` Unix millis。

use chrono::{DateTime, Utc};

use super::{AppError, AppResult};

/// 当前时刻 (Unix millis)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 解析 `at` 查询参数为 Unix millis
///
/// 接受两种格式：纯数字 (毫秒时间戳) 或 RFC 3339 时刻。
pub fn parse_instant(raw: &str) -> AppResult<i64> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .map_err(|_| AppError::validation(format!("Invalid instant: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_millis() {
        assert_eq!(parse_instant("1700000000000").unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn parses_rfc3339() {
        let millis = parse_instant("2024-01-01T12:00:00Z").unwrap();
        assert_eq!(millis, 1_704_110_400_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_instant("next tuesday").is_err());
    }
}
