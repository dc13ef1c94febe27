use std::path::PathBuf;

use crate::message::TransportConfig;

/// 服务器配置 - 所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/mesa | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | MESSAGE_TCP_PORT | 8091 | TCP 消息总线端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | UNIFIED_OCCUPANCY_COUNTS | false | 聚合计数口径与单桌状态对齐 |
/// | LOG_DIR | (无) | 日志文件目录，缺省只输出到终端 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/mesa HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放数据库等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// TCP 消息总线端口 (观察端直连)
    pub message_tcp_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 占用聚合计数口径：false 保留历史口径 (只数订单占位)，
    /// true 与单桌状态同口径 (booking_status 也计入 occupied)
    pub unified_occupancy_counts: bool,
    /// 日志文件目录 (可选)
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/mesa".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            message_tcp_port: std::env::var("MESSAGE_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8091),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            unified_occupancy_counts: std::env::var("UNIFIED_OCCUPANCY_COUNTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        message_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())
    }

    /// 消息总线传输层配置
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", self.message_tcp_port),
            ..Default::default()
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
