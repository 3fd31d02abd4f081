//! 统一可观测性模块
//!
//! 提供 metrics、logging 的统一初始化和管理。
//! 所有服务通过单一入口点配置可观测性，确保一致的指标命名。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志和指标的来源
    pub service_name: String,

    /// 是否启用 Prometheus 指标导出
    pub metrics_enabled: bool,

    /// Prometheus 指标导出端口
    pub metrics_port: u16,

    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown-service".to_string(),
            metrics_enabled: true,
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// 注入服务名（配置文件中通常不单独填写）
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }
}

/// 可观测性资源守卫
///
/// 持有指标导出服务的生命周期，drop 时停止导出。
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            _metrics_handle: None,
        }
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. 日志（tracing subscriber）
/// 2. Metrics（Prometheus 指标，可关闭）
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    info!(
        service = %config.service_name,
        metrics_enabled = config.metrics_enabled,
        metrics_port = %config.metrics_port,
        "Observability initialized"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init(config).await?)
    } else {
        None
    };

    Ok(ObservabilityGuard {
        _metrics_handle: metrics_handle,
    })
}
