//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册通用指标描述
///
/// 这些描述会出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("stamps_awarded_total", "Total number of stamps awarded");
    metrics::describe_counter!(
        "stamp_award_skipped_total",
        "Transactions that did not earn a stamp"
    );
    metrics::describe_histogram!(
        "stamp_award_duration_seconds",
        "Stamp award transaction duration in seconds"
    );

    metrics::describe_counter!("rewards_redeemed_total", "Total number of rewards redeemed");
    metrics::describe_counter!("cards_activated_total", "Total number of card activations");
    metrics::describe_counter!("cards_replaced_total", "Total number of card replacements");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录印花发放
#[inline]
pub fn record_stamp_awarded(reward_type: &str, duration_secs: f64) {
    metrics::counter!("stamps_awarded_total", "reward_type" => reward_type.to_string())
        .increment(1);
    metrics::histogram!("stamp_award_duration_seconds").record(duration_secs);
}

/// 记录未发放印花的交易及原因（inactive / below_threshold）
#[inline]
pub fn record_stamp_skipped(reason: &'static str) {
    metrics::counter!("stamp_award_skipped_total", "reason" => reason).increment(1);
}

/// 记录奖励核销
#[inline]
pub fn record_reward_redeemed(reward_type: &str) {
    metrics::counter!("rewards_redeemed_total", "reward_type" => reward_type.to_string())
        .increment(1);
}

/// 记录卡片激活
#[inline]
pub fn record_card_activated() {
    metrics::counter!("cards_activated_total").increment(1);
}

/// 记录换卡
#[inline]
pub fn record_card_replaced(generated: bool) {
    metrics::counter!("cards_replaced_total", "generated" => generated.to_string()).increment(1);
}
