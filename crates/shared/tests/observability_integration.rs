//! 可观测性模块集成测试
//!
//! 验证指标记录、请求 ID 中间件与配置默认值在未初始化导出器时也能正常工作。

use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
};
use tower::ServiceExt;

use stamp_shared::observability::{
    ObservabilityConfig, ObservabilityGuard,
    metrics::{
        record_card_activated, record_card_replaced, record_http_request, record_reward_redeemed,
        record_stamp_awarded, record_stamp_skipped,
    },
    middleware::{RequestId, http_tracing, request_id},
    tracing::init_for_tests,
};

mod metrics_tests {
    use super::*;

    /// 未安装 recorder 时记录指标不应 panic
    #[test]
    fn test_record_without_exporter() {
        record_http_request("GET", "/api/memberships/lookup", 200, 0.012);
        record_http_request("POST", "/api/memberships/{id}/stamps", 409, 0.3);
        record_stamp_awarded("free_drink", 0.05);
        record_stamp_awarded("voucher_50k", 0.08);
        record_stamp_skipped("below_threshold");
        record_reward_redeemed("voucher_50k");
        record_card_activated();
        record_card_replaced(true);
        record_card_replaced(false);
    }

    #[test]
    fn test_record_edge_values() {
        record_http_request("", "", 0, 0.0);
        record_http_request("DELETE", "/health", 599, f64::MAX);
        record_stamp_awarded("", 0.0);
    }
}

mod middleware_tests {
    use super::*;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(id): Extension<RequestId>| async move { id.as_str().to_string() }),
            )
            .layer(middleware::from_fn(http_tracing))
            .layer(middleware::from_fn(request_id))
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_request_id_is_generated_when_missing() {
        let response = app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(header).is_ok());
    }

    #[test]
    fn test_unknown_route_still_tagged() {
        let response = tokio_test::block_on(
            app().oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap()),
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn test_request_id_clone() {
        let id = RequestId("abc".to_string());
        let cloned = id.clone();
        assert_eq!(cloned.as_str(), "abc");
        assert!(format!("{:?}", id).contains("abc"));
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "unknown-service");
        assert!(config.metrics_enabled);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("stamp-admin");
        assert_eq!(config.service_name, "stamp-admin");
        assert_eq!(config.metrics_port, 9090);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ObservabilityConfig =
            serde_json::from_str(r#"{"json_logs": true, "metrics_port": 9191}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.metrics_port, 9191);
        assert_eq!(config.log_level, "info");
    }
}

mod guard_tests {
    use super::*;

    #[test]
    fn test_empty_guard_drops_cleanly() {
        let guard = ObservabilityGuard::empty();
        drop(guard);
    }

    #[test]
    fn test_init_for_tests_is_idempotent() {
        init_for_tests();
        init_for_tests();
        tracing::info!("tracing initialized twice");
    }
}
