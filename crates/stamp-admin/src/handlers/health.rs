//! 存活探针

use axum::Json;

/// 服务进程正常即返回 ok
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stamp-admin"
    }))
}
