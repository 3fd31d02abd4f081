//! 管理服务错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stamp_engine::{ErrorKind, LoyaltyError};

/// 管理服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Engine(#[from] LoyaltyError),

    #[error("参数验证失败: {0}")]
    Validation(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Engine(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::System => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Engine(err) => err.error_code(),
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }

    fn is_system(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if self.is_system() {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "请求被拒绝");
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 管理服务 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AdminError::from(LoyaltyError::MembershipNotFound("1".into())),
                StatusCode::NOT_FOUND,
                "MEMBERSHIP_NOT_FOUND",
            ),
            (
                AdminError::from(LoyaltyError::DuplicateReceipt("R-1".into())),
                StatusCode::CONFLICT,
                "DUPLICATE_RECEIPT",
            ),
            (
                AdminError::from(LoyaltyError::MissingRequiredField("phone")),
                StatusCode::BAD_REQUEST,
                "MISSING_REQUIRED_FIELD",
            ),
            (
                AdminError::from(LoyaltyError::Internal("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
            (
                AdminError::Validation("amount".into()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_engine_message_passes_through() {
        let err = AdminError::from(LoyaltyError::CardNotFound("CARD-X".into()));
        assert_eq!(err.to_string(), "会员卡不存在: CARD-X");
    }
}
