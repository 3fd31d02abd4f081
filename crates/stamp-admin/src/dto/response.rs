//! 响应 DTO 定义

use serde::Serialize;

/// 未发放印花时的提示
pub const NO_STAMP_AWARDED: &str = "no stamp awarded";

/// 没有可核销奖励时的提示
pub const NOTHING_TO_REDEEM: &str = "no reward available";

/// API 统一响应
///
/// `data` 总是出现在响应体中，业务上的"未发生"以 `null` 表示
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应，数据可能为空
    pub fn optional(data: Option<T>, empty_message: &str) -> Self {
        match data {
            Some(data) => Self::success(data),
            None => Self {
                success: true,
                code: "SUCCESS".to_string(),
                message: empty_message.to_string(),
                data: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_data_serializes_as_null() {
        let response: ApiResponse<i32> = ApiResponse::optional(None, NO_STAMP_AWARDED);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "code": "SUCCESS",
                "message": "no stamp awarded",
                "data": null
            })
        );
    }

    #[test]
    fn test_success_wraps_data() {
        let value = serde_json::to_value(ApiResponse::success(json!({"id": 1}))).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 1);
    }
}
