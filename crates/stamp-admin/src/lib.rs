//! 集点卡管理服务
//!
//! 面向收银台和运营后台的 REST API，是集点引擎之上的一层薄封装。
//!
//! ## 核心功能
//!
//! - **会员**：开卡、查找、历史、发放印花、核销奖励、换卡、冻结/解冻
//! - **会员卡**：发卡、查卡
//! - **计划参数**：读取与部分更新
//! - **报表**：会员概览、奖励使用、交易汇总
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型与 HTTP 映射
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use dto::ApiResponse;
pub use error::{AdminError, Result};
pub use routes::build_router;
pub use state::AppState;
