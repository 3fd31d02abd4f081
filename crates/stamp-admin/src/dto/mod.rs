//! DTO 模块
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

pub use request::{
    ActivateCardBody, AwardStampBody, CardLookupQuery, DateRangeQuery, IssueCardBody,
    LookupQuery, RedeemBody, ReplaceCardBody, SetStatusBody, SummaryQuery,
};
pub use response::{ApiResponse, NOTHING_TO_REDEEM, NO_STAMP_AWARDED};
