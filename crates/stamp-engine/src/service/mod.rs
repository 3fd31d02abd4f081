//! 业务服务层
//!
//! 每个服务持有存储的 `Arc`，每次操作开启独立事务。
//! 周期账本函数（[`ledger`]）在调用方事务内执行，供各服务复用。

mod award_service;
mod card_service;
pub mod dto;
pub mod ledger;
mod membership_service;
mod query_service;
mod redemption_service;
mod report_service;
mod settings_service;

pub use award_service::StampAwardService;
pub use card_service::CardService;
pub use dto::{ActivateCardRequest, AwardStampRequest, ReplaceCardRequest};
pub use membership_service::MembershipService;
pub use query_service::{QueryService, normalize_identifier};
pub use redemption_service::RedemptionService;
pub use report_service::ReportService;
pub use settings_service::{SettingsCache, SettingsService};
