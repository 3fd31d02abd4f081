//! 数据访问层
//!
//! 提供会员、会员卡、周期、印花、计划参数的事务性访问，以及报表聚合查询

mod memory_store;
mod pg_store;
mod report_repo;
mod traits;

pub use memory_store::{FailPoint, MemoryStats, MemoryStore, MemoryTx};
pub use pg_store::{PgLoyaltyStore, PgLoyaltyTx};
pub use report_repo::ReportRepository;
pub use traits::*;
