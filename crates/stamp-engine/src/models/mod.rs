//! 集点引擎数据模型
//!
//! 定义顾客、会员、会员卡、周期、印花、计划参数和报表等实体

pub mod card;
pub mod cycle;
pub mod detail;
pub mod enums;
pub mod membership;
pub mod report;
pub mod settings;

pub use card::{CARD_NUMBER_PREFIX, CardSelector, MembershipCard, generate_card_number};
pub use cycle::{
    CYCLE_SIZE, CycleSummary, CycleWithStamps, MAX_TRANSACTION_AMOUNT, NewStamp, Stamp, StampCycle,
};
pub use detail::MembershipDetail;
pub use enums::{MembershipStatus, RewardType};
pub use membership::{
    Customer, DAYS_PER_MONTH, Membership, NewCustomer, NewMembership, local_today,
};
pub use report::{DailyTransactions, DateRange, RewardReport, SummaryReport, TransactionReport};
pub use settings::{ProgramSettings, SettingsPatch};
