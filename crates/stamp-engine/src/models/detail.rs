//! 会员详情聚合视图

use serde::{Deserialize, Serialize};

use super::card::MembershipCard;
use super::cycle::CycleWithStamps;
use super::membership::{Customer, Membership};

/// 会员详情
///
/// 会员、顾客、当前绑定卡片，以及按周期号升序排列的周期与印花
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipDetail {
    #[serde(flatten)]
    pub membership: Membership,
    pub is_active: bool,
    pub customer: Customer,
    pub card: Option<MembershipCard>,
    pub cycles: Vec<CycleWithStamps>,
}
