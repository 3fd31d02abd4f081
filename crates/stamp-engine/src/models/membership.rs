//! 会员与顾客实体定义

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::MembershipStatus;

/// 会员期按每月 30 天折算
pub const DAYS_PER_MONTH: u64 = 30;

/// 门店本地日期
///
/// 会员有效期按本地日历日判定
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// 顾客
///
/// 以手机号作为身份标识
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    /// 手机号（唯一）
    pub phone: String,
    #[sqlx(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// 计算补全后的联系信息
    ///
    /// 只填补空缺字段，已有的非空值不会被覆盖。无需更新时返回 `None`。
    pub fn backfill(&self, name: &str, email: Option<&str>) -> Option<(String, Option<String>)> {
        let name_missing = self.name.trim().is_empty() && !name.trim().is_empty();
        let email_missing = self.email.as_deref().is_none_or(|e| e.trim().is_empty())
            && email.is_some_and(|e| !e.trim().is_empty());

        if !name_missing && !email_missing {
            return None;
        }

        let new_name = if name_missing {
            name.trim().to_string()
        } else {
            self.name.clone()
        };
        let new_email = if email_missing {
            email.map(|e| e.trim().to_string())
        } else {
            self.email.clone()
        };
        Some((new_name, new_email))
    }
}

/// 新建顾客
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// 会员
///
/// 有效期为闭区间 [start_date, end_date]，card_number 为绑定时卡号的冗余拷贝
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: i64,
    pub customer_id: i64,
    /// 当前绑定卡号（换卡时更新）
    pub card_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// 计算会员到期日
    pub fn compute_end_date(start_date: NaiveDate, duration_months: i32) -> NaiveDate {
        let days = u64::try_from(duration_months).unwrap_or(0) * DAYS_PER_MONTH;
        start_date
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX)
    }

    /// 指定日期是否处于有效状态
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.status == MembershipStatus::Active
            && self.start_date <= today
            && today <= self.end_date
    }

    /// 惰性过期检查
    ///
    /// 超过 end_date 的非冻结会员应转为 `Expired`；返回需要写入的新状态
    pub fn refreshed_status(&self, today: NaiveDate) -> Option<MembershipStatus> {
        match self.status {
            MembershipStatus::Active if today > self.end_date => Some(MembershipStatus::Expired),
            _ => None,
        }
    }
}

/// 新建会员
#[derive(Debug, Clone)]
pub struct NewMembership {
    pub customer_id: i64,
    pub card_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
