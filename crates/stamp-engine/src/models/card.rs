//! 实体会员卡定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LoyaltyError, Result};

/// 生成卡号的前缀
pub const CARD_NUMBER_PREFIX: &str = "CARD-";

/// 随机卡号部分的长度
const CARD_TOKEN_LEN: usize = 10;

/// 实体会员卡
///
/// 要么未绑定（`is_assigned = false` 且 `membership_id` 为空），要么独占绑定一个会员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MembershipCard {
    pub id: i64,
    /// 对外可扫描的不透明标识（二维码内容）
    pub public_id: Uuid,
    pub card_number: String,
    pub is_assigned: bool,
    #[sqlx(default)]
    pub membership_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipCard {
    /// 是否可以绑定到新会员
    pub fn is_available(&self) -> bool {
        !self.is_assigned && self.membership_id.is_none()
    }
}

/// 会员卡定位方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardSelector {
    CardNumber(String),
    PublicId(Uuid),
}

impl CardSelector {
    /// 由可选的卡号 / 卡片 ID 构造
    ///
    /// 两者同时提供返回 `AmbiguousCardSelector`，都未提供返回 `Ok(None)`。
    pub fn from_parts(card_number: Option<&str>, public_id: Option<Uuid>) -> Result<Option<Self>> {
        let card_number = card_number.map(str::trim).filter(|s| !s.is_empty());
        match (card_number, public_id) {
            (Some(_), Some(_)) => Err(LoyaltyError::AmbiguousCardSelector),
            (Some(number), None) => Ok(Some(Self::CardNumber(number.to_string()))),
            (None, Some(id)) => Ok(Some(Self::PublicId(id))),
            (None, None) => Ok(None),
        }
    }

    /// 解析扫码或手输的卡片标识
    ///
    /// 可解析为 UUID 的视为 public_id，否则视为卡号
    pub fn parse(identifier: &str) -> Option<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        match Uuid::parse_str(identifier) {
            Ok(id) => Some(Self::PublicId(id)),
            Err(_) => Some(Self::CardNumber(identifier.to_string())),
        }
    }
}

impl std::fmt::Display for CardSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CardNumber(number) => write!(f, "card_number={}", number),
            Self::PublicId(id) => write!(f, "public_id={}", id),
        }
    }
}

/// 生成候选卡号：`CARD-` + 10 位大写十六进制
///
/// 调用方负责唯一性检查，冲突时重新生成
pub fn generate_card_number() -> String {
    let token = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}{}", CARD_NUMBER_PREFIX, &token[..CARD_TOKEN_LEN])
}
