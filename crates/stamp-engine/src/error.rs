//! 集点引擎错误类型
//!
//! 定义引擎层的业务错误和系统错误。"未发放印花"、"无可核销奖励"不是错误，
//! 由各操作以 `None` 返回。

use thiserror::Error;

/// 错误分类，供 API 层映射状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    System,
}

/// 集点引擎错误类型
#[derive(Debug, Error)]
pub enum LoyaltyError {
    // === 资源不存在 ===
    #[error("会员不存在: {0}")]
    MembershipNotFound(String),

    #[error("会员卡不存在: {0}")]
    CardNotFound(String),

    // === 冲突 ===
    #[error("会员卡已被绑定: {0}")]
    CardAlreadyAssigned(String),

    #[error("卡号已存在: {0}")]
    CardNumberTaken(String),

    #[error("重复的小票号: {0}")]
    DuplicateReceipt(String),

    #[error("卡号和卡片 ID 只能提供一个")]
    AmbiguousCardSelector,

    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    // === 参数错误 ===
    #[error("无效的奖励类型: {0}")]
    InvalidRewardType(String),

    #[error("缺少必填字段: {0}")]
    MissingRequiredField(&'static str),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 集点引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

/// 唯一约束名，与 migrations/ 中的定义保持一致
pub(crate) mod constraints {
    pub const STAMP_RECEIPT: &str = "uq_stamps_receipt";
    pub const CARD_NUMBER: &str = "uq_cards_card_number";
    pub const MEMBERSHIP_CARD_NUMBER: &str = "uq_memberships_card_number";
}

impl LoyaltyError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MembershipNotFound(_) | Self::CardNotFound(_) => ErrorKind::NotFound,
            Self::CardAlreadyAssigned(_)
            | Self::CardNumberTaken(_)
            | Self::DuplicateReceipt(_)
            | Self::AmbiguousCardSelector
            | Self::ConcurrencyConflict => ErrorKind::Conflict,
            Self::InvalidRewardType(_) | Self::MissingRequiredField(_) | Self::Validation(_) => {
                ErrorKind::InvalidInput
            }
            Self::Database(_) | Self::Internal(_) => ErrorKind::System,
        }
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MembershipNotFound(_) => "MEMBERSHIP_NOT_FOUND",
            Self::CardNotFound(_) => "CARD_NOT_FOUND",
            Self::CardAlreadyAssigned(_) => "CARD_ALREADY_ASSIGNED",
            Self::CardNumberTaken(_) => "CARD_NUMBER_TAKEN",
            Self::DuplicateReceipt(_) => "DUPLICATE_RECEIPT",
            Self::AmbiguousCardSelector => "AMBIGUOUS_CARD_SELECTOR",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::InvalidRewardType(_) => "INVALID_REWARD_TYPE",
            Self::MissingRequiredField(_) => "MISSING_REQUIRED_FIELD",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 将唯一约束冲突（SQLSTATE 23505）转换为业务错误
    ///
    /// `subject` 为冲突字段的值（小票号、卡号），用于错误信息。
    /// 非唯一约束冲突原样返回 `Database`。
    pub(crate) fn from_unique_violation(err: sqlx::Error, subject: &str) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                db.constraint().map(str::to_string)
            }
            _ => return Self::Database(err),
        };

        match constraint.as_deref() {
            Some(constraints::STAMP_RECEIPT) => Self::DuplicateReceipt(subject.to_string()),
            Some(constraints::CARD_NUMBER) | Some(constraints::MEMBERSHIP_CARD_NUMBER) => {
                Self::CardNumberTaken(subject.to_string())
            }
            // 周期号、印花序号、手机号等并发创建冲突
            _ => Self::ConcurrencyConflict,
        }
    }
}
