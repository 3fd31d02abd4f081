//! 基础设施错误类型
//!
//! 数据库连接与迁移等共享组件的错误，业务错误由各服务自行定义。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message() {
        let err = InfraError::from(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().starts_with("数据库错误"));
    }
}
