//! 报表仓储
//!
//! 只读聚合查询，直接使用连接池，不参与业务事务

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ReportRepositoryTrait;
use crate::error::Result;
use crate::models::{DailyTransactions, DateRange, MembershipStatus, RewardType};

/// 报表仓储
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepositoryTrait for ReportRepository {
    async fn count_memberships(&self, range: &DateRange, status: MembershipStatus) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM memberships
            WHERE status = $1
              AND ($2::date IS NULL OR (created_at AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (created_at AT TIME ZONE 'UTC')::date <= $3)
            "#,
        )
        .bind(status)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_redeemed(&self, range: &DateRange, reward_type: RewardType) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM stamps
            WHERE reward_type = $1
              AND redeemed_at IS NOT NULL
              AND ($2::date IS NULL OR (redeemed_at AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (redeemed_at AT TIME ZONE 'UTC')::date <= $3)
            "#,
        )
        .bind(reward_type)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_unredeemed(&self, range: &DateRange, reward_type: RewardType) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM stamps
            WHERE reward_type = $1
              AND redeemed_at IS NULL
              AND ($2::date IS NULL OR (created_at AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (created_at AT TIME ZONE 'UTC')::date <= $3)
            "#,
        )
        .bind(reward_type)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn daily_transactions(&self, range: &DateRange) -> Result<Vec<DailyTransactions>> {
        let rows = sqlx::query_as::<_, DailyTransactions>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS date,
                   COUNT(*) AS transaction_count,
                   COALESCE(SUM(transaction_amount), 0) AS total_amount
            FROM stamps
            WHERE transaction_amount IS NOT NULL
              AND ($1::date IS NULL OR (created_at AT TIME ZONE 'UTC')::date >= $1)
              AND ($2::date IS NULL OR (created_at AT TIME ZONE 'UTC')::date <= $2)
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
