//! 周期账本
//!
//! 周期的获取/创建、印花追加和会员状态刷新。这里的函数都在调用方的事务中执行，
//! 调用方须先锁定会员行（[`LoyaltyTx::lock_membership`]），同一会员的周期号与
//! 印花序号计算因此不会并发交错。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{LoyaltyError, Result};
use crate::models::{
    CYCLE_SIZE, CycleSummary, CycleWithStamps, Membership, MembershipDetail, NewStamp,
    ProgramSettings, Stamp, StampCycle,
};
use crate::repository::LoyaltyTx;

/// 获取会员当前的未关闭周期，不存在时创建
///
/// 取按周期号排序后最后一个未关闭的周期；若全部已关闭，以最大周期号 + 1
/// （没有周期时为 1）创建新周期。
pub async fn get_or_create_active_cycle<T: LoyaltyTx>(
    tx: &mut T,
    membership_id: i64,
) -> Result<StampCycle> {
    let cycles = tx.list_cycles(membership_id).await?;
    if let Some(open) = cycles.iter().rev().find(|c| !c.is_closed) {
        return Ok(open.clone());
    }

    let next_number = cycles.last().map_or(1, |c| c.cycle_number + 1);
    let cycle = tx.insert_cycle(membership_id, next_number).await?;
    debug!(
        membership_id = membership_id,
        cycle_number = cycle.cycle_number,
        "已创建新周期"
    );
    Ok(cycle)
}

/// 在会员当前周期追加一枚印花
///
/// 周期已满（逻辑上 10 格已用完但未关闭）时先关闭并开启新周期；
/// 第 10 枚印花写入后立即关闭周期，下一次发放时再按需开启新周期。
pub async fn append_stamp<T: LoyaltyTx>(
    tx: &mut T,
    membership_id: i64,
    settings: &ProgramSettings,
    pos_receipt_number: Option<String>,
    transaction_amount: Option<Decimal>,
) -> Result<Stamp> {
    let mut cycle = get_or_create_active_cycle(tx, membership_id).await?;
    let mut next_number = tx.count_stamps(cycle.id).await? + 1;

    if next_number > i64::from(CYCLE_SIZE) {
        info!(
            membership_id = membership_id,
            cycle_number = cycle.cycle_number,
            "周期已满但未关闭，关闭后开启新周期"
        );
        tx.close_cycle(cycle.id).await?;
        cycle = get_or_create_active_cycle(tx, membership_id).await?;
        next_number = tx.count_stamps(cycle.id).await? + 1;
        if next_number > i64::from(CYCLE_SIZE) {
            return Err(LoyaltyError::Internal(format!(
                "会员 {} 存在多个已满的未关闭周期",
                membership_id
            )));
        }
    }

    let number = i32::try_from(next_number)
        .map_err(|_| LoyaltyError::Internal(format!("印花序号越界: {}", next_number)))?;
    let reward_type = settings.reward_for_position(number);

    let stamp = tx
        .insert_stamp(&NewStamp {
            cycle_id: cycle.id,
            number,
            reward_type,
            pos_receipt_number,
            transaction_amount,
        })
        .await?;

    if number == CYCLE_SIZE {
        tx.close_cycle(cycle.id).await?;
        info!(
            membership_id = membership_id,
            cycle_number = cycle.cycle_number,
            "周期已集满并关闭"
        );
    }

    Ok(stamp)
}

/// 惰性过期检查
///
/// 会员超过 end_date 时写入 `Expired` 状态，返回状态是否发生变化
pub async fn refresh_membership_status<T: LoyaltyTx>(
    tx: &mut T,
    membership: &mut Membership,
    today: NaiveDate,
) -> Result<bool> {
    let Some(status) = membership.refreshed_status(today) else {
        return Ok(false);
    };

    tx.update_membership_status(membership.id, status).await?;
    info!(
        membership_id = membership.id,
        end_date = %membership.end_date,
        "会员已过期"
    );
    membership.status = status;
    Ok(true)
}

/// 周期摘要：当前未关闭周期，否则回退到最新周期（`active_only` 时不回退）
pub async fn cycle_summary<T: LoyaltyTx>(
    tx: &mut T,
    membership_id: i64,
    active_only: bool,
) -> Result<CycleSummary> {
    let cycles = tx.list_cycles(membership_id).await?;
    let active = cycles.iter().rev().find(|c| !c.is_closed);
    let cycle = if active_only {
        active
    } else {
        active.or(cycles.last())
    };

    match cycle {
        Some(cycle) => {
            let count = tx.count_stamps(cycle.id).await?;
            Ok(CycleSummary::new(membership_id, cycle.cycle_number, count))
        }
        None => Ok(CycleSummary::empty(membership_id)),
    }
}

/// 组装会员详情
pub async fn load_detail<T: LoyaltyTx>(
    tx: &mut T,
    membership: Membership,
    today: NaiveDate,
) -> Result<MembershipDetail> {
    let customer = tx.get_customer(membership.customer_id).await?.ok_or_else(|| {
        LoyaltyError::Internal(format!(
            "会员 {} 关联的顾客 {} 不存在",
            membership.id, membership.customer_id
        ))
    })?;
    let card = tx.find_card_by_membership(membership.id).await?;

    let cycles = tx.list_cycles(membership.id).await?;
    let mut detailed = Vec::with_capacity(cycles.len());
    for cycle in cycles {
        let stamps = tx.list_stamps(cycle.id).await?;
        detailed.push(CycleWithStamps::new(cycle, stamps));
    }

    Ok(MembershipDetail {
        is_active: membership.is_active_on(today),
        membership,
        customer,
        card,
        cycles: detailed,
    })
}
