//! 集点卡引擎
//!
//! 会员卡集点计划的核心业务逻辑：
//!
//! - **印花发放**：按交易金额判定是否发放印花，维护 10 格周期的滚动
//! - **周期账本**：周期的获取/创建、关闭，以及奖励位置判定
//! - **会员开卡**：绑定实体卡、创建会员、赠送首枚印花
//! - **奖励核销**：按最早获得优先的策略核销奖励印花
//! - **换卡 / 发卡**：解绑旧卡、绑定或生成新卡
//! - **查询与报表**：会员查找、周期摘要、统计报表
//!
//! 持久化通过 [`repository::LoyaltyStore`] 抽象，提供 PostgreSQL 与内存两种实现。

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{ErrorKind, LoyaltyError, Result};
pub use repository::{LoyaltyStore, LoyaltyTx, MemoryStore, PgLoyaltyStore};
