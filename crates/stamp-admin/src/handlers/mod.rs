//! HTTP 请求处理器

pub mod cards;
pub mod health;
pub mod memberships;
pub mod reports;
pub mod settings;
