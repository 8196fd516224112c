//! Entity module - SeaORM 实体定义
//!
//! 包含层级引擎使用的数据库表模型

pub mod department;
pub mod user;
