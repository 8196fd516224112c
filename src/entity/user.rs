//! User entity - 用户表
//!
//! 表名: org_user. 仅包含层级引擎需要的字段 (职位与所属部门)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "org_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 用户名 (唯一)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub username: String,

    /// 全名
    #[sea_orm(column_type = "String(Some(64))")]
    pub full_name: String,

    /// 职位层级, 例如 senior_manager / middle_manager / staff
    #[sea_orm(column_type = "String(Some(32))")]
    pub position: String,

    /// 所属部门ID
    #[sea_orm(nullable)]
    pub department_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Name shown in department views, falling back to the username
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}
