//! Department entity - 部门表
//!
//! 表名: org_department

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// 列宽 (字符数), 与下方 column_type 保持一致
pub const NAME_WIDTH: usize = 64;
pub const CODE_WIDTH: usize = 32;
pub const STATUS_WIDTH: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "org_department")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 部门名称 (唯一, 不区分大小写)
    #[sea_orm(column_type = "String(Some(64))", unique)]
    pub name: String,

    /// 部门编码 (唯一, 不区分大小写)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub code: String,

    /// 部门描述
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// 父部门ID (None 表示顶级部门)
    #[sea_orm(nullable)]
    pub parent_id: Option<i64>,

    /// 部门负责人 (用户ID, 一人至多负责一个部门)
    #[sea_orm(nullable, unique)]
    pub manager_id: Option<i64>,

    /// 部门级别, 顶级部门为 1
    pub level: i32,

    /// 状态: active / inactive
    #[sea_orm(column_type = "String(Some(16))")]
    pub status: String,

    /// 创建时间 (Unix 时间戳)
    pub created_at: i64,

    /// 更新时间 (Unix 时间戳)
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 父子关系通过内存快照按ID解析, 不使用 Linked

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Active model with every column marked as changed
    pub fn into_update(self) -> ActiveModel {
        ActiveModel {
            id: Set(self.id),
            name: Set(self.name),
            code: Set(self.code),
            description: Set(self.description),
            parent_id: Set(self.parent_id),
            manager_id: Set(self.manager_id),
            level: Set(self.level),
            status: Set(self.status),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }
}
