//! Persistence contracts used by the hierarchy engine
//!
//! One store value represents one unit of work: reads see the writes issued
//! through it, and nothing becomes visible to other units until `commit`.

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::entity::{department, user};

pub mod database;
pub mod memory;

pub use database::SeaOrmStore;
pub use memory::MemoryStore;

/// Department persistence
#[async_trait]
pub trait DepartmentStore: Send + Sync {
    /// Every department, ascending by id
    async fn load_all_departments(&self) -> Result<Vec<department::Model>, DbErr>;

    async fn find_department_by_id(&self, id: i64) -> Result<Option<department::Model>, DbErr>;

    /// Whether a department other than `exclude_id` already uses `name` or `code`,
    /// compared case-insensitively
    async fn any_department_with_name_or_code(
        &self,
        name: &str,
        code: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbErr>;

    /// Whether a department other than `exclude_id` is managed by `user_id`
    async fn any_department_managed_by(
        &self,
        user_id: i64,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbErr>;

    /// Insert a department, ignoring `model.id`, and return the assigned id
    async fn insert_department(&mut self, model: department::Model) -> Result<i64, DbErr>;

    async fn update_department(&mut self, model: department::Model) -> Result<(), DbErr>;

    async fn delete_department(&mut self, model: department::Model) -> Result<(), DbErr>;

    /// Flush every pending write atomically, returning how many were issued
    async fn commit(&mut self) -> Result<u64, DbErr>;

    /// Discard every pending write
    async fn rollback(&mut self) -> Result<(), DbErr>;
}

/// User lookups and membership cleanup
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<user::Model>, DbErr>;

    /// Clear the department reference of every member, returning how many changed
    async fn detach_users_from_department(&mut self, department_id: i64) -> Result<u64, DbErr>;
}

/// Everything the engine needs from one unit of work
pub trait HierarchyStore: DepartmentStore + UserDirectory {}

impl<T: DepartmentStore + UserDirectory> HierarchyStore for T {}
