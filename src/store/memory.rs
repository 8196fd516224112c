//! In-process store
//!
//! Writes land in a working copy and are promoted on `commit`; `rollback`
//! throws the working copy away. Useful for tests and for embedding the engine
//! without a database.

use async_trait::async_trait;
use sea_orm::DbErr;
use std::collections::BTreeMap;

use super::{DepartmentStore, UserDirectory};
use crate::entity::{department, user};

#[derive(Debug, Clone, Default)]
struct Tables {
    departments: BTreeMap<i64, department::Model>,
    users: BTreeMap<i64, user::Model>,
    next_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Tables,
    working: Tables,
    /// Department and user ids written in the open unit of work
    pending: Vec<i64>,
    last_commit: Vec<i64>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed committed rows directly, bypassing every check
    pub fn with_departments(departments: Vec<department::Model>) -> Self {
        let mut store = Self::new();
        for dept in departments {
            store.committed.next_id = store.committed.next_id.max(dept.id);
            store.committed.departments.insert(dept.id, dept);
        }
        store.working = store.committed.clone();
        store
    }

    /// Seed a committed user row
    pub fn add_user(&mut self, user: user::Model) {
        self.committed.users.insert(user.id, user.clone());
        self.working.users.insert(user.id, user);
    }

    /// Make the write after the next `n` successful writes fail
    pub fn fail_after_writes(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// Committed departments, ascending by id
    pub fn departments(&self) -> Vec<department::Model> {
        self.committed.departments.values().cloned().collect()
    }

    pub fn department(&self, id: i64) -> Option<department::Model> {
        self.committed.departments.get(&id).cloned()
    }

    pub fn user(&self, id: i64) -> Option<user::Model> {
        self.committed.users.get(&id).cloned()
    }

    /// Ids written by the most recent commit, in write order
    pub fn last_commit(&self) -> &[i64] {
        &self.last_commit
    }

    fn record(&mut self, id: i64) -> Result<(), DbErr> {
        if self.fail_after == Some(self.pending.len()) {
            self.fail_after = None;
            return Err(DbErr::Custom(format!("injected write failure at row {}", id)));
        }
        self.pending.push(id);
        Ok(())
    }
}

#[async_trait]
impl DepartmentStore for MemoryStore {
    async fn load_all_departments(&self) -> Result<Vec<department::Model>, DbErr> {
        Ok(self.working.departments.values().cloned().collect())
    }

    async fn find_department_by_id(&self, id: i64) -> Result<Option<department::Model>, DbErr> {
        Ok(self.working.departments.get(&id).cloned())
    }

    async fn any_department_with_name_or_code(
        &self,
        name: &str,
        code: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbErr> {
        let name = name.to_lowercase();
        let code = code.to_lowercase();
        Ok(self.working.departments.values().any(|d| {
            Some(d.id) != exclude_id
                && (d.name.to_lowercase() == name || d.code.to_lowercase() == code)
        }))
    }

    async fn any_department_managed_by(
        &self,
        user_id: i64,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbErr> {
        Ok(self
            .working
            .departments
            .values()
            .any(|d| Some(d.id) != exclude_id && d.manager_id == Some(user_id)))
    }

    async fn insert_department(&mut self, mut model: department::Model) -> Result<i64, DbErr> {
        let id = self.working.next_id + 1;
        self.record(id)?;
        self.working.next_id = id;
        model.id = id;
        self.working.departments.insert(id, model);
        Ok(id)
    }

    async fn update_department(&mut self, model: department::Model) -> Result<(), DbErr> {
        if !self.working.departments.contains_key(&model.id) {
            return Err(DbErr::RecordNotFound(format!("department {}", model.id)));
        }
        self.record(model.id)?;
        self.working.departments.insert(model.id, model);
        Ok(())
    }

    async fn delete_department(&mut self, model: department::Model) -> Result<(), DbErr> {
        self.record(model.id)?;
        self.working.departments.remove(&model.id);
        Ok(())
    }

    async fn commit(&mut self) -> Result<u64, DbErr> {
        self.committed = self.working.clone();
        self.last_commit = std::mem::take(&mut self.pending);
        Ok(self.last_commit.len() as u64)
    }

    async fn rollback(&mut self) -> Result<(), DbErr> {
        self.working = self.committed.clone();
        self.pending.clear();
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<user::Model>, DbErr> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn detach_users_from_department(&mut self, department_id: i64) -> Result<u64, DbErr> {
        let members: Vec<i64> = self
            .working
            .users
            .values()
            .filter(|u| u.department_id == Some(department_id))
            .map(|u| u.id)
            .collect();

        for id in &members {
            self.record(*id)?;
            if let Some(user) = self.working.users.get_mut(id) {
                user.department_id = None;
            }
        }
        Ok(members.len() as u64)
    }
}
