//! Hierarchy engine
//!
//! Each operation loads the full department set once, validates and performs
//! the tree surgery on the in-memory snapshot, then issues the resulting
//! writes through the store and commits them as one unit. Validation is
//! finished before the first write; a failed write rolls the unit back.

use sea_orm::DbErr;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use super::dto::{build_tree, CreateDepartmentRequest, DepartmentView, UpdateDepartmentRequest};
use super::manager::ensure_eligible;
use super::path::PathResolver;
use super::snapshot::{Snapshot, Violation};
use crate::config::HierarchyConfig;
use crate::entity::{department, user};
use crate::error::{AppError, AppResult, ErrorCode, OptionExt};
use crate::store::HierarchyStore;

/// Writes produced by one operation, applied in field order
#[derive(Debug, Default)]
struct WritePlan {
    detach_users_of: Option<i64>,
    insert: Option<department::Model>,
    updates: Vec<department::Model>,
    delete: Option<department::Model>,
}

#[derive(Debug)]
struct WriteOutcome {
    inserted_id: Option<i64>,
    writes: u64,
}

pub struct HierarchyEngine {
    config: HierarchyConfig,
}

impl HierarchyEngine {
    pub fn new(config: HierarchyConfig) -> Self {
        Self { config }
    }

    /// Create a department under an optional parent
    pub async fn create_department<S: HierarchyStore>(
        &self,
        store: &mut S,
        req: CreateDepartmentRequest,
    ) -> AppResult<DepartmentView> {
        let req = req.validated(&self.config)?;

        if store
            .any_department_with_name_or_code(&req.name, &req.code, None)
            .await?
        {
            warn!("Department name '{}' or code '{}' already exists", req.name, req.code);
            return Err(AppError::Conflict(ErrorCode::NameOrCodeExists));
        }

        let mut snapshot = Snapshot::new(store.load_all_departments().await?);
        let level = match req.parent_id {
            Some(parent_id) => {
                snapshot
                    .get(parent_id)
                    .ok_or_not_found(format!("parent department {}", parent_id))?
                    .level
                    + 1
            }
            None => 1,
        };

        let manager = ensure_eligible(store, &self.config, req.manager_id, None).await?;

        let now = now();
        let mut model = department::Model {
            id: 0,
            name: req.name,
            code: req.code,
            description: req.description,
            parent_id: req.parent_id,
            manager_id: Some(manager.id),
            level,
            status: req.status.unwrap_or_else(|| self.config.active_status.clone()),
            created_at: now,
            updated_at: now,
        };

        let plan = WritePlan {
            insert: Some(model.clone()),
            ..Default::default()
        };
        let result = persist(store, plan).await;
        let outcome = settle(store, result).await?;
        model.id = outcome.inserted_id.unwrap_or_default();

        info!(
            "Created department {} '{}' at level {} ({} writes)",
            model.id, model.name, model.level, outcome.writes
        );

        snapshot.upsert(model.clone());
        Ok(single_view(&snapshot, &model, Some(&manager)))
    }

    /// Replace a department's fields, moving its subtree if the parent changes
    pub async fn update_department<S: HierarchyStore>(
        &self,
        store: &mut S,
        id: i64,
        req: UpdateDepartmentRequest,
    ) -> AppResult<DepartmentView> {
        let req = req.validated(&self.config)?;

        let mut snapshot = Snapshot::new(store.load_all_departments().await?);
        let current = snapshot
            .get(id)
            .cloned()
            .ok_or_not_found(format!("department {}", id))?;

        if store
            .any_department_with_name_or_code(&req.name, &req.code, Some(id))
            .await?
        {
            warn!("Department name '{}' or code '{}' already exists", req.name, req.code);
            return Err(AppError::Conflict(ErrorCode::NameOrCodeExists));
        }

        let new_level = match req.parent_id {
            None => 1,
            Some(parent_id) if req.parent_id != current.parent_id => {
                let parent_level = snapshot
                    .get(parent_id)
                    .ok_or_not_found(format!("parent department {}", parent_id))?
                    .level;
                if snapshot.would_create_cycle(id, parent_id) {
                    warn!("Moving department {} under {} would create a cycle", id, parent_id);
                    return Err(AppError::Invalid(ErrorCode::CycleDetected));
                }
                parent_level + 1
            }
            Some(_) => current.level,
        };

        let manager = match req.manager_id {
            Some(manager_id) => Some(ensure_eligible(store, &self.config, manager_id, Some(id)).await?),
            None => None,
        };

        let now = now();
        let delta = new_level - current.level;
        let updated = department::Model {
            name: req.name,
            code: req.code,
            description: req.description,
            parent_id: req.parent_id,
            manager_id: req.manager_id,
            level: new_level,
            status: req.status.unwrap_or_else(|| current.status.clone()),
            updated_at: now,
            ..current
        };

        snapshot.upsert(updated.clone());
        let cascaded = snapshot.cascade_level(id, delta, now);

        let mut updates = vec![updated.clone()];
        updates.extend(cascaded.iter().filter_map(|d| snapshot.get(*d).cloned()));
        let plan = WritePlan {
            updates,
            ..Default::default()
        };
        let result = persist(store, plan).await;
        let outcome = settle(store, result).await?;

        info!(
            "Updated department {} '{}': level {} -> {}, {} descendants re-leveled ({} writes)",
            id,
            updated.name,
            new_level - delta,
            new_level,
            cascaded.len(),
            outcome.writes
        );

        Ok(single_view(&snapshot, &updated, manager.as_ref()))
    }

    /// Delete a department, handing its subtree to its parent
    pub async fn delete_department<S: HierarchyStore>(&self, store: &mut S, id: i64) -> AppResult<bool> {
        let mut snapshot = Snapshot::new(store.load_all_departments().await?);
        let (target, affected) = snapshot
            .remove_and_reparent(id, now(), &self.config.inactive_status)
            .ok_or_not_found(format!("department {}", id))?;

        let plan = WritePlan {
            detach_users_of: Some(id),
            updates: affected.iter().filter_map(|d| snapshot.get(*d).cloned()).collect(),
            delete: Some(target.clone()),
            ..Default::default()
        };
        let result = persist(store, plan).await;
        let outcome = settle(store, result).await?;

        info!(
            "Deleted department {} '{}', {} descendants reparented ({} writes)",
            id,
            target.name,
            affected.len(),
            outcome.writes
        );

        Ok(true)
    }

    pub async fn get_department<S: HierarchyStore>(&self, store: &S, id: i64) -> AppResult<DepartmentView> {
        let node = store
            .find_department_by_id(id)
            .await?
            .ok_or_not_found(format!("department {}", id))?;
        let snapshot = Snapshot::new(store.load_all_departments().await?);

        let manager = match node.manager_id {
            Some(manager_id) => store.find_user_by_id(manager_id).await?,
            None => None,
        };

        Ok(single_view(&snapshot, &node, manager.as_ref()))
    }

    /// Every department nested under its parent, with paths and names resolved
    pub async fn list_departments<S: HierarchyStore>(&self, store: &S) -> AppResult<Vec<DepartmentView>> {
        let snapshot = Snapshot::new(store.load_all_departments().await?);

        let mut managers = HashMap::new();
        for id in snapshot.ids() {
            let Some(manager_id) = snapshot.get(id).and_then(|d| d.manager_id) else {
                continue;
            };
            if managers.contains_key(&manager_id) {
                continue;
            }
            if let Some(user) = store.find_user_by_id(manager_id).await? {
                managers.insert(manager_id, user.display_name().to_string());
            }
        }

        debug!("Listing {} departments", snapshot.len());
        Ok(build_tree(&snapshot, &managers))
    }

    /// Report broken structural invariants without changing anything
    pub async fn audit_hierarchy<S: HierarchyStore>(&self, store: &S) -> AppResult<Vec<Violation>> {
        let snapshot = Snapshot::new(store.load_all_departments().await?);
        let violations = snapshot.audit();
        if violations.is_empty() {
            debug!("Hierarchy audit passed for {} departments", snapshot.len());
        } else {
            warn!("Hierarchy audit found {} violations", violations.len());
        }
        Ok(violations)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn single_view(snapshot: &Snapshot, node: &department::Model, manager: Option<&user::Model>) -> DepartmentView {
    let managers: HashMap<i64, String> = manager
        .map(|m| (m.id, m.display_name().to_string()))
        .into_iter()
        .collect();
    let mut resolver = PathResolver::new(snapshot);
    DepartmentView::from_node(node, snapshot, &mut resolver, &managers)
}

async fn persist<S: HierarchyStore>(store: &mut S, plan: WritePlan) -> Result<WriteOutcome, DbErr> {
    if let Some(department_id) = plan.detach_users_of {
        let detached = store.detach_users_from_department(department_id).await?;
        debug!("Detached {} users from department {}", detached, department_id);
    }

    let inserted_id = match plan.insert {
        Some(model) => Some(store.insert_department(model).await?),
        None => None,
    };

    for model in plan.updates {
        store.update_department(model).await?;
    }

    if let Some(model) = plan.delete {
        store.delete_department(model).await?;
    }

    let writes = store.commit().await?;
    Ok(WriteOutcome { inserted_id, writes })
}

/// Map a failed unit of work to a system error after rolling it back
async fn settle<S: HierarchyStore, T>(store: &mut S, outcome: Result<T, DbErr>) -> AppResult<T> {
    match outcome {
        Ok(value) => Ok(value),
        Err(e) => {
            error!("Hierarchy write failed, rolling back: {}", e);
            if let Err(rollback_err) = store.rollback().await {
                error!("Rollback failed: {}", rollback_err);
            }
            Err(AppError::System(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hierarchy::manager::tests::person;
    use crate::hierarchy::snapshot::tests::dept;
    use crate::store::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    fn engine() -> HierarchyEngine {
        HierarchyEngine::new(HierarchyConfig::default())
    }

    fn store_with_managers() -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in 1..=20 {
            store.add_user(person(id, &format!("Manager{}", id), "middle_manager"));
        }
        store.add_user(person(50, "Intern", "staff"));
        store
    }

    fn create_req(name: &str, parent_id: Option<i64>, manager_id: i64) -> CreateDepartmentRequest {
        CreateDepartmentRequest {
            name: name.to_string(),
            code: name.to_uppercase(),
            description: None,
            parent_id,
            manager_id,
            status: None,
        }
    }

    fn update_req(store: &MemoryStore, id: i64, parent_id: Option<i64>) -> UpdateDepartmentRequest {
        let current = store.department(id).unwrap();
        UpdateDepartmentRequest {
            name: current.name,
            code: current.code,
            description: current.description,
            parent_id,
            manager_id: current.manager_id,
            status: None,
        }
    }

    /// Independent recomputation: roots are 1, everything else parent + 1
    fn assert_levels_consistent(store: &MemoryStore) {
        let departments = store.departments();
        for dept in &departments {
            match dept.parent_id {
                None => assert_eq!(dept.level, 1, "root {} has level {}", dept.id, dept.level),
                Some(parent_id) => {
                    let parent = departments
                        .iter()
                        .find(|p| p.id == parent_id)
                        .unwrap_or_else(|| panic!("department {} has dangling parent {}", dept.id, parent_id));
                    assert_eq!(dept.level, parent.level + 1, "department {} level", dept.id);
                }
            }
        }
    }

    /// Root(1) -> Mid(2) -> Leaf(3)
    async fn seeded() -> (HierarchyEngine, MemoryStore) {
        let engine = engine();
        let mut store = store_with_managers();
        assert_ok!(engine.create_department(&mut store, create_req("Root", None, 1)).await);
        assert_ok!(engine.create_department(&mut store, create_req("Mid", Some(1), 2)).await);
        assert_ok!(engine.create_department(&mut store, create_req("Leaf", Some(2), 3)).await);
        (engine, store)
    }

    #[tokio::test]
    async fn test_create_computes_level_and_view() {
        let (engine, mut store) = seeded().await;

        let view = assert_ok!(engine.create_department(&mut store, create_req("Deep", Some(3), 4)).await);
        assert_eq!(view.id, 4);
        assert_eq!(view.level, 4);
        assert_eq!(view.parent_name.as_deref(), Some("Leaf"));
        assert_eq!(view.manager_name.as_deref(), Some("Manager4"));
        assert_eq!(view.path, vec!["Root", "Mid", "Leaf", "Deep"]);
        assert_eq!(view.status, "active");
        assert!(view.created_at > 0);

        let stored = store.department(4).unwrap();
        assert_eq!(stored.level, 4);
        assert_eq!(stored.manager_id, Some(4));
        assert_eq!(store.last_commit(), &[4]);
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name_or_code() {
        let (engine, mut store) = seeded().await;

        let err = assert_err!(engine.create_department(&mut store, create_req("mid", None, 4)).await);
        assert!(matches!(err, AppError::Conflict(ErrorCode::NameOrCodeExists)));

        let mut req = create_req("Other", None, 4);
        req.code = "leaf".to_string();
        let err = assert_err!(engine.create_department(&mut store, req).await);
        assert!(matches!(err, AppError::Conflict(ErrorCode::NameOrCodeExists)));
        assert_eq!(store.departments().len(), 3);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_parent() {
        let (engine, mut store) = seeded().await;
        let err = assert_err!(engine.create_department(&mut store, create_req("Lost", Some(42), 4)).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.departments().len(), 3);
    }

    #[tokio::test]
    async fn test_create_checks_manager() {
        let (engine, mut store) = seeded().await;

        let err = assert_err!(engine.create_department(&mut store, create_req("Ops", None, 50)).await);
        assert!(matches!(err, AppError::Invalid(ErrorCode::ManagerIneligible)));

        let err = assert_err!(engine.create_department(&mut store, create_req("Ops", None, 2)).await);
        assert!(matches!(err, AppError::Conflict(ErrorCode::ManagerAlreadyAssigned)));

        let err = assert_err!(engine.create_department(&mut store, create_req("Ops", None, 999)).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_keeps_own_name_and_manager() {
        let (engine, mut store) = seeded().await;

        let req = update_req(&store, 2, Some(1));
        let view = assert_ok!(engine.update_department(&mut store, 2, req).await);
        assert_eq!(view.name, "Mid");
        assert_eq!(view.manager_id, Some(2));
        assert_eq!(view.level, 2);
    }

    #[tokio::test]
    async fn test_update_rejects_name_of_other_department() {
        let (engine, mut store) = seeded().await;

        let mut req = update_req(&store, 3, Some(2));
        req.name = "ROOT".to_string();
        let err = assert_err!(engine.update_department(&mut store, 3, req).await);
        assert!(matches!(err, AppError::Conflict(ErrorCode::NameOrCodeExists)));

        let mut req = update_req(&store, 3, Some(2));
        req.code = "root".to_string();
        let err = assert_err!(engine.update_department(&mut store, 3, req).await);
        assert!(matches!(err, AppError::Conflict(ErrorCode::NameOrCodeExists)));
        assert_eq!(store.department(3).unwrap().code, "LEAF");
    }

    #[tokio::test]
    async fn test_oversized_fields_rejected_before_writes() {
        let (engine, mut store) = seeded().await;

        let mut req = create_req("Ops", None, 4);
        req.code = "X".repeat(40);
        let err = assert_err!(engine.create_department(&mut store, req).await);
        assert!(matches!(err, AppError::Invalid(ErrorCode::FieldTooLong)));

        let mut req = create_req("Ops", None, 4);
        req.status = Some("s".repeat(30));
        let err = assert_err!(engine.create_department(&mut store, req).await);
        assert!(matches!(err, AppError::Invalid(ErrorCode::FieldTooLong)));
        assert_eq!(store.departments().len(), 3);

        let mut req = update_req(&store, 2, Some(1));
        req.status = Some("s".repeat(17));
        let err = assert_err!(engine.update_department(&mut store, 2, req).await);
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(store.department(2).unwrap().status, "active");
    }

    #[tokio::test]
    async fn test_update_rejects_manager_of_other_department() {
        let (engine, mut store) = seeded().await;

        let mut req = update_req(&store, 3, Some(2));
        req.manager_id = Some(1);
        let err = assert_err!(engine.update_department(&mut store, 3, req).await);
        assert!(matches!(err, AppError::Conflict(ErrorCode::ManagerAlreadyAssigned)));
    }

    #[tokio::test]
    async fn test_update_missing_target_or_parent() {
        let (engine, mut store) = seeded().await;

        let mut req = update_req(&store, 3, Some(2));
        let err = assert_err!(engine.update_department(&mut store, 77, req.clone()).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        req.parent_id = Some(77);
        let err = assert_err!(engine.update_department(&mut store, 3, req).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_rejects_cycle_without_writes() {
        let (engine, mut store) = seeded().await;
        let before = store.departments();

        // Root under its own grandchild
        let req = update_req(&store, 1, Some(3));
        let err = assert_err!(engine.update_department(&mut store, 1, req).await);
        assert!(matches!(err, AppError::Invalid(ErrorCode::CycleDetected)));

        // Mid under itself
        let req = update_req(&store, 2, Some(2));
        let err = assert_err!(engine.update_department(&mut store, 2, req).await);
        assert!(matches!(err, AppError::Invalid(ErrorCode::CycleDetected)));

        assert_eq!(store.departments(), before);
    }

    #[tokio::test]
    async fn test_detach_then_delete_scenario() {
        let (engine, mut store) = seeded().await;

        let req = update_req(&store, 2, None);
        let view = assert_ok!(engine.update_department(&mut store, 2, req).await);
        assert_eq!(view.level, 1);
        assert_eq!(view.path, vec!["Mid"]);
        assert_eq!(store.department(2).unwrap().level, 1);
        assert_eq!(store.department(3).unwrap().level, 2);
        assert_eq!(store.last_commit(), &[2, 3]);
        assert_levels_consistent(&store);

        // Root is now childless: plain removal, nothing cascades
        assert!(assert_ok!(engine.delete_department(&mut store, 1).await));
        assert_eq!(store.last_commit(), &[1]);
        assert!(store.department(1).is_none());
        assert_eq!(store.department(2).unwrap().status, "active");
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_cascade_touches_exactly_the_subtree() {
        let (engine, mut store) = seeded().await;
        // Root -> Mid -> Leaf -> Deep, Root -> Side
        assert_ok!(engine.create_department(&mut store, create_req("Deep", Some(3), 4)).await);
        assert_ok!(engine.create_department(&mut store, create_req("Side", Some(1), 5)).await);

        // Mid (2 descendants) moves under Side, one level deeper
        let req = update_req(&store, 2, Some(5));
        assert_ok!(engine.update_department(&mut store, 2, req).await);

        assert_eq!(store.last_commit(), &[2, 3, 4]);
        assert_eq!(store.department(2).unwrap().level, 3);
        assert_eq!(store.department(3).unwrap().level, 4);
        assert_eq!(store.department(4).unwrap().level, 5);
        assert_eq!(store.department(5).unwrap().level, 2);
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_same_depth_move_writes_only_target() {
        let (engine, mut store) = seeded().await;
        assert_ok!(engine.create_department(&mut store, create_req("Side", Some(1), 4)).await);

        // Mid and Side are both level 2; moving Leaf between them keeps its depth
        let req = update_req(&store, 3, Some(4));
        assert_ok!(engine.update_department(&mut store, 3, req).await);
        assert_eq!(store.last_commit(), &[3]);

        let req = update_req(&store, 2, Some(1));
        assert_ok!(engine.update_department(&mut store, 2, req).await);
        assert_eq!(store.last_commit(), &[2]);
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_delete_root_promotes_children() {
        let (engine, mut store) = seeded().await;
        assert_ok!(engine.create_department(&mut store, create_req("Side", Some(1), 4)).await);

        assert!(assert_ok!(engine.delete_department(&mut store, 1).await));

        let mid = store.department(2).unwrap();
        let side = store.department(4).unwrap();
        assert_eq!((mid.parent_id, mid.level), (None, 1));
        assert_eq!((side.parent_id, side.level), (None, 1));
        assert_eq!(store.department(3).unwrap().level, 2);
        for id in [2, 3, 4] {
            assert_eq!(store.department(id).unwrap().status, "inactive");
        }
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_delete_inner_node_reparents_to_grandparent() {
        let (engine, mut store) = seeded().await;

        assert!(assert_ok!(engine.delete_department(&mut store, 2).await));

        let leaf = store.department(3).unwrap();
        assert_eq!(leaf.parent_id, Some(1));
        assert_eq!(leaf.level, 2);
        assert_eq!(leaf.status, "inactive");
        assert_eq!(store.department(1).unwrap().status, "active");
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_delete_detaches_members() {
        let (engine, mut store) = seeded().await;
        let mut member = person(60, "Dana", "staff");
        member.department_id = Some(3);
        store.add_user(member);

        assert_ok!(engine.delete_department(&mut store, 3).await);
        assert_eq!(store.user(60).unwrap().department_id, None);
        assert_eq!(store.last_commit(), &[60, 3]);

        let err = assert_err!(engine.delete_department(&mut store, 3).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let (engine, mut store) = seeded().await;
        let before = store.departments();

        // Target write succeeds, first cascaded descendant fails
        store.fail_after_writes(1);
        let req = update_req(&store, 2, None);
        let err = assert_err!(engine.update_department(&mut store, 2, req).await);
        assert_eq!(err.kind(), ErrorKind::System);
        assert_eq!(store.departments(), before);

        // The store is usable again afterwards
        let req = update_req(&store, 2, None);
        assert_ok!(engine.update_department(&mut store, 2, req).await);
        assert_levels_consistent(&store);
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back() {
        let (engine, mut store) = seeded().await;
        let mut member = person(60, "Dana", "staff");
        member.department_id = Some(2);
        store.add_user(member);
        let before = store.departments();

        // Member detach succeeds, reparenting Leaf fails
        store.fail_after_writes(1);
        let err = assert_err!(engine.delete_department(&mut store, 2).await);
        assert_eq!(err.kind(), ErrorKind::System);

        assert_eq!(store.user(60).unwrap().department_id, Some(2));
        let leaf = store.department(3).unwrap();
        assert_eq!((leaf.parent_id, leaf.level), (Some(2), 3));
        assert_eq!(leaf.status, "active");
        assert_eq!(store.departments(), before);

        assert_ok!(engine.delete_department(&mut store, 2).await);
        assert_eq!(store.user(60).unwrap().department_id, None);
        assert_eq!(store.department(3).unwrap().parent_id, Some(1));
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let (engine, mut store) = seeded().await;
        assert_ok!(engine.create_department(&mut store, create_req("Side", Some(1), 4)).await);

        let leaf = assert_ok!(engine.get_department(&store, 3).await);
        assert_eq!(leaf.path, vec!["Root", "Mid", "Leaf"]);
        assert_eq!(leaf.parent_name.as_deref(), Some("Mid"));
        assert_eq!(leaf.manager_name.as_deref(), Some("Manager3"));

        let err = assert_err!(engine.get_department(&store, 99).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let tree = assert_ok!(engine.list_departments(&store).await);
        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        assert_eq!(root.manager_name.as_deref(), Some("Manager1"));
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Mid", "Side"]);
        assert_eq!(root.children[0].children[0].name, "Leaf");
    }

    #[tokio::test]
    async fn test_sequence_keeps_invariants() {
        let (engine, mut store) = seeded().await;
        for (i, parent) in [Some(1), Some(3), None, Some(5), Some(2)].into_iter().enumerate() {
            let name = format!("Unit{}", i);
            assert_ok!(engine.create_department(&mut store, create_req(&name, parent, 10 + i as i64)).await);
        }

        let moves = [(2, Some(6)), (5, Some(4)), (3, None), (8, Some(7)), (1, Some(3))];
        for (id, parent) in moves {
            let req = update_req(&store, id, parent);
            assert_ok!(engine.update_department(&mut store, id, req).await);
            assert_levels_consistent(&store);
        }

        // Every attempt to hang a node below its own descendant fails
        for dept in store.departments() {
            let snapshot = Snapshot::new(store.departments());
            for descendant in snapshot.descendants(dept.id) {
                let req = update_req(&store, dept.id, Some(descendant));
                let err = assert_err!(engine.update_department(&mut store, dept.id, req).await);
                assert!(matches!(err, AppError::Invalid(ErrorCode::CycleDetected)));
            }
        }

        for id in [8, 1, 4] {
            assert_ok!(engine.delete_department(&mut store, id).await);
            assert_levels_consistent(&store);
        }
        assert!(assert_ok!(engine.audit_hierarchy(&store).await).is_empty());
    }

    #[tokio::test]
    async fn test_audit_reports_corruption() {
        let store = MemoryStore::with_departments(vec![
            dept(1, "A", Some(2), 1),
            dept(2, "B", Some(1), 2),
            dept(3, "C", None, 3),
        ]);
        let violations = assert_ok!(engine().audit_hierarchy(&store).await);
        assert!(violations.contains(&Violation::Cycle { id: 1 }));
        assert!(violations.contains(&Violation::LevelMismatch { id: 3, stored: 3, expected: 1 }));
    }
}
