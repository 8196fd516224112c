//! Requests accepted by the engine and the views it returns

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::path::PathResolver;
use super::snapshot::Snapshot;
use crate::config::HierarchyConfig;
use crate::entity::department;
use crate::error::{AppError, AppResult, ErrorCode};

/// Create department request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub manager_id: i64,
    pub status: Option<String>,
}

/// Update department request; every field replaces the stored value except
/// `status`, which is kept when absent
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub status: Option<String>,
}

impl CreateDepartmentRequest {
    pub(crate) fn validated(mut self, config: &HierarchyConfig) -> AppResult<Self> {
        (self.name, self.code) = check_identity(&self.name, &self.code, config)?;
        check_status(self.status.as_deref(), config)?;
        Ok(self)
    }
}

impl UpdateDepartmentRequest {
    pub(crate) fn validated(mut self, config: &HierarchyConfig) -> AppResult<Self> {
        (self.name, self.code) = check_identity(&self.name, &self.code, config)?;
        check_status(self.status.as_deref(), config)?;
        Ok(self)
    }
}

fn check_identity(name: &str, code: &str, config: &HierarchyConfig) -> AppResult<(String, String)> {
    let name = name.trim();
    let code = code.trim();
    if name.is_empty() || code.is_empty() {
        return Err(AppError::Invalid(ErrorCode::MissingField));
    }
    if name.chars().count() > config.name_limit() {
        return Err(AppError::Invalid(ErrorCode::NameTooLong));
    }
    if code.chars().count() > config.code_limit() {
        return Err(AppError::Invalid(ErrorCode::FieldTooLong));
    }
    Ok((name.to_string(), code.to_string()))
}

fn check_status(status: Option<&str>, config: &HierarchyConfig) -> AppResult<()> {
    match status {
        Some(status) if status.chars().count() > config.status_limit() => {
            Err(AppError::Invalid(ErrorCode::FieldTooLong))
        }
        _ => Ok(()),
    }
}

/// Department response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentView {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub parent_name: Option<String>,
    pub manager_id: Option<i64>,
    pub manager_name: Option<String>,
    /// Depth derived from the parent chain, not the stored column
    pub level: i32,
    pub status: String,
    /// Ancestor names, root first, ending with this department
    pub path: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DepartmentView>,
}

impl DepartmentView {
    /// Flat view of one node; `children` is left empty
    pub(crate) fn from_node(
        node: &department::Model,
        snapshot: &Snapshot,
        resolver: &mut PathResolver<'_>,
        managers: &HashMap<i64, String>,
    ) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            code: node.code.clone(),
            description: node.description.clone(),
            parent_id: node.parent_id,
            parent_name: resolver.parent_name(node.id),
            manager_id: node.manager_id,
            manager_name: node.manager_id.and_then(|m| managers.get(&m).cloned()),
            level: snapshot.computed_level(node.id).unwrap_or(node.level),
            status: node.status.clone(),
            path: resolver.resolve(node.id),
            created_at: node.created_at,
            updated_at: node.updated_at,
            children: Vec::new(),
        }
    }
}

/// Nest every department under its parent.
///
/// Roots (and nodes with a missing parent) come first in id order; nodes only
/// reachable through a loop are appended at the top level so nothing is lost.
pub fn build_tree(snapshot: &Snapshot, managers: &HashMap<i64, String>) -> Vec<DepartmentView> {
    let mut resolver = PathResolver::new(snapshot);
    let mut visited = HashSet::new();
    let mut tree = Vec::new();

    for id in snapshot.roots().into_iter().chain(snapshot.ids()) {
        if let Some(view) = assemble(id, snapshot, &mut resolver, managers, &mut visited) {
            tree.push(view);
        }
    }

    tree
}

fn assemble(
    id: i64,
    snapshot: &Snapshot,
    resolver: &mut PathResolver<'_>,
    managers: &HashMap<i64, String>,
    visited: &mut HashSet<i64>,
) -> Option<DepartmentView> {
    if !visited.insert(id) {
        return None;
    }
    let node = snapshot.get(id)?;
    let mut view = DepartmentView::from_node(node, snapshot, resolver, managers);
    view.children = snapshot
        .children_of(id)
        .iter()
        .filter_map(|child| assemble(*child, snapshot, resolver, managers, visited))
        .collect();
    Some(view)
}
