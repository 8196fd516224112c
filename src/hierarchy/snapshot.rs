//! In-memory department tree
//!
//! A `Snapshot` is built once per engine request from the full department
//! set. Parent/child links are integer ids resolved through the map, and every
//! walk carries a visited set so a corrupt (cyclic) graph can never hang it.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::entity::department;

/// Id-indexed view of every department loaded for one request
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    nodes: HashMap<i64, department::Model>,
    /// parent id -> child ids, ascending
    children: HashMap<i64, Vec<i64>>,
}

/// A broken invariant found by [`Snapshot::audit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// The node's ancestor chain loops back on itself
    Cycle { id: i64 },
    /// `parent_id` points at a department that does not exist
    #[serde(rename_all = "camelCase")]
    DanglingParent { id: i64, parent_id: i64 },
    /// Stored level differs from the depth computed from the parent chain
    LevelMismatch { id: i64, stored: i32, expected: i32 },
    DuplicateName { name: String, ids: Vec<i64> },
    DuplicateCode { code: String, ids: Vec<i64> },
    #[serde(rename_all = "camelCase")]
    DuplicateManager { manager_id: i64, ids: Vec<i64> },
}

impl Snapshot {
    pub fn new(departments: Vec<department::Model>) -> Self {
        let mut snapshot = Self::default();
        for dept in departments {
            snapshot.link(dept.id, dept.parent_id);
            snapshot.nodes.insert(dept.id, dept);
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&department::Model> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Direct children of `id`, ascending by id
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with no parent or whose parent is missing, ascending by id
    pub fn roots(&self) -> Vec<i64> {
        let mut roots: Vec<i64> = self
            .nodes
            .values()
            .filter(|n| n.is_root() || n.parent_id.is_some_and(|p| !self.nodes.contains_key(&p)))
            .map(|n| n.id)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Every id in ascending order
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether making `proposed_parent_id` the parent of `node_id` would close a cycle.
    ///
    /// Walks upward from the proposed parent. Reaching `node_id`, or revisiting
    /// any node (pre-existing corruption), counts as a cycle; reaching a root or a
    /// broken link does not.
    pub fn would_create_cycle(&self, node_id: i64, proposed_parent_id: i64) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(proposed_parent_id);

        while let Some(id) = current {
            if id == node_id || !visited.insert(id) {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent_id);
        }

        false
    }

    /// Depth of `id` counted from its root (roots are 1).
    ///
    /// A broken parent link ends the walk as if the node above were a root.
    /// Returns `None` for unknown ids and for nodes whose ancestry loops.
    pub fn computed_level(&self, id: i64) -> Option<i32> {
        let mut node = self.nodes.get(&id)?;
        let mut visited = HashSet::from([id]);
        let mut level = 1;

        while let Some(parent_id) = node.parent_id {
            let Some(parent) = self.nodes.get(&parent_id) else {
                break;
            };
            if !visited.insert(parent_id) {
                return None;
            }
            level += 1;
            node = parent;
        }

        Some(level)
    }

    /// All transitive descendants of `id` in depth-first preorder, excluding `id`
    pub fn descendants(&self, id: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut stack: Vec<i64> = self.children_of(id).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children_of(current).iter().rev());
        }

        out
    }

    /// Insert a new node or replace an existing one, keeping the child index in step
    pub fn upsert(&mut self, dept: department::Model) {
        if let Some(old) = self.nodes.get(&dept.id) {
            let old_parent = old.parent_id;
            if old_parent != dept.parent_id {
                self.unlink(dept.id, old_parent);
                self.link(dept.id, dept.parent_id);
            }
        } else {
            self.link(dept.id, dept.parent_id);
        }
        self.nodes.insert(dept.id, dept);
    }

    /// Add `delta` to the level of every descendant of `id` and stamp `updated_at`.
    ///
    /// The node itself is left alone. Returns the ids that changed; a zero delta
    /// changes nothing.
    pub fn cascade_level(&mut self, id: i64, delta: i32, now: i64) -> Vec<i64> {
        if delta == 0 {
            return Vec::new();
        }

        let affected = self.descendants(id);
        for child_id in &affected {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.level += delta;
                child.updated_at = now;
            }
        }
        affected
    }

    /// Remove `id` and hand its subtree to the removed node's parent.
    ///
    /// Direct children take over the removed node's `parent_id` (so children of a
    /// root become roots) and its level; deeper descendants are re-leveled below
    /// them. Every descendant is set to `inactive_status` and stamped with `now`.
    /// Returns the removed node and the ids of every rewritten descendant.
    pub fn remove_and_reparent(
        &mut self,
        id: i64,
        now: i64,
        inactive_status: &str,
    ) -> Option<(department::Model, Vec<i64>)> {
        let target = self.nodes.get(&id)?.clone();
        let new_parent = target.parent_id.filter(|p| self.nodes.contains_key(p));
        let base_level = match new_parent {
            Some(p) => self.nodes.get(&p).map_or(1, |parent| parent.level + 1),
            None => 1,
        };

        let direct: Vec<i64> = self.children_of(id).to_vec();
        let mut affected = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut stack: Vec<(i64, i32)> = direct.iter().rev().map(|c| (*c, base_level)).collect();

        while let Some((current, level)) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&current) {
                node.level = level;
                node.status = inactive_status.to_string();
                node.updated_at = now;
            }
            affected.push(current);
            stack.extend(self.children_of(current).iter().rev().map(|c| (*c, level + 1)));
        }

        for child_id in &direct {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parent_id = new_parent;
            }
            self.link(*child_id, new_parent);
        }
        self.children.remove(&id);
        self.unlink(id, target.parent_id);
        self.nodes.remove(&id);

        Some((target, affected))
    }

    /// Check every structural invariant without mutating anything
    pub fn audit(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for id in self.ids() {
            let node = &self.nodes[&id];
            if let Some(parent_id) = node.parent_id {
                if !self.nodes.contains_key(&parent_id) {
                    violations.push(Violation::DanglingParent { id, parent_id });
                }
            }
            match self.computed_level(id) {
                None => violations.push(Violation::Cycle { id }),
                Some(expected) if expected != node.level => {
                    violations.push(Violation::LevelMismatch {
                        id,
                        stored: node.level,
                        expected,
                    });
                }
                Some(_) => {}
            }
        }

        let mut names: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        let mut codes: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        let mut managers: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for id in self.ids() {
            let node = &self.nodes[&id];
            names.entry(node.name.to_lowercase()).or_default().push(id);
            codes.entry(node.code.to_lowercase()).or_default().push(id);
            if let Some(manager_id) = node.manager_id {
                managers.entry(manager_id).or_default().push(id);
            }
        }

        violations.extend(
            names
                .into_iter()
                .filter(|(_, ids)| ids.len() > 1)
                .map(|(name, ids)| Violation::DuplicateName { name, ids }),
        );
        violations.extend(
            codes
                .into_iter()
                .filter(|(_, ids)| ids.len() > 1)
                .map(|(code, ids)| Violation::DuplicateCode { code, ids }),
        );
        violations.extend(
            managers
                .into_iter()
                .filter(|(_, ids)| ids.len() > 1)
                .map(|(manager_id, ids)| Violation::DuplicateManager { manager_id, ids }),
        );

        violations
    }

    fn link(&mut self, id: i64, parent_id: Option<i64>) {
        if let Some(parent_id) = parent_id {
            let siblings = self.children.entry(parent_id).or_default();
            if let Err(pos) = siblings.binary_search(&id) {
                siblings.insert(pos, id);
            }
        }
    }

    fn unlink(&mut self, id: i64, parent_id: Option<i64>) {
        if let Some(parent_id) = parent_id {
            if let Some(siblings) = self.children.get_mut(&parent_id) {
                siblings.retain(|c| *c != id);
                if siblings.is_empty() {
                    self.children.remove(&parent_id);
                }
            }
        }
    }
}
