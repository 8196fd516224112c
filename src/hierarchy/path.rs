//! Ancestor-name paths with per-request memoization

use std::collections::{HashMap, HashSet};

use super::snapshot::Snapshot;

/// Resolves root-to-self name chains over one snapshot.
///
/// Paths are cached by id as they are found, so siblings sharing ancestors
/// only walk the part of the chain nobody has resolved yet.
pub struct PathResolver<'a> {
    snapshot: &'a Snapshot,
    cache: HashMap<i64, Vec<String>>,
}

impl<'a> PathResolver<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            cache: HashMap::new(),
        }
    }

    /// Names from the root down to `id` inclusive; empty for unknown ids.
    ///
    /// Stops at a root, a broken parent link, or a loop.
    pub fn resolve(&mut self, id: i64) -> Vec<String> {
        if let Some(path) = self.cache.get(&id) {
            return path.clone();
        }

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut prefix = Vec::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if let Some(cached) = self.cache.get(&node_id) {
                prefix = cached.clone();
                break;
            }
            if !visited.insert(node_id) {
                break;
            }
            let Some(node) = self.snapshot.get(node_id) else {
                break;
            };
            chain.push(node_id);
            current = node.parent_id;
        }

        for node_id in chain.into_iter().rev() {
            if let Some(node) = self.snapshot.get(node_id) {
                prefix.push(node.name.clone());
                self.cache.insert(node_id, prefix.clone());
            }
        }

        self.cache.get(&id).cloned().unwrap_or_default()
    }

    /// Name of the parent of `id`, if the link resolves
    pub fn parent_name(&self, id: i64) -> Option<String> {
        let parent_id = self.snapshot.get(id)?.parent_id?;
        self.snapshot.get(parent_id).map(|p| p.name.clone())
    }

    /// Number of memoized entries
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
