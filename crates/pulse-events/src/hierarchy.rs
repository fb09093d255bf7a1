//! Item hierarchy lookup for scoped report queries.
//!
//! Reports can be scoped to a subtree of the item hierarchy ("this binder
//! and everything under it"). The hierarchy itself lives outside this
//! system, so the seam is a trait: callers supply whatever lookup their
//! deployment has, and tests supply a fixed map.

use std::collections::{BTreeSet, HashMap};

use crate::errors::Result;

/// Resolves an item to itself plus all of its descendants.
pub trait HierarchyLookup: Send + Sync {
    /// Return the item's subtree as a flat, sorted, deduplicated ID list.
    /// The root item itself is always included, even when unknown to the
    /// hierarchy.
    fn descendants(&self, item_id: &str) -> Result<Vec<String>>;
}

/// A fixed parent → children map, expanded recursively.
#[derive(Debug, Default)]
pub struct StaticHierarchy {
    children: HashMap<String, Vec<String>>,
}

impl StaticHierarchy {
    /// Build from (parent, children) pairs.
    pub fn new<I, C>(edges: I) -> Self
    where
        I: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = String>,
    {
        let children = edges
            .into_iter()
            .map(|(parent, kids)| (parent, kids.into_iter().collect()))
            .collect();
        Self { children }
    }
}

impl HierarchyLookup for StaticHierarchy {
    fn descendants(&self, item_id: &str) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![item_id.to_string()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                // Cycle guard: an already-visited node is never re-expanded.
                continue;
            }
            if let Some(kids) = self.children.get(&id) {
                stack.extend(kids.iter().cloned());
            }
        }
        Ok(seen.into_iter().collect())
    }
}

/// A hierarchy with no nesting: every item's subtree is just itself.
#[derive(Debug, Default)]
pub struct FlatHierarchy;

impl HierarchyLookup for FlatHierarchy {
    fn descendants(&self, item_id: &str) -> Result<Vec<String>> {
        Ok(vec![item_id.to_string()])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StaticHierarchy {
        StaticHierarchy::new([
            (
                "root".to_string(),
                vec!["a".to_string(), "b".to_string()],
            ),
            ("a".to_string(), vec!["a1".to_string()]),
        ])
    }

    #[test]
    fn expands_recursively() {
        let h = sample();
        assert_eq!(h.descendants("root").unwrap(), vec!["a", "a1", "b", "root"]);
    }

    #[test]
    fn leaf_is_its_own_subtree() {
        let h = sample();
        assert_eq!(h.descendants("b").unwrap(), vec!["b"]);
    }

    #[test]
    fn unknown_item_still_included() {
        let h = sample();
        assert_eq!(h.descendants("ghost").unwrap(), vec!["ghost"]);
    }

    #[test]
    fn cycles_terminate() {
        let h = StaticHierarchy::new([
            ("a".to_string(), vec!["b".to_string()]),
            ("b".to_string(), vec!["a".to_string()]),
        ]);
        assert_eq!(h.descendants("a").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn flat_hierarchy() {
        assert_eq!(FlatHierarchy.descendants("x").unwrap(), vec!["x"]);
    }
}
