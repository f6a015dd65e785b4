//! In-memory view of the category forest.
//!
//! Categories are loaded once into an arena keyed by id, with a side index from
//! parent id to child ids. Siblings are kept ordered by `sort_order`, then name.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::entities::category;

pub struct CategoryTree {
    nodes: HashMap<i32, category::Model>,
    children: HashMap<Option<i32>, Vec<i32>>,
}

#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub children: Vec<TreeNode>,
}

impl CategoryTree {
    pub fn new(models: Vec<category::Model>) -> Self {
        let nodes: HashMap<i32, category::Model> =
            models.into_iter().map(|model| (model.id, model)).collect();

        let mut children: HashMap<Option<i32>, Vec<i32>> = HashMap::new();
        for model in nodes.values() {
            //a dangling parent reference puts the node at the top level
            let parent = model.parent_id.filter(|id| nodes.contains_key(id));
            children.entry(parent).or_default().push(model.id);
        }
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let (a, b) = (&nodes[a], &nodes[b]);
                a.sort_order
                    .cmp(&b.sort_order)
                    .then_with(|| a.name.cmp(&b.name))
            });
        }

        Self { nodes, children }
    }

    pub fn get(&self, id: i32) -> Option<&category::Model> {
        self.nodes.get(&id)
    }

    pub fn children_of(&self, parent: Option<i32>) -> impl Iterator<Item = &category::Model> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Ancestors first, the category itself last. Empty when `id` is unknown.
    pub fn path(&self, id: i32) -> Vec<&category::Model> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(&id);

        while let Some(node) = current {
            if !seen.insert(node.id) {
                break;
            }
            path.push(node);
            current = node.parent_id.and_then(|parent| self.nodes.get(&parent));
        }

        path.reverse();
        path
    }

    /// Breadcrumb label such as `Soins de la Peau > Visage`.
    pub fn full_path(&self, id: i32) -> String {
        self.path(id)
            .iter()
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// True when `candidate` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, ancestor: i32, candidate: i32) -> bool {
        self.path(candidate)
            .iter()
            .rev()
            .skip(1)
            .any(|node| node.id == ancestor)
    }

    /// Nested forest. With `active_only`, an inactive category hides its whole subtree.
    pub fn nested(&self, active_only: bool) -> Vec<TreeNode> {
        let mut visited = HashSet::new();
        self.build_level(None, active_only, &mut visited)
    }

    fn build_level(
        &self,
        parent: Option<i32>,
        active_only: bool,
        visited: &mut HashSet<i32>,
    ) -> Vec<TreeNode> {
        let mut level = Vec::new();
        for node in self.children_of(parent) {
            if active_only && !node.is_active {
                continue;
            }
            if !visited.insert(node.id) {
                continue;
            }
            level.push(TreeNode {
                id: node.id,
                name: node.name.clone(),
                slug: node.slug.clone(),
                image: node.image.clone(),
                is_active: node.is_active,
                sort_order: node.sort_order,
                children: self.build_level(Some(node.id), active_only, visited),
            });
        }
        level
    }
}
