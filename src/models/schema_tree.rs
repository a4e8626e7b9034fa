//! # Schema Tree
//!
//! Parent-linked view over the flat, pre-order physical schema list. Built
//! once per footer; path and level lookups are memoized by element index
//! and by dot-joined path respectively.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{ParquetError, Result};
use crate::models::types::metadata::SchemaElement;
use crate::models::types::parquet::Repetition;
use crate::utils::join_path;

/// Maximum repetition and definition levels of a column path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Levels {
    pub max_repetition: u32,
    pub max_definition: u32,
}

#[derive(Debug)]
pub struct SchemaTree {
    elements: Vec<SchemaElement>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    leaves: Vec<usize>,
    path_cache: Mutex<HashMap<usize, Arc<[String]>>>,
    level_cache: Mutex<HashMap<String, Levels>>,
}

impl SchemaTree {
    /// Link `elements`, checking every group's child count against the list.
    pub fn new(elements: Vec<SchemaElement>) -> Result<Self> {
        let root = elements
            .first()
            .ok_or_else(|| ParquetError::Metadata("schema has no root element".into()))?;
        let n = elements.len();
        let mut parent = vec![None; n];
        let mut children = vec![Vec::new(); n];
        let mut leaves = Vec::new();
        // (group index, children still expected)
        let mut open: Vec<(usize, usize)> = vec![(0, root.child_count())];

        for i in 1..n {
            while open.last().is_some_and(|&(_, left)| left == 0) {
                open.pop();
            }
            let Some(top) = open.last_mut() else {
                return Err(ParquetError::Metadata(format!(
                    "schema element {i} ('{}') lies outside the root",
                    elements[i].name
                )));
            };
            top.1 -= 1;
            parent[i] = Some(top.0);
            children[top.0].push(i);
            if elements[i].is_group() {
                open.push((i, elements[i].child_count()));
            } else {
                leaves.push(i);
            }
        }
        if let Some(&(g, left)) = open.iter().find(|&&(_, left)| left > 0) {
            return Err(ParquetError::Metadata(format!(
                "schema group '{}' is missing {left} children",
                elements[g].name
            )));
        }

        Ok(Self {
            elements,
            parent,
            children,
            leaves,
            path_cache: Mutex::new(HashMap::new()),
            level_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn elements(&self) -> &[SchemaElement] {
        &self.elements
    }

    pub fn root(&self) -> &SchemaElement {
        &self.elements[0]
    }

    /// Leaf element indices in pre-order; this is the column chunk order.
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    pub fn element(&self, index: usize) -> Option<&SchemaElement> {
        self.elements.get(index)
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parent.get(index).copied().flatten()
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    /// Names from the first level below the root down to `index`.
    pub fn path_for(&self, index: usize) -> Arc<[String]> {
        let mut cache = self.path_cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = cache.get(&index) {
            return Arc::clone(p);
        }
        let mut names = Vec::new();
        let mut cur = Some(index);
        while let Some(i) = cur {
            if i == 0 {
                break;
            }
            names.push(self.elements[i].name.clone());
            cur = self.parent[i];
        }
        names.reverse();
        let path: Arc<[String]> = names.into();
        cache.insert(index, Arc::clone(&path));
        path
    }

    /// Element index at `path`.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        let mut node = 0;
        for seg in path {
            node = *self.children[node]
                .iter()
                .find(|&&c| self.elements[c].name == seg.as_ref())?;
        }
        Some(node)
    }

    /// Leaf element index at `path`.
    pub fn find_leaf<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        self.find(path).filter(|&i| !self.elements[i].is_group())
    }

    /// Maximum levels for `path`: repeated nodes on the path, and nodes that
    /// are not required, leaf included and root excluded.
    ///
    /// # Errors
    /// [`ParquetError::FieldNotFound`] if a path segment does not exist.
    pub fn levels_for<S: AsRef<str>>(&self, path: &[S]) -> Result<Levels> {
        let key = join_path(path);
        let mut cache = self.level_cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(l) = cache.get(&key) {
            return Ok(*l);
        }
        let mut levels = Levels::default();
        let mut node = 0;
        for seg in path {
            node = *self.children[node]
                .iter()
                .find(|&&c| self.elements[c].name == seg.as_ref())
                .ok_or_else(|| ParquetError::FieldNotFound(key.clone()))?;
            match self.elements[node].repetition_or_required() {
                Repetition::Required => {}
                Repetition::Optional => levels.max_definition += 1,
                Repetition::Repeated => {
                    levels.max_definition += 1;
                    levels.max_repetition += 1;
                }
            }
        }
        cache.insert(key, levels);
        Ok(levels)
    }
}
