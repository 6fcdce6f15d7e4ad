use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};

/// Joins the segments of a qualified name.
pub const SEPARATOR: &str = "__";

/// Payload stored in a [`NamedTree`].
pub trait Named {
    /// Name of the node, unique among its siblings.
    fn name(&self) -> &str;

    /// Called on a node and each of its ancestors after an edit beneath it.
    fn invalidate(&self) {}
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode<T> {
    pub data: T,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in sibling order
    pub children: Vec<Index>,
    /// Distance from the root (root is 0)
    pub depth: usize,
}

/// Direction of a sibling swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

/// Arena-based tree whose nodes are addressed by qualified name.
///
/// Parents own their children through the ordered `children` list; the
/// `parent` link is a plain index. A tree always has a root.
#[derive(Debug, Clone)]
pub struct NamedTree<T> {
    arena: Arena<TreeNode<T>>,
    root: Index,
}

/// Reject names that could not survive qualified-name or heading round trips.
///
/// Heading cells are trimmed and runs of spaces split cells on load, so a
/// name must be trimmed and free of double spaces.
pub fn validate_name(name: &str) -> DomainResult<()> {
    let bad = name.is_empty()
        || name.contains(SEPARATOR)
        || name.starts_with('_')
        || name.ends_with('_')
        || name.trim() != name
        || name.contains("  ")
        || name.contains(['\t', '\n', '\r', '*']);
    if bad {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl<T: Named> NamedTree<T> {
    pub fn new(root: T) -> DomainResult<Self> {
        validate_name(root.name())?;
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode {
            data: root,
            parent: None,
            children: Vec::new(),
            depth: 0,
        });
        Ok(Self { arena, root })
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode<T>> {
        self.arena.get(idx)
    }

    /// Node at an index handed out by this tree.
    ///
    /// # Panics
    /// If `idx` was not produced by this tree or its node was removed.
    pub fn node(&self, idx: Index) -> &TreeNode<T> {
        &self.arena[idx]
    }

    pub fn data(&self, idx: Index) -> &T {
        &self.arena[idx].data
    }

    pub(crate) fn data_mut(&mut self, idx: Index) -> &mut T {
        &mut self.arena[idx].data
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        &self.arena[idx].children
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.arena[idx].parent
    }

    pub fn depth(&self, idx: Index) -> usize {
        self.arena[idx].depth
    }

    pub fn is_leaf(&self, idx: Index) -> bool {
        self.arena[idx].children.is_empty()
    }

    pub fn child_named(&self, parent: Index, name: &str) -> Option<Index> {
        self.arena[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self.arena[child].data.name() == name)
    }

    /// Resolve a qualified name to a node index.
    #[instrument(level = "trace", skip(self))]
    pub fn get(&self, qualified_name: &str) -> DomainResult<Index> {
        let mut segments = qualified_name.split(SEPARATOR);
        let not_found = || DomainError::NotFound(qualified_name.to_string());
        if segments.next() != Some(self.data(self.root).name()) {
            return Err(not_found());
        }
        segments.try_fold(self.root, |current, segment| {
            self.child_named(current, segment).ok_or_else(not_found)
        })
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.get(qualified_name).is_ok()
    }

    pub fn qualified_name(&self, idx: Index) -> String {
        let mut names: Vec<&str> = std::iter::once(idx)
            .chain(self.ancestors(idx))
            .map(|i| self.data(i).name())
            .collect();
        names.reverse();
        names.join(SEPARATOR)
    }

    /// Parent chain of a node, nearest first, excluding the node itself.
    pub fn ancestors(&self, idx: Index) -> Ancestors<'_, T> {
        Ancestors {
            tree: self,
            current: self.parent(idx),
        }
    }

    /// Pre-order traversal of the whole tree.
    pub fn traversal(&self) -> Traversal<'_, T> {
        self.traverse(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `idx`, including `idx`.
    pub fn traverse(&self, idx: Index) -> Traversal<'_, T> {
        Traversal {
            tree: self,
            stack: vec![idx],
        }
    }

    /// Invalidate `idx` and every ancestor.
    pub fn propagate(&self, idx: Index) {
        self.data(idx).invalidate();
        for ancestor in self.ancestors(idx) {
            self.data(ancestor).invalidate();
        }
    }

    /// Append a child after validating its name against its future siblings.
    pub fn add_child(&mut self, parent: Index, data: T) -> DomainResult<Index> {
        self.check_insert(parent, data.name())?;
        Ok(self.attach(parent, data))
    }

    /// Append `data` under the node addressed by all but the last segment.
    #[instrument(level = "debug", skip(self, data))]
    pub fn add_descendant(&mut self, qualified_name: &str, data: T) -> DomainResult<Index> {
        let parent = self.insertion_point(qualified_name, data.name())?;
        Ok(self.attach(parent, data))
    }

    /// Parent index for inserting a node at `qualified_name`, without mutating.
    pub fn insertion_point(&self, qualified_name: &str, name: &str) -> DomainResult<Index> {
        let (prefix, last) = qualified_name
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| DomainError::NotFound(qualified_name.to_string()))?;
        if last != name {
            return Err(DomainError::InvalidName(qualified_name.to_string()));
        }
        let parent = self.get(prefix)?;
        self.check_insert(parent, name)?;
        Ok(parent)
    }

    fn check_insert(&self, parent: Index, name: &str) -> DomainResult<()> {
        validate_name(name)?;
        if self.child_named(parent, name).is_some() {
            let qualified = format!("{}{}{}", self.qualified_name(parent), SEPARATOR, name);
            return Err(DomainError::DuplicateName(qualified));
        }
        Ok(())
    }

    /// Append without validation; callers check with [`Self::insertion_point`].
    pub(crate) fn attach(&mut self, parent: Index, data: T) -> Index {
        let depth = self.arena[parent].depth + 1;
        let idx = self.arena.insert(TreeNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.arena[parent].children.push(idx);
        self.propagate(idx);
        idx
    }

    pub fn move_up(&mut self, qualified_name: &str) -> DomainResult<bool> {
        let idx = self.get(qualified_name)?;
        Ok(self.shift(idx, Shift::Up))
    }

    pub fn move_down(&mut self, qualified_name: &str) -> DomainResult<bool> {
        let idx = self.get(qualified_name)?;
        Ok(self.shift(idx, Shift::Down))
    }

    /// Swap a node with its neighbouring sibling. Returns false at a boundary.
    pub(crate) fn shift(&mut self, idx: Index, direction: Shift) -> bool {
        let Some(parent) = self.parent(idx) else {
            return false;
        };
        let siblings = &mut self.arena[parent].children;
        let Some(pos) = siblings.iter().position(|&s| s == idx) else {
            return false;
        };
        let other = match direction {
            Shift::Up if pos > 0 => pos - 1,
            Shift::Down if pos + 1 < siblings.len() => pos + 1,
            _ => return false,
        };
        siblings.swap(pos, other);
        debug!(?direction, from = pos, to = other, "swapped siblings");
        true
    }

    /// Detach the addressed node and return it as a standalone tree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, qualified_name: &str) -> DomainResult<NamedTree<T>> {
        let idx = self.get(qualified_name)?;
        if idx == self.root {
            return Err(DomainError::RootImmutable);
        }
        Ok(self.detach(idx))
    }

    /// Move the subtree at a non-root `idx` out of this arena.
    pub(crate) fn detach(&mut self, idx: Index) -> NamedTree<T> {
        let order: Vec<Index> = self.traverse(idx).map(|(i, _)| i).collect();
        if let Some(parent) = self.parent(idx) {
            self.arena[parent].children.retain(|&c| c != idx);
            self.propagate(parent);
        }

        let base_depth = self.depth(idx);
        let mut arena = Arena::with_capacity(order.len());
        let mut moved: HashMap<Index, Index> = HashMap::with_capacity(order.len());
        for old in order {
            let Some(node) = self.arena.remove(old) else {
                continue;
            };
            let parent = node.parent.and_then(|p| moved.get(&p).copied());
            let new = arena.insert(TreeNode {
                data: node.data,
                parent,
                children: Vec::new(),
                depth: node.depth - base_depth,
            });
            if let Some(p) = parent {
                arena[p].children.push(new);
            }
            moved.insert(old, new);
        }
        let root = moved[&idx];
        NamedTree { arena, root }
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a, T> {
    tree: &'a NamedTree<T>,
    current: Option<Index>,
}

impl<'a, T> Iterator for Ancestors<'a, T> {
    type Item = Index;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.arena.get(current).and_then(|n| n.parent);
        Some(current)
    }
}

/// Lazy pre-order depth-first traversal.
pub struct Traversal<'a, T> {
    tree: &'a NamedTree<T>,
    stack: Vec<Index>,
}

impl<'a, T> Iterator for Traversal<'a, T> {
    type Item = (Index, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.arena.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some((current, node));
            }
        }
        None
    }
}
