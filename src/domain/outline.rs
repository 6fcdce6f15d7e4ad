//! Indented outlines of assignment and grade trees.

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::book::GradeBook;
use crate::domain::error::DomainResult;
use crate::domain::grade::GradeView;
use crate::domain::tree::{Named, NamedTree};
use crate::domain::weight::AssignmentTree;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn build<T: Named>(tree: &NamedTree<T>, idx: Index, label: &impl Fn(Index) -> String) -> Tree<String> {
    let leaves: Vec<_> = tree
        .children(idx)
        .iter()
        .map(|&child| build(tree, child, label))
        .collect();
    Tree::new(label(idx)).with_leaves(leaves)
}

impl TreeNodeConvert for AssignmentTree {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        build(self, self.root(), &|idx| {
            let assignment = self.data(idx);
            let star = if assignment.extra_credit() { "*" } else { "" };
            format!("{}{} ({})", assignment.name(), star, assignment.weight_display())
        })
    }
}

impl TreeNodeConvert for GradeView<'_> {
    fn to_tree_string(&self) -> Tree<String> {
        let leaves: Vec<_> = self.children().iter().map(|c| c.to_tree_string()).collect();
        Tree::new(format!("{}: {}", self.name(), self.display_string())).with_leaves(leaves)
    }
}

/// Outline of one student's grades, rooted at the course.
pub fn grade_outline(book: &GradeBook, alias: &str) -> DomainResult<Tree<String>> {
    let root = book.assignments().qualified_name(book.assignments().root());
    Ok(book.get_grade(alias, &root)?.to_tree_string())
}
