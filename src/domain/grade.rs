//! Per-student grade trees and weighted aggregation.
//!
//! A grade tree mirrors the assignment tree node for node. Leaves hold
//! score text; internal nodes are weighted averages of their children,
//! computed under one of three policies for ungraded leaves and memoized
//! per node until an edit beneath them invalidates the ancestor chain.

use std::cell::RefCell;
use std::fmt;

use generational_arena::Index;
use itertools::Itertools;
use num_rational::BigRational;
use num_traits::{One, Zero};
use tracing::trace;

use crate::domain::color::ColorScale;
use crate::domain::error::DomainResult;
use crate::domain::number::format_percent;
use crate::domain::score::{LetterScale, Score, UNGRADED};
use crate::domain::tree::{Named, NamedTree};
use crate::domain::weight::{Assignment, AssignmentTree};

/// How an ungraded leaf counts toward its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Ungraded counts as 0
    Minimum,
    /// Ungraded branches are left out of numerator and denominator
    Partial,
    /// Ungraded counts as 1
    Maximum,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Minimum, Policy::Partial, Policy::Maximum];

    fn slot(self) -> usize {
        self as usize
    }

    fn ungraded_value(self) -> BigRational {
        match self {
            Policy::Maximum => BigRational::one(),
            Policy::Minimum | Policy::Partial => BigRational::zero(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Policy::Minimum => "Minimum",
            Policy::Partial => "Partial",
            Policy::Maximum => "Maximum",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GradeCache {
    has_grade: Option<bool>,
    aggregates: [Option<BigRational>; 3],
}

/// Grade of one student for one assignment.
#[derive(Debug, Clone)]
pub struct GradeNode {
    name: String,
    raw: String,
    score: Score,
    cache: RefCell<GradeCache>,
}

impl GradeNode {
    pub fn ungraded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: UNGRADED.to_string(),
            score: Score::Ungraded,
            cache: RefCell::default(),
        }
    }

    /// Leaf grade for `assignment` from score text.
    pub fn parse(assignment: &Assignment, raw: &str, scale: &LetterScale) -> DomainResult<Self> {
        let raw = raw.trim();
        let score = Score::parse(raw, assignment.weight().points(), scale)?;
        Ok(Self {
            name: assignment.name().to_string(),
            raw: raw.to_string(),
            score,
            cache: RefCell::default(),
        })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    /// Memoized aggregate, if one is currently valid.
    pub fn cached(&self, policy: Policy) -> Option<BigRational> {
        self.cache.borrow().aggregates[policy.slot()].clone()
    }

    pub(crate) fn replace(&mut self, raw: &str, score: Score) {
        self.raw = raw.to_string();
        self.score = score;
    }
}

impl Named for GradeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn invalidate(&self) {
        *self.cache.borrow_mut() = GradeCache::default();
    }
}

pub type GradeTree = NamedTree<GradeNode>;

impl NamedTree<GradeNode> {
    /// Leaf: graded. Internal: any child graded.
    pub fn has_grade(&self, idx: Index) -> bool {
        let node = self.data(idx);
        if let Some(cached) = node.cache.borrow().has_grade {
            return cached;
        }
        let result = if self.is_leaf(idx) {
            node.score.is_graded()
        } else {
            self.children(idx).iter().any(|&child| self.has_grade(child))
        };
        node.cache.borrow_mut().has_grade = Some(result);
        result
    }

    /// Weighted grade of `idx` under `policy`; `at` is the bound assignment.
    pub fn aggregate(
        &self,
        idx: Index,
        assignments: &AssignmentTree,
        at: Index,
        policy: Policy,
    ) -> BigRational {
        let node = self.data(idx);
        if let Some(cached) = node.cached(policy) {
            return cached;
        }

        let result = if self.is_leaf(idx) {
            node.score.value().unwrap_or_else(|| policy.ungraded_value())
        } else {
            let mut weighted = BigRational::zero();
            let mut total = BigRational::zero();
            for (&child, &child_at) in self.children(idx).iter().zip(assignments.children(at)) {
                if policy == Policy::Partial && !self.has_grade(child) {
                    continue;
                }
                let weight = assignments.percent_weight(child_at);
                weighted += &weight * self.aggregate(child, assignments, child_at, policy);
                if !assignments.data(child_at).extra_credit() {
                    total += weight;
                }
            }
            if total.is_zero() {
                BigRational::zero()
            } else {
                weighted / total
            }
        };
        trace!(name = node.name(), ?policy, %result, "aggregated");
        node.cache.borrow_mut().aggregates[policy.slot()] = Some(result.clone());
        result
    }
}

/// Read-only view of one student's grade for one assignment.
#[derive(Clone, Copy)]
pub struct GradeView<'a> {
    pub(crate) assignments: &'a AssignmentTree,
    pub(crate) at: Index,
    pub(crate) grades: &'a GradeTree,
    pub(crate) idx: Index,
    pub(crate) scale: &'a LetterScale,
    pub(crate) colors: &'a ColorScale,
}

impl<'a> GradeView<'a> {
    pub fn assignment(&self) -> &'a Assignment {
        self.assignments.data(self.at)
    }

    pub fn node(&self) -> &'a GradeNode {
        self.grades.data(self.idx)
    }

    pub fn name(&self) -> &'a str {
        self.node().name()
    }

    pub fn qualified_name(&self) -> String {
        self.grades.qualified_name(self.idx)
    }

    pub fn depth(&self) -> usize {
        self.grades.depth(self.idx)
    }

    pub fn is_leaf(&self) -> bool {
        self.grades.is_leaf(self.idx)
    }

    pub fn has_grade(&self) -> bool {
        self.grades.has_grade(self.idx)
    }

    pub fn percent_weight(&self) -> BigRational {
        self.assignments.percent_weight(self.at)
    }

    pub fn aggregate(&self, policy: Policy) -> BigRational {
        self.grades
            .aggregate(self.idx, self.assignments, self.at, policy)
    }

    pub fn minimum(&self) -> BigRational {
        self.aggregate(Policy::Minimum)
    }

    pub fn partial(&self) -> BigRational {
        self.aggregate(Policy::Partial)
    }

    pub fn maximum(&self) -> BigRational {
        self.aggregate(Policy::Maximum)
    }

    /// Leaf: raw text. Internal: partial aggregate as a percentage.
    pub fn display_string(&self) -> String {
        if self.is_leaf() {
            self.node().raw_text().to_string()
        } else {
            format_percent(&self.partial())
        }
    }

    /// Leaf: raw text. Internal: minimum aggregate as a percentage.
    pub fn export_string(&self) -> String {
        if self.is_leaf() {
            self.node().raw_text().to_string()
        } else {
            format_percent(&self.minimum())
        }
    }

    /// Three lines of minimum, partial and maximum with letter grades.
    pub fn projection_string(&self) -> String {
        Policy::ALL
            .iter()
            .map(|&policy| {
                let value = self.aggregate(policy);
                format!(
                    "{}: {} ({})",
                    policy.label(),
                    format_percent(&value),
                    self.scale.letter_for(&value)
                )
            })
            .join("\n")
    }

    pub fn color(&self) -> &'a str {
        if self.has_grade() {
            self.colors.color_for(&self.partial())
        } else {
            self.colors.ungraded()
        }
    }

    pub fn parent(&self) -> Option<GradeView<'a>> {
        let idx = self.grades.parent(self.idx)?;
        let at = self.assignments.parent(self.at)?;
        Some(GradeView { idx, at, ..*self })
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self) -> Vec<GradeView<'a>> {
        std::iter::successors(self.parent(), GradeView::parent).collect()
    }

    pub fn children(&self) -> Vec<GradeView<'a>> {
        self.grades
            .children(self.idx)
            .iter()
            .zip(self.assignments.children(self.at))
            .map(|(&idx, &at)| GradeView { idx, at, ..*self })
            .collect()
    }
}

impl fmt::Display for GradeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} / {} / {}",
            self.assignment(),
            format_percent(&self.minimum()),
            format_percent(&self.partial()),
            format_percent(&self.maximum())
        )
    }
}

impl fmt::Debug for GradeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradeView")
            .field("qualified_name", &self.qualified_name())
            .field("raw", &self.node().raw_text())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    struct Fixture {
        assignments: AssignmentTree,
        grades: GradeTree,
        scale: LetterScale,
        colors: ColorScale,
    }

    impl Fixture {
        /// Builds grades in pre-order; internal cells are ignored.
        fn new(headings: &[&str], cells: &[&str]) -> Self {
            let assignments = AssignmentTree::from_headings(headings.iter().copied()).unwrap();
            let scale = LetterScale::default();
            let root_at = assignments.root();
            let mut grades =
                GradeTree::new(GradeNode::ungraded(assignments.data(root_at).name())).unwrap();
            let mut bound: HashMap<Index, Index> = HashMap::from([(root_at, grades.root())]);
            for ((at, node), cell) in assignments.traversal().zip(cells).skip(1) {
                let grade = if node.children.is_empty() {
                    GradeNode::parse(&node.data, cell, &scale).unwrap()
                } else {
                    GradeNode::ungraded(node.data.name())
                };
                let parent = bound[&node.parent.unwrap()];
                bound.insert(at, grades.attach(parent, grade));
            }
            Self {
                assignments,
                grades,
                scale,
                colors: ColorScale::default(),
            }
        }

        fn view(&self, qualified_name: &str) -> GradeView<'_> {
            GradeView {
                assignments: &self.assignments,
                at: self.assignments.get(qualified_name).unwrap(),
                grades: &self.grades,
                idx: self.grades.get(qualified_name).unwrap(),
                scale: &self.scale,
                colors: &self.colors,
            }
        }
    }

    const TWO_PARTS: [&str; 3] = ["Node (100%)", "__A (40%)", "__B (60%)"];

    #[test]
    fn test_fully_graded_policies_agree() {
        let fx = Fixture::new(&TWO_PARTS, &["", "100%", "50%"]);
        let root = fx.view("Node");
        assert_eq!(root.minimum(), ratio(7, 10));
        assert_eq!(root.partial(), ratio(7, 10));
        assert_eq!(root.maximum(), ratio(7, 10));
        assert_eq!(root.display_string(), "70.00%");
        assert_eq!(root.export_string(), "70.00%");
    }

    #[test]
    fn test_ungraded_child_per_policy() {
        let fx = Fixture::new(&TWO_PARTS, &["", "100%", "None"]);
        let root = fx.view("Node");
        assert_eq!(root.minimum(), ratio(2, 5));
        assert_eq!(root.partial(), ratio(1, 1));
        assert_eq!(root.maximum(), ratio(1, 1));
        assert_eq!(root.export_string(), "40.00%");
        assert_eq!(root.display_string(), "100.00%");
        assert_eq!(
            root.projection_string(),
            "Minimum: 40.00% (F)\nPartial: 100.00% (A)\nMaximum: 100.00% (A)"
        );
    }

    #[test]
    fn test_nothing_graded_is_zero_and_white() {
        let fx = Fixture::new(&TWO_PARTS, &["", "None", "None"]);
        let root = fx.view("Node");
        assert!(!root.has_grade());
        assert_eq!(root.partial(), BigRational::zero());
        assert_eq!(root.minimum(), BigRational::zero());
        assert_eq!(root.maximum(), BigRational::one());
        assert_eq!(root.color(), "#FFFFFF");
    }

    #[test]
    fn test_extra_credit_adds_to_numerator_only() {
        let fx = Fixture::new(
            &["Node (100%)", "__A (10)", "__B (10)", "__Bonus* (10)"],
            &["", "100%", "50%", "100%"],
        );
        // (0.5 * 1 + 0.5 * 0.5 + 0.5 * 1) / 1
        assert_eq!(fx.view("Node").minimum(), ratio(5, 4));
    }

    #[test]
    fn test_only_extra_credit_children_yield_zero() {
        let fx = Fixture::new(&["Node (100%)", "__Bonus* (10%)"], &["", "100%"]);
        assert_eq!(fx.view("Node").partial(), BigRational::zero());
    }

    #[test]
    fn test_nested_partial_skips_ungraded_branches() {
        let fx = Fixture::new(
            &[
                "Course (100%)",
                "__Homeworks (50%)",
                "____HW1 (10)",
                "____HW2 (10)",
                "__Exams (50%)",
                "____Final (100)",
            ],
            &["", "", "8", "None", "", "None"],
        );
        let course = fx.view("Course");
        assert_eq!(fx.view("Course__Homeworks").partial(), ratio(4, 5));
        assert_eq!(course.partial(), ratio(4, 5));
        // 0.5 * (0.5 * 0.8) = 0.2
        assert_eq!(course.minimum(), ratio(1, 5));
        // 0.5 * (0.5 * 0.8 + 0.5) + 0.5 = 0.95
        assert_eq!(course.maximum(), ratio(19, 20));
        assert!(course.minimum() <= course.partial() && course.partial() <= course.maximum());
    }

    #[test]
    fn test_aggregates_are_memoized_until_invalidated() {
        let mut fx = Fixture::new(&TWO_PARTS, &["", "100%", "50%"]);
        let root = fx.grades.root();
        assert_eq!(fx.grades.data(root).cached(Policy::Minimum), None);
        let _ = fx.view("Node").minimum();
        assert_eq!(fx.grades.data(root).cached(Policy::Minimum), Some(ratio(7, 10)));

        let b = fx.grades.get("Node__B").unwrap();
        let score = Score::parse("0%", None, &fx.scale).unwrap();
        fx.grades.data_mut(b).replace("0%", score);
        fx.grades.propagate(b);
        assert_eq!(fx.grades.data(root).cached(Policy::Minimum), None);
        assert_eq!(
            fx.grades.aggregate(root, &fx.assignments, fx.assignments.root(), Policy::Minimum),
            ratio(2, 5)
        );
        assert_eq!(fx.grades.data(b).raw_text(), "0%");
    }

    #[test]
    fn test_leaf_views_show_raw_text_and_color() {
        let fx = Fixture::new(&TWO_PARTS, &["", "100%", "-20%"]);
        let b = fx.view("Node__B");
        assert_eq!(b.display_string(), "-20%");
        assert_eq!(b.export_string(), "-20%");
        assert_eq!(b.partial(), ratio(4, 5));
        assert_eq!(b.color(), "#fce8af");
        let chain: Vec<_> = b.ancestors().iter().map(|v| v.qualified_name()).collect();
        assert_eq!(chain, ["Node"]);
    }
}
