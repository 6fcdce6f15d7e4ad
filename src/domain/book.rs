//! The gradebook: one assignment tree plus one grade tree per student.
//!
//! Every grade tree has the same shape, names and sibling order as the
//! assignment tree. Structural edits resolve their target in every tree
//! before touching any of them, so a failed edit leaves the book unchanged.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use generational_arena::Index;
use indexmap::IndexMap;
use itertools::Itertools;
use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::color::ColorScale;
use crate::domain::entities::Student;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::grade::{GradeNode, GradeTree, GradeView};
use crate::domain::score::{LetterScale, Score, UNGRADED};
use crate::domain::tree::{Named, Shift, SEPARATOR};
use crate::domain::weight::{Assignment, AssignmentTree};

/// Literal first cell of the header row.
pub const HEADER_LABEL: &str = "Student";

/// A student and their grade tree.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub student: Student,
    grades: GradeTree,
}

impl Enrollment {
    pub fn grades(&self) -> &GradeTree {
        &self.grades
    }
}

#[derive(Debug, Clone)]
pub struct GradeBook {
    assignments: AssignmentTree,
    /// Keyed by alias, in file order
    roster: IndexMap<String, Enrollment>,
    scale: LetterScale,
    colors: ColorScale,
}

fn spaces_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("spaces regex"))
}

/// Split a line into trimmed cells; runs of two or more spaces count as a tab.
fn split_cells(line: &str) -> Vec<String> {
    spaces_regex()
        .replace_all(line.trim(), "\t")
        .split('\t')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Grade node bound to the assignment at `at`; internal cells are not parsed.
fn bound_grade(
    assignments: &AssignmentTree,
    at: Index,
    cell: &str,
    scale: &LetterScale,
) -> DomainResult<GradeNode> {
    let assignment = assignments.data(at);
    if assignments.is_leaf(at) {
        GradeNode::parse(assignment, cell, scale)
    } else {
        Ok(GradeNode::ungraded(assignment.name()))
    }
}

/// Build a grade tree isomorphic to `assignments` from pre-order cells.
fn grade_tree(
    assignments: &AssignmentTree,
    cells: &[String],
    scale: &LetterScale,
) -> DomainResult<GradeTree> {
    let root_at = assignments.root();
    let root_cell = cells.first().map_or(UNGRADED, String::as_str);
    let mut grades = GradeTree::new(bound_grade(assignments, root_at, root_cell, scale)?)?;
    let mut bound: HashMap<Index, Index> = HashMap::from([(root_at, grades.root())]);
    for ((at, node), cell) in assignments.traversal().zip(cells).skip(1) {
        let Some(parent) = node.parent.and_then(|p| bound.get(&p).copied()) else {
            continue;
        };
        let grade = bound_grade(assignments, at, cell, scale)?;
        bound.insert(at, grades.attach(parent, grade));
    }
    Ok(grades)
}

impl GradeBook {
    /// Load a gradebook with the default letter and color scales.
    pub fn parse(text: &str) -> DomainResult<Self> {
        Self::parse_with(text, LetterScale::default(), ColorScale::default())
    }

    #[instrument(level = "debug", skip_all)]
    pub fn parse_with(text: &str, scale: LetterScale, colors: ColorScale) -> DomainResult<Self> {
        let mut rows = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, split_cells(line)));

        let (_, header) = rows
            .next()
            .ok_or_else(|| DomainError::InvalidHeader("empty gradebook".into()))?;
        let Some((label, headings)) = header.split_first() else {
            return Err(DomainError::InvalidHeader("empty gradebook".into()));
        };
        if label != HEADER_LABEL {
            return Err(DomainError::InvalidHeader(format!(
                "first cell must be {HEADER_LABEL:?}, found {label:?}"
            )));
        }
        let assignments = AssignmentTree::from_headings(headings.iter().map(String::as_str))?;
        let expected = assignments.len();

        let mut roster = IndexMap::new();
        for (row, cells) in rows {
            let Some((label, grade_cells)) = cells.split_first() else {
                continue;
            };
            let student = Student::parse(label)?;
            if grade_cells.len() != expected {
                return Err(DomainError::CellCount {
                    row,
                    expected,
                    found: grade_cells.len(),
                });
            }
            let grades = grade_tree(&assignments, grade_cells, &scale)?;
            let alias = student.alias().to_string();
            if roster.contains_key(&alias) {
                return Err(DomainError::DuplicateStudent(alias));
            }
            roster.insert(alias, Enrollment { student, grades });
        }
        debug!(
            assignments = expected,
            students = roster.len(),
            "loaded gradebook"
        );
        Ok(Self {
            assignments,
            roster,
            scale,
            colors,
        })
    }

    /// Serialize in the canonical tab-separated format.
    pub fn write(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "{}\t{}",
            HEADER_LABEL,
            self.assignments.headings().join("\t")
        )?;
        for enrollment in self.roster.values() {
            let cells = self
                .views(enrollment)
                .iter()
                .map(GradeView::export_string)
                .join("\t");
            writeln!(out, "{}\t{}", enrollment.student, cells)?;
        }
        Ok(())
    }

    pub fn to_tsv(&self) -> String {
        self.to_string()
    }

    pub fn assignments(&self) -> &AssignmentTree {
        &self.assignments
    }

    pub fn scale(&self) -> &LetterScale {
        &self.scale
    }

    pub fn colors(&self) -> &ColorScale {
        &self.colors
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.roster.values().map(|e| &e.student)
    }

    pub fn student(&self, alias: &str) -> DomainResult<&Student> {
        self.enrollment(alias).map(|e| &e.student)
    }

    /// Students whose alias contains `filter`; `all` matches everyone.
    pub fn students_matching(&self, filter: &str) -> Vec<&Student> {
        self.roster
            .iter()
            .filter(|(alias, _)| filter == "all" || alias.contains(filter))
            .map(|(_, e)| &e.student)
            .collect()
    }

    pub fn enrollment(&self, alias: &str) -> DomainResult<&Enrollment> {
        self.roster
            .get(alias)
            .ok_or_else(|| DomainError::UnknownStudent(alias.to_string()))
    }

    fn view<'a>(&'a self, enrollment: &'a Enrollment, at: Index, idx: Index) -> GradeView<'a> {
        GradeView {
            assignments: &self.assignments,
            at,
            grades: &enrollment.grades,
            idx,
            scale: &self.scale,
            colors: &self.colors,
        }
    }

    /// Views of every grade node in pre-order.
    fn views<'a>(&'a self, enrollment: &'a Enrollment) -> Vec<GradeView<'a>> {
        self.assignments
            .traversal()
            .zip(enrollment.grades.traversal())
            .map(|((at, _), (idx, _))| self.view(enrollment, at, idx))
            .collect()
    }

    pub fn grade_views(&self, alias: &str) -> DomainResult<Vec<GradeView<'_>>> {
        Ok(self.views(self.enrollment(alias)?))
    }

    pub fn get_grade(&self, alias: &str, qualified_name: &str) -> DomainResult<GradeView<'_>> {
        let enrollment = self.enrollment(alias)?;
        let at = self.assignments.get(qualified_name)?;
        let idx = enrollment.grades.get(qualified_name)?;
        Ok(self.view(enrollment, at, idx))
    }

    /// Replace a leaf's grade text. Returns false if the text is unchanged.
    #[instrument(level = "debug", skip(self))]
    pub fn set_grade(&mut self, alias: &str, qualified_name: &str, text: &str) -> DomainResult<bool> {
        let text = text.trim();
        let at = self.assignments.get(qualified_name)?;
        let enrollment = self
            .roster
            .get_mut(alias)
            .ok_or_else(|| DomainError::UnknownStudent(alias.to_string()))?;
        let idx = enrollment.grades.get(qualified_name)?;
        if !enrollment.grades.is_leaf(idx) {
            return Err(DomainError::ComputedGrade(qualified_name.to_string()));
        }
        if enrollment.grades.data(idx).raw_text() == text {
            return Ok(false);
        }
        let assignment = self.assignments.data(at);
        let score = Score::parse(text, assignment.weight().points(), &self.scale)?;
        enrollment.grades.data_mut(idx).replace(text, score);
        enrollment.grades.propagate(idx);
        debug!(text, "grade updated");
        Ok(true)
    }

    /// `(qualified name, display string)` of every ancestor of a grade, nearest first.
    pub fn changed_aggregates(
        &self,
        alias: &str,
        qualified_name: &str,
    ) -> DomainResult<Vec<(String, String)>> {
        let view = self.get_grade(alias, qualified_name)?;
        Ok(view
            .ancestors()
            .iter()
            .map(|v| (v.qualified_name(), v.display_string()))
            .collect())
    }

    pub fn add_assignment(&mut self, qualified_name: &str, weight_text: &str) -> DomainResult<()> {
        self.add_assignment_with(qualified_name, weight_text, false)
    }

    /// Graft a new assignment and an ungraded node into every grade tree.
    #[instrument(level = "debug", skip(self))]
    pub fn add_assignment_with(
        &mut self,
        qualified_name: &str,
        weight_text: &str,
        extra_credit: bool,
    ) -> DomainResult<()> {
        let name = qualified_name
            .rsplit_once(SEPARATOR)
            .map_or(qualified_name, |(_, last)| last);
        let assignment = Assignment::new(name, weight_text.trim(), extra_credit)?;
        let parent = self.assignments.insertion_point(qualified_name, name)?;
        let targets = self
            .roster
            .values()
            .map(|e| e.grades.insertion_point(qualified_name, name))
            .collect::<DomainResult<Vec<_>>>()?;

        self.assignments.attach(parent, assignment);
        for (enrollment, parent) in self.roster.values_mut().zip(targets) {
            // a graded leaf becomes computed once it has children
            if enrollment.grades.is_leaf(parent) {
                enrollment
                    .grades
                    .data_mut(parent)
                    .replace(UNGRADED, Score::Ungraded);
            }
            enrollment.grades.attach(parent, GradeNode::ungraded(name));
        }
        Ok(())
    }

    pub fn move_assignment_up(&mut self, qualified_name: &str) -> DomainResult<bool> {
        self.shift_assignment(qualified_name, Shift::Up)
    }

    pub fn move_assignment_down(&mut self, qualified_name: &str) -> DomainResult<bool> {
        self.shift_assignment(qualified_name, Shift::Down)
    }

    #[instrument(level = "debug", skip(self))]
    fn shift_assignment(&mut self, qualified_name: &str, direction: Shift) -> DomainResult<bool> {
        let at = self.assignments.get(qualified_name)?;
        let targets = self
            .roster
            .values()
            .map(|e| e.grades.get(qualified_name))
            .collect::<DomainResult<Vec<_>>>()?;
        if !self.assignments.shift(at, direction) {
            return Ok(false);
        }
        for (enrollment, idx) in self.roster.values_mut().zip(targets) {
            enrollment.grades.shift(idx, direction);
        }
        Ok(true)
    }

    /// Detach an assignment subtree from the schema and every grade tree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_assignment(&mut self, qualified_name: &str) -> DomainResult<()> {
        let at = self.assignments.get(qualified_name)?;
        if at == self.assignments.root() {
            return Err(DomainError::RootImmutable);
        }
        let targets = self
            .roster
            .values()
            .map(|e| e.grades.get(qualified_name))
            .collect::<DomainResult<Vec<_>>>()?;

        let removed = self.assignments.detach(at);
        for (enrollment, idx) in self.roster.values_mut().zip(targets) {
            enrollment.grades.detach(idx);
        }
        debug!(nodes = removed.len(), "removed assignment");
        Ok(())
    }
}

impl fmt::Display for GradeBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f)
    }
}

impl FromStr for GradeBook {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
