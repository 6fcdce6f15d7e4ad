//! Assignments and their weights.
//!
//! Weight text is one of:
//! - `30%` — percent of the parent, literally
//! - `3/10` — ratio of the parent, literally
//! - `10` — points, normalized against the non-extra-credit siblings

use std::fmt;
use std::sync::OnceLock;

use generational_arena::Index;
use num_rational::BigRational;
use num_traits::{One, Zero};
use regex::Regex;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::number::{format_percent, hundred, parse_decimal, parse_ratio};
use crate::domain::tree::{Named, NamedTree};

/// Parsed weight, tagged by notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Weight {
    Percent(BigRational),
    Ratio(BigRational),
    Points(BigRational),
}

impl Weight {
    /// Parse weight text: trailing `%`, then `/`, then a plain number.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidWeight(text.to_string());
        if let Some(number) = text.strip_suffix('%') {
            let value = parse_decimal(number).ok_or_else(invalid)?;
            Ok(Weight::Percent(value / hundred()))
        } else if text.contains('/') {
            let (numer, denom) = text.split_once('/').ok_or_else(invalid)?;
            if numer.is_empty() || denom.is_empty() {
                return Err(invalid());
            }
            parse_ratio(text).map(Weight::Ratio).ok_or_else(invalid)
        } else {
            parse_decimal(text).map(Weight::Points).ok_or_else(invalid)
        }
    }

    pub fn value(&self) -> &BigRational {
        match self {
            Weight::Percent(v) | Weight::Ratio(v) | Weight::Points(v) => v,
        }
    }

    /// Full points, for points-kind weights only.
    pub fn points(&self) -> Option<&BigRational> {
        match self {
            Weight::Points(v) => Some(v),
            _ => None,
        }
    }
}

/// A named, weighted node of the course schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    name: String,
    weight_text: String,
    weight: Weight,
    extra_credit: bool,
}

impl Assignment {
    pub fn new(
        name: impl Into<String>,
        weight_text: impl Into<String>,
        extra_credit: bool,
    ) -> DomainResult<Self> {
        let weight_text = weight_text.into();
        let weight = Weight::parse(&weight_text)?;
        Ok(Self {
            name: name.into(),
            weight_text,
            weight,
            extra_credit,
        })
    }

    pub fn weight_text(&self) -> &str {
        &self.weight_text
    }

    pub fn weight(&self) -> &Weight {
        &self.weight
    }

    pub fn extra_credit(&self) -> bool {
        self.extra_credit
    }

    /// Header cell for this assignment at `depth`.
    pub fn heading(&self, depth: usize) -> String {
        format!("{}{}", "__".repeat(depth), self)
    }

    /// Human-readable weight: `10pts`, `1pt`, or the literal text.
    pub fn weight_display(&self) -> String {
        match &self.weight {
            Weight::Points(points) if points.is_one() => format!("{}pt", self.weight_text),
            Weight::Points(_) => format!("{}pts", self.weight_text),
            _ => self.weight_text.clone(),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let star = if self.extra_credit { "*" } else { "" };
        write!(f, "{}{} ({})", self.name, star, self.weight_text)
    }
}

impl Named for Assignment {
    fn name(&self) -> &str {
        &self.name
    }
}

pub type AssignmentTree = NamedTree<Assignment>;

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<indent>(?:__)*)(?P<name>[^*]*)(?P<extra>\*?) \((?P<weight>[^)]*)\)$")
            .expect("heading regex")
    })
}

/// Split a header cell into depth and assignment.
pub fn parse_heading(cell: &str) -> DomainResult<(usize, Assignment)> {
    let caps = heading_regex()
        .captures(cell)
        .ok_or_else(|| DomainError::InvalidHeading(cell.to_string()))?;
    let depth = caps["indent"].len() / 2;
    let assignment = Assignment::new(&caps["name"], &caps["weight"], !caps["extra"].is_empty())?;
    Ok((depth, assignment))
}

impl NamedTree<Assignment> {
    /// Build the schema from header cells in pre-order.
    #[instrument(level = "debug", skip(cells))]
    pub fn from_headings<'a>(cells: impl IntoIterator<Item = &'a str>) -> DomainResult<Self> {
        let mut cells = cells.into_iter();
        let first = cells
            .next()
            .ok_or_else(|| DomainError::InvalidHeader("no assignments".into()))?;
        let (depth, root) = parse_heading(first)?;
        if depth != 0 {
            return Err(DomainError::InvalidHeader(format!(
                "first assignment must not be indented: {first:?}"
            )));
        }
        let mut tree = NamedTree::new(root)?;
        // path from the root to the most recently added node
        let mut stack: Vec<Index> = vec![tree.root()];
        for cell in cells {
            let (depth, assignment) = parse_heading(cell)?;
            if depth == 0 || depth > stack.len() {
                return Err(DomainError::InvalidHeader(format!(
                    "unexpected indentation at {cell:?}"
                )));
            }
            stack.truncate(depth);
            let parent = stack[depth - 1];
            let idx = tree.add_child(parent, assignment).map_err(|e| match e {
                DomainError::DuplicateName(name) => {
                    DomainError::InvalidHeader(format!("duplicate assignment {name}"))
                }
                other => other,
            })?;
            stack.push(idx);
        }
        Ok(tree)
    }

    pub fn headings(&self) -> Vec<String> {
        self.traversal()
            .map(|(_, node)| node.data.heading(node.depth))
            .collect()
    }

    /// Share of the parent's weight: 1 for the root, the literal value for
    /// percent and ratio weights, points over the points of the
    /// non-extra-credit siblings otherwise.
    pub fn percent_weight(&self, idx: Index) -> BigRational {
        let Some(parent) = self.parent(idx) else {
            return BigRational::one();
        };
        match self.data(idx).weight() {
            Weight::Percent(v) | Weight::Ratio(v) => v.clone(),
            Weight::Points(points) => {
                let total: BigRational = self
                    .children(parent)
                    .iter()
                    .map(|&sibling| self.data(sibling))
                    .filter(|a| !a.extra_credit())
                    .filter_map(|a| a.weight().points())
                    .sum();
                if total.is_zero() {
                    BigRational::zero()
                } else {
                    points / total
                }
            }
        }
    }

    /// Sum of the children's percent weights, extra credit excluded.
    pub fn child_weight_total(&self, idx: Index) -> BigRational {
        self.children(idx)
            .iter()
            .filter(|&&child| !self.data(child).extra_credit())
            .map(|&child| self.percent_weight(child))
            .sum()
    }

    /// Extra weight details for display.
    pub fn weight_info(&self, idx: Index) -> String {
        let mut info = Vec::new();
        if let Weight::Percent(_) = self.data(idx).weight() {
            info.push(format!(
                "Percentage weight: {}",
                format_percent(&self.percent_weight(idx))
            ));
        }
        if !self.is_leaf(idx) {
            info.push(format!(
                "Total child weight: {}",
                format_percent(&self.child_weight_total(idx))
            ));
        }
        info.join("\n")
    }

    /// Assignments whose qualified name starts with `prefix`; `all` matches everything.
    pub fn assignments_under(&self, prefix: &str) -> Vec<Index> {
        self.traversal()
            .map(|(idx, _)| idx)
            .filter(|&idx| prefix == "all" || self.qualified_name(idx).starts_with(prefix))
            .collect()
    }
}
