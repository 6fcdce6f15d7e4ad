//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod book;
pub mod color;
pub mod entities;
pub mod error;
pub mod grade;
pub mod number;
pub mod outline;
pub mod score;
pub mod tree;
pub mod weight;

pub use book::{Enrollment, GradeBook};
pub use color::ColorScale;
pub use entities::Student;
pub use error::{DomainError, DomainResult};
pub use grade::{GradeNode, GradeTree, GradeView, Policy};
pub use outline::{grade_outline, TreeNodeConvert};
pub use score::{LetterScale, Score};
pub use tree::{Named, NamedTree, SEPARATOR};
pub use weight::{Assignment, AssignmentTree, Weight};
