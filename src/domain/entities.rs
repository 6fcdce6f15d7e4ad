//! Domain entities: core data structures

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::error::{DomainError, DomainResult};

/// An enrolled student, identified by the local part of their email.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

fn student_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<last>[^,]*), (?P<first>.*) <(?P<email>[^>]*)>$").expect("student regex")
    })
}

impl Student {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }

    /// Parse a row label such as `Doe, Jane <jdoe@example.edu>`.
    pub fn parse(cell: &str) -> DomainResult<Self> {
        let caps = student_regex()
            .captures(cell)
            .ok_or_else(|| DomainError::InvalidStudent(cell.to_string()))?;
        let student = Self::new(&caps["first"], &caps["last"], &caps["email"]);
        if student.alias().is_empty() {
            return Err(DomainError::InvalidStudent(cell.to_string()));
        }
        Ok(student)
    }

    /// Email local part, the lookup key for the student's grades.
    pub fn alias(&self) -> &str {
        self.email.split('@').next().unwrap_or_default()
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} <{}>", self.last_name, self.first_name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_student_cell() {
        let student = Student::parse("Doe, Jane Q. <jdoe@example.edu>").unwrap();
        assert_eq!(student.first_name, "Jane Q.");
        assert_eq!(student.last_name, "Doe");
        assert_eq!(student.alias(), "jdoe");
        assert_eq!(student.to_string(), "Doe, Jane Q. <jdoe@example.edu>");
    }

    #[test]
    fn test_alias_without_domain_is_whole_email() {
        assert_eq!(Student::new("A", "B", "local").alias(), "local");
    }

    #[rstest]
    #[case("Jane Doe <jdoe@example.edu>")]
    #[case("Doe, Jane")]
    #[case("Doe, Jane <@example.edu>")]
    #[case("Doe,Jane <jdoe@example.edu>")]
    fn test_parse_rejects_malformed_cells(#[case] cell: &str) {
        assert_eq!(
            Student::parse(cell),
            Err(DomainError::InvalidStudent(cell.to_string()))
        );
    }
}
