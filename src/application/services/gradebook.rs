//! Gradebook service
//!
//! Loads a gradebook file, applies one edit, and writes it back atomically.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationResult, DomainResultExt, IoResultExt};
use crate::domain::tree::Shift;
use crate::domain::{ColorScale, DomainResult, GradeBook, LetterScale};
use crate::infrastructure::traits::FileSystem;

/// Outcome of a grade update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeChange {
    /// False when the new text equals the stored text
    pub changed: bool,
    pub display: String,
    /// `(qualified name, display string)` of each ancestor, nearest first
    pub aggregates: Vec<(String, String)>,
}

/// Summary of a gradebook file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub students: usize,
    pub assignments: usize,
    /// Whether the file is byte-identical to its re-serialization
    pub canonical: bool,
}

/// Service for reading and editing gradebook files.
pub struct GradeBookService {
    fs: Arc<dyn FileSystem>,
    scale: LetterScale,
    colors: ColorScale,
}

impl GradeBookService {
    /// Create a service using the default letter and color scales.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_scales(fs, LetterScale::default(), ColorScale::default())
    }

    pub fn with_scales(fs: Arc<dyn FileSystem>, scale: LetterScale, colors: ColorScale) -> Self {
        Self { fs, scale, colors }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<GradeBook> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read gradebook", path)?;
        GradeBook::parse_with(&content, self.scale.clone(), self.colors.clone()).in_gradebook(path)
    }

    #[instrument(level = "debug", skip(self, book))]
    pub fn save(&self, path: &Path, book: &GradeBook) -> ApplicationResult<()> {
        self.fs
            .write_atomic(path, &book.to_tsv())
            .with_path_context("write gradebook", path)?;
        info!("saved {}", path.display());
        Ok(())
    }

    /// Load, apply `edit`, and save; nothing is written if `edit` fails.
    fn edit<R>(
        &self,
        path: &Path,
        edit: impl FnOnce(&mut GradeBook) -> DomainResult<R>,
    ) -> ApplicationResult<R> {
        let mut book = self.load(path)?;
        let result = edit(&mut book).in_gradebook(path)?;
        self.save(path, &book)?;
        Ok(result)
    }

    /// Set one grade and report the aggregates it affects.
    #[instrument(level = "debug", skip(self))]
    pub fn set_grade(
        &self,
        path: &Path,
        alias: &str,
        qualified_name: &str,
        text: &str,
    ) -> ApplicationResult<GradeChange> {
        let mut book = self.load(path)?;
        let changed = book
            .set_grade(alias, qualified_name, text)
            .in_gradebook(path)?;
        if changed {
            self.save(path, &book)?;
        } else {
            debug!("grade unchanged, skipping save");
        }
        let display = book
            .get_grade(alias, qualified_name)
            .in_gradebook(path)?
            .display_string();
        let aggregates = book
            .changed_aggregates(alias, qualified_name)
            .in_gradebook(path)?;
        Ok(GradeChange {
            changed,
            display,
            aggregates,
        })
    }

    pub fn add_assignment(
        &self,
        path: &Path,
        qualified_name: &str,
        weight_text: &str,
        extra_credit: bool,
    ) -> ApplicationResult<()> {
        self.edit(path, |book| {
            book.add_assignment_with(qualified_name, weight_text, extra_credit)
        })
    }

    /// Returns false if the assignment was already first (or last).
    pub fn move_assignment(
        &self,
        path: &Path,
        qualified_name: &str,
        direction: Shift,
    ) -> ApplicationResult<bool> {
        self.edit(path, |book| match direction {
            Shift::Up => book.move_assignment_up(qualified_name),
            Shift::Down => book.move_assignment_down(qualified_name),
        })
    }

    pub fn remove_assignment(&self, path: &Path, qualified_name: &str) -> ApplicationResult<()> {
        self.edit(path, |book| book.remove_assignment(qualified_name))
    }

    /// Parse the file and compare it with its canonical form.
    pub fn check(&self, path: &Path) -> ApplicationResult<CheckReport> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read gradebook", path)?;
        let book = GradeBook::parse_with(&content, self.scale.clone(), self.colors.clone())
            .in_gradebook(path)?;
        Ok(CheckReport {
            students: book.students().count(),
            assignments: book.assignments().len(),
            canonical: book.to_tsv() == content,
        })
    }
}
