//! Tests for GradeBookService

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use gradetree::application::services::GradeBookService;
use gradetree::application::ApplicationError;
use gradetree::domain::tree::Shift;
use gradetree::domain::DomainError;
use gradetree::infrastructure::traits::RealFileSystem;
use gradetree::util::testing::{init_test_setup, write_gradebook, SAMPLE_GRADEBOOK};

fn service() -> GradeBookService {
    init_test_setup();
    GradeBookService::new(Arc::new(RealFileSystem))
}

#[test]
fn given_gradebook_file_when_loading_then_parses_students_and_assignments() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);

    // Act
    let book = service().load(&path).unwrap();

    // Assert
    let aliases: Vec<_> = book.students().map(|s| s.alias().to_string()).collect();
    assert_eq!(aliases, ["jdoe", "rroe"]);
    assert_eq!(book.assignments().len(), 8);
    let course = book.get_grade("jdoe", "Course").unwrap();
    assert_eq!(course.export_string(), "56.00%");
}

#[test]
fn given_leaf_grade_when_setting_then_saves_and_reports_ancestors() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);
    let service = service();

    let change = service
        .set_grade(&path, "jdoe", "Course__Exams__Final", "90%")
        .unwrap();

    assert!(change.changed);
    assert_eq!(change.display, "90%");
    assert_eq!(
        change.aggregates,
        [
            ("Course__Exams".to_string(), "85.00%".to_string()),
            ("Course".to_string(), "83.00%".to_string()),
        ]
    );
    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("Doe, Jane <jdoe@example.edu>\t83.00%\t80.00%\t18/20\t7\tNone\t85.00%\t80%\t90%\n"));
}

#[test]
fn given_same_grade_when_setting_then_file_is_not_rewritten() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);

    let change = service()
        .set_grade(&path, "jdoe", "Course__Homeworks__HW2", " 7 ")
        .unwrap();

    assert!(!change.changed);
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_GRADEBOOK);
}

#[test]
fn given_invalid_grade_when_setting_then_file_is_unchanged() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);

    let err = service()
        .set_grade(&path, "jdoe", "Course__Homeworks__HW2", "seven")
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Gradebook {
            source: DomainError::InvalidGrade { .. },
            ..
        }
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_GRADEBOOK);
}

#[test]
fn given_structural_edits_when_applied_then_every_student_follows() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);
    let service = service();

    service
        .add_assignment(&path, "Course__Exams__Quiz", "10%", true)
        .unwrap();
    assert!(service
        .move_assignment(&path, "Course__Exams__Quiz", Shift::Up)
        .unwrap());
    assert!(service
        .move_assignment(&path, "Course__Exams__Quiz", Shift::Up)
        .unwrap());
    assert!(!service
        .move_assignment(&path, "Course__Exams__Quiz", Shift::Up)
        .unwrap());

    let book = service.load(&path).unwrap();
    let headings = book.assignments().headings();
    assert_eq!(
        &headings[5..],
        ["__Exams (60%)", "____Quiz* (10%)", "____Midterm (1/2)", "____Final (1/2)"]
    );
    for student in book.students() {
        let quiz = book.get_grade(student.alias(), "Course__Exams__Quiz").unwrap();
        assert_eq!(quiz.display_string(), "None");
    }

    service.remove_assignment(&path, "Course__Exams__Quiz").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_GRADEBOOK);
}

#[test]
fn given_unknown_assignment_when_removing_then_lookup_error() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);

    let err = service()
        .remove_assignment(&path, "Course__Labs")
        .unwrap_err();

    assert!(err.domain().is_some_and(DomainError::is_lookup), "{err}");
}

#[test]
fn given_missing_file_when_loading_then_operation_failed() {
    let temp = TempDir::new().unwrap();

    let err = service().load(&temp.path().join("nope.tsv")).unwrap_err();

    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
}

#[test]
fn given_hand_edited_file_when_checking_then_reports_non_canonical() {
    let temp = TempDir::new().unwrap();
    let spaced = SAMPLE_GRADEBOOK.replace('\t', "    ");
    let path = write_gradebook(temp.path(), "grades.tsv", &spaced);
    let service = service();

    let report = service.check(&path).unwrap();
    assert_eq!(report.students, 2);
    assert_eq!(report.assignments, 8);
    assert!(!report.canonical);

    let canonical = write_gradebook(temp.path(), "canonical.tsv", SAMPLE_GRADEBOOK);
    assert!(service.check(&canonical).unwrap().canonical);
}

#[test]
fn given_padded_name_when_adding_then_rejected_and_file_still_loads() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(temp.path(), "grades.tsv", SAMPLE_GRADEBOOK);
    let service = service();

    let err = service
        .add_assignment(&path, "Course__Homeworks__HW3 ", "10", false)
        .unwrap_err();

    assert!(err.domain().is_some_and(DomainError::is_parse), "{err}");
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_GRADEBOOK);
    assert!(service.load(&path).is_ok());
}

#[test]
fn given_duplicate_sibling_headings_when_loading_then_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = write_gradebook(
        temp.path(),
        "grades.tsv",
        "Student\tCourse (100%)\t__A (1)\t__A (1)\n",
    );

    let err = service().load(&path).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Gradebook {
            source: DomainError::InvalidHeader(_),
            ..
        }
    ));
    assert!(err.domain().is_some_and(DomainError::is_parse));
}
