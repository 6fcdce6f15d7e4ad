//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use gradetree::application::ApplicationError;
use gradetree::config::{local_config_path, ColorAnchor, Settings};
use gradetree::domain::LetterScale;

// ============================================================
// Settings::load() local config tests
// ============================================================

#[test]
fn given_no_local_config_when_load_then_uses_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.letter_scale().unwrap(), LetterScale::default());
    assert_eq!(settings.colors.ungraded, "#FFFFFF");
    assert_eq!(settings.colors.anchors.len(), 3);
}

#[test]
fn given_local_config_when_load_then_overrides_scale_and_colors() {
    let dir = TempDir::new().unwrap();
    let local = r##"
gradebook = "course.tsv"

[scale]
boundaries = ["60%", "63%", "67%", "70%", "73%", "77%", "80%", "83%", "87%", "90%", "100%"]

[colors]
ungraded = "#EEEEEE"
anchors = [
    { at = 50, color = "#FF0000" },
    { at = 100, color = "#00FF00" },
]
"##;
    fs::write(local_config_path(dir.path()), local).unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.gradebook, Some(PathBuf::from("course.tsv")));
    assert_eq!(
        settings.colors.anchors[0],
        ColorAnchor {
            at: 50,
            color: "#FF0000".into()
        }
    );
    let scale = settings.letter_scale().unwrap();
    assert_eq!(scale.letter_for(&"41/50".parse().unwrap()), "B");
    let colors = settings.color_scale().unwrap();
    assert_eq!(colors.ungraded(), "#EEEEEE");
    assert_eq!(colors.color_for(&"1/2".parse().unwrap()), "#ff0000");
    assert_eq!(colors.color_for(&"1/1".parse().unwrap()), "#00ff00");
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "gradebook = [").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_decreasing_anchors_when_building_color_scale_then_config_error() {
    let dir = TempDir::new().unwrap();
    let local = r##"
[colors]
anchors = [{ at = 90, color = "#FF0000" }, { at = 10, color = "#00FF00" }]
"##;
    fs::write(local_config_path(dir.path()), local).unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert!(matches!(
        settings.color_scale(),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_tilde_gradebook_when_load_then_expands_home() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "gradebook = \"~/grades.tsv\"\n").unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    let path = settings.gradebook.expect("gradebook set");
    assert!(!path.to_string_lossy().starts_with('~'), "{path:?}");
    assert!(path.ends_with("grades.tsv"));
}
